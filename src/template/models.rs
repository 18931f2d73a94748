// Protocol Template Data Models
// In-memory form of the step + placeholder template for one protocol

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single material-processing step from the template.
///
/// String attribute values (including strings nested inside quantity-shaped
/// objects) may embed `<placeholder>` reference tokens that are substituted
/// with minted identifiers during materialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolStep {
    /// Declared sequence number, taken from the `Step N` label
    pub sequence: u32,

    /// Human-readable step name (override rows match against this)
    pub name: String,

    /// Material-processing category tag, validated at materialization time
    pub process_type: String,

    /// Placeholder names consumed by this step
    pub has_input: Vec<String>,

    /// Placeholder names produced by this step
    pub has_output: Vec<String>,

    /// Remaining slots of the step, excluding `has_input`/`has_output`
    pub attributes: BTreeMap<String, Value>,
}

/// The record to create when a placeholder is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Symbolic name this blueprint materializes
    pub placeholder: String,

    /// Record type label (e.g. `ProcessedSample`), used to type the minted id
    pub type_label: String,

    /// Slots of the record; `id`/`type` are stripped before minting
    pub attributes: BTreeMap<String, Value>,
}

/// An ordered set of steps plus the blueprints for their output placeholders,
/// scoped to one protocol.
///
/// The loaded template is read-only; per-unit mutation (parameter injection,
/// pruning) operates on a `clone()` so concurrent units never share state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolTemplate {
    pub steps: Vec<ProtocolStep>,
    pub blueprints: Vec<Blueprint>,
}

impl ProtocolTemplate {
    /// Look up the blueprint for an output placeholder.
    pub fn blueprint(&self, placeholder: &str) -> Option<&Blueprint> {
        self.blueprints.iter().find(|b| b.placeholder == placeholder)
    }

    /// All placeholder names produced by any step, in step order.
    pub fn output_placeholders(&self) -> Vec<&str> {
        self.steps
            .iter()
            .flat_map(|s| s.has_output.iter().map(String::as_str))
            .collect()
    }
}
