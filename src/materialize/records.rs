// Materialized Records
// Concrete, persisted record types plus the per-unit batch and the run-level
// store they are committed to.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A concrete processed sample, created when a placeholder is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedSample {
    pub id: String,

    #[serde(rename = "type")]
    pub type_label: String,

    /// Substituted blueprint slots (references already replaced with ids)
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

/// A concrete material-processing step linking resolved input and output ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedStep {
    pub id: String,

    #[serde(rename = "type")]
    pub type_label: String,

    pub name: String,

    pub has_input: Vec<String>,

    pub has_output: Vec<String>,

    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

/// Records buffered for one unit of work.
///
/// A unit's records only ever reach the store through `RecordStore::commit`,
/// after the whole unit succeeded; a failed unit drops its batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    pub samples: Vec<MaterializedSample>,
    pub steps: Vec<MaterializedStep>,
}

impl RecordBatch {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.steps.is_empty()
    }
}

/// Run-level accumulation of materialized records, dumpable as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStore {
    pub processed_sample_set: Vec<MaterializedSample>,
    pub material_processing_set: Vec<MaterializedStep>,
}

impl RecordStore {
    /// Append a completed unit's records.
    pub fn commit(&mut self, batch: RecordBatch) {
        self.processed_sample_set.extend(batch.samples);
        self.material_processing_set.extend(batch.steps);
    }

    pub fn is_empty(&self) -> bool {
        self.processed_sample_set.is_empty() && self.material_processing_set.is_empty()
    }

    /// Serialize the store as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
