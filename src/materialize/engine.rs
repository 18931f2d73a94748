// Materialization Engine
// Executes a pruned template in sequence order against a ResolvedTable,
// minting identifiers through an external collaborator and buffering the
// resulting records for atomic commit.

use crate::materialize::records::{MaterializedSample, MaterializedStep, RecordBatch};
use crate::materialize::resolved::ResolvedTable;
use crate::template::ProtocolTemplate;

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Failure of the external identifier-minting collaborator. Retry and backoff
/// live behind the collaborator; by the time this error surfaces, the mint is
/// exhausted and the unit of work is abandoned.
#[derive(Debug, Error)]
#[error("failed to mint identifier for type '{type_tag}': {message}")]
pub struct MintError {
    pub type_tag: String,
    pub message: String,
}

impl MintError {
    pub fn new(type_tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while materializing a pruned template.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("processed sample '{placeholder}' referenced before creation")]
    UnresolvedReference { placeholder: String },

    #[error("placeholder '{placeholder}' resolved more than once")]
    DuplicateResolution { placeholder: String },

    #[error("no blueprint for output placeholder '{placeholder}'")]
    MissingBlueprint { placeholder: String },

    #[error("step '{step}' has unrecognized process type '{process_type}'")]
    UnknownProcessType { step: String, process_type: String },

    #[error(transparent)]
    Mint(#[from] MintError),
}

/// External collaborator that mints a new identifier for a given record type.
pub trait IdMinter {
    fn mint(&mut self, type_tag: &str) -> Result<String, MintError>;
}

/// External collaborator that decides whether a process-type tag is a known
/// material-processing category.
pub trait ProcessTypeValidator {
    fn is_valid_type(&self, name: &str) -> bool;
}

/// The material-processing categories the catalog schema recognizes.
pub struct StandardProcessTypes;

impl StandardProcessTypes {
    const CATEGORIES: [&'static str; 7] = [
        "SubSamplingProcess",
        "Extraction",
        "ChemicalConversionProcess",
        "ChromatographicSeparationProcess",
        "DissolvingProcess",
        "FiltrationProcess",
        "PoolingProcess",
    ];
}

impl ProcessTypeValidator for StandardProcessTypes {
    fn is_valid_type(&self, name: &str) -> bool {
        Self::CATEGORIES.contains(&name)
    }
}

/// Resolved entries that are outputs of some materialized step but inputs to
/// none, within the pruned graph of one unit of work. The root biosample is
/// excluded by construction: it is never an output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinalOutputSet {
    entries: BTreeMap<String, String>,
}

impl FinalOutputSet {
    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.entries.get(placeholder).map(String::as_str)
    }

    pub fn contains(&self, placeholder: &str) -> bool {
        self.entries.contains_key(placeholder)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, id)| (n.as_str(), id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, placeholder: &str, id: &str) {
        self.entries
            .insert(placeholder.to_string(), id.to_string());
    }
}

/// Everything a successful unit of work produces: the buffered records and
/// the final outputs the reconciler links to raw data.
#[derive(Debug, Clone)]
pub struct MaterializedUnit {
    pub batch: RecordBatch,
    pub final_outputs: FinalOutputSet,
}

/// Executes pruned templates for one unit of work at a time.
pub struct Materializer<'a, M: IdMinter, V: ProcessTypeValidator> {
    minter: &'a mut M,
    validator: &'a V,
}

impl<'a, M: IdMinter, V: ProcessTypeValidator> Materializer<'a, M, V> {
    pub fn new(minter: &'a mut M, validator: &'a V) -> Self {
        Self { minter, validator }
    }

    /// Execute `template` (already pruned and sequence-sorted) against the
    /// seeded `resolved` table.
    ///
    /// Any error abandons the unit: the caller never sees a partial batch.
    pub fn run(
        &mut self,
        template: &ProtocolTemplate,
        resolved: &mut ResolvedTable,
    ) -> Result<MaterializedUnit, MaterializeError> {
        let mut batch = RecordBatch::default();
        let mut all_inputs: HashSet<String> = HashSet::new();
        let mut all_outputs: HashSet<String> = HashSet::new();

        for step in &template.steps {
            // Inputs must already be resolved; strict forward dependency.
            let mut input_ids = Vec::with_capacity(step.has_input.len());
            for placeholder in &step.has_input {
                let id = resolved.get(placeholder).ok_or_else(|| {
                    MaterializeError::UnresolvedReference {
                        placeholder: placeholder.clone(),
                    }
                })?;
                input_ids.push(id.to_string());
                all_inputs.insert(id.to_string());
            }

            // Mint each output from its blueprint.
            let mut output_ids = Vec::with_capacity(step.has_output.len());
            for placeholder in &step.has_output {
                let blueprint = template.blueprint(placeholder).ok_or_else(|| {
                    MaterializeError::MissingBlueprint {
                        placeholder: placeholder.clone(),
                    }
                })?;

                let mut attributes = blueprint.attributes.clone();
                attributes.remove("id");
                attributes.remove("type");
                substitute_attributes(&mut attributes, resolved)?;

                let id = self.minter.mint(&blueprint.type_label)?;
                resolved.insert(placeholder, &id)?;
                output_ids.push(id.clone());
                all_outputs.insert(id.clone());

                batch.samples.push(MaterializedSample {
                    id,
                    type_label: blueprint.type_label.clone(),
                    attributes,
                });
            }

            let mut attributes = step.attributes.clone();
            attributes.remove("id");
            attributes.remove("type");
            substitute_attributes(&mut attributes, resolved)?;

            if !self.validator.is_valid_type(&step.process_type) {
                return Err(MaterializeError::UnknownProcessType {
                    step: step.name.clone(),
                    process_type: step.process_type.clone(),
                });
            }

            let id = self.minter.mint(&step.process_type)?;
            batch.steps.push(MaterializedStep {
                id,
                type_label: step.process_type.clone(),
                name: step.name.clone(),
                has_input: input_ids,
                has_output: output_ids,
                attributes,
            });
        }

        // A resolved id that was produced but never consumed is a sink.
        let mut final_outputs = FinalOutputSet::default();
        for (placeholder, id) in resolved.iter() {
            if all_outputs.contains(id) && !all_inputs.contains(id) {
                final_outputs.insert(placeholder, id);
            }
        }

        Ok(MaterializedUnit {
            batch,
            final_outputs,
        })
    }
}

fn substitute_attributes(
    attributes: &mut BTreeMap<String, Value>,
    resolved: &ResolvedTable,
) -> Result<(), MaterializeError> {
    for value in attributes.values_mut() {
        substitute_value(value, resolved)?;
    }
    Ok(())
}

/// Replace `<placeholder>` tokens in every string nested inside `value`.
fn substitute_value(value: &mut Value, resolved: &ResolvedTable) -> Result<(), MaterializeError> {
    match value {
        Value::String(s) => {
            if s.contains('<') {
                *s = substitute_str(s, resolved)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute_value(item, resolved)?;
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute_value(item, resolved)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn substitute_str(s: &str, resolved: &ResolvedTable) -> Result<String, MaterializeError> {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('>') {
            Some(end) => {
                let name = &after[..end];
                let id = resolved.get(name).ok_or_else(|| {
                    MaterializeError::UnresolvedReference {
                        placeholder: name.to_string(),
                    }
                })?;
                out.push_str(id);
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated token; keep the tail verbatim.
                out.push_str(&rest[start..]);
                return Ok(out);
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}
