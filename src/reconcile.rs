// Output Reconciler
// Links each final output to its raw-data identifiers, emitting update
// actions for identifiers already in the catalog namespace and deferred
// linkages for the rest; every mapped raw identifier must be accounted for.

use crate::mapping::SampleMapping;
use crate::materialize::FinalOutputSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reconciling final outputs against the mapping table.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(
        "biosample '{biosample_id}' has {count} unmatched raw data identifier(s): \
         {identifiers:?}",
        count = .identifiers.len()
    )]
    Unmatched {
        biosample_id: String,
        identifiers: Vec<String>,
    },
}

/// One row of the update-action sheet: point an existing catalog record's
/// `has_input` at the freshly minted final sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAction {
    pub id: String,
    pub action: String,
    pub attribute: String,
    pub value: String,
}

/// One row of the deferred-linkage sheet, for raw identifiers with no catalog
/// record yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredLinkage {
    pub biosample_id: String,
    pub raw_data_identifier: String,
    pub final_sample_id: String,
}

/// Outcome of reconciling one unit of work.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub updates: Vec<UpdateAction>,
    pub deferred: Vec<DeferredLinkage>,
    /// Mapping rows whose raw identifier matched no final output
    pub unmatched: Vec<SampleMapping>,
}

impl Reconciliation {
    /// A non-empty unmatched set means pruning or materialization omitted
    /// something the mapping table expected (or the table itself is wrong);
    /// either way the unit cannot be trusted.
    pub fn ensure_complete(&self, biosample_id: &str) -> Result<(), ReconcileError> {
        if self.unmatched.is_empty() {
            return Ok(());
        }
        Err(ReconcileError::Unmatched {
            biosample_id: biosample_id.to_string(),
            identifiers: self
                .unmatched
                .iter()
                .map(|r| r.raw_data_identifier.clone())
                .collect(),
        })
    }
}

/// Connects final outputs to raw-data identifiers.
pub struct Reconciler {
    /// Identifier prefix marking records that already live in the target
    /// catalog (these get update actions instead of deferred linkages).
    catalog_prefix: String,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self {
            catalog_prefix: "nmdc:".to_string(),
        }
    }
}

impl Reconciler {
    pub fn new(catalog_prefix: impl Into<String>) -> Self {
        Self {
            catalog_prefix: catalog_prefix.into(),
        }
    }

    /// Reconcile one biosample's final outputs against its mapping rows.
    pub fn reconcile(
        &self,
        biosample_id: &str,
        final_outputs: &FinalOutputSet,
        mappings: &[SampleMapping],
    ) -> Reconciliation {
        let rows: Vec<&SampleMapping> = mappings
            .iter()
            .filter(|r| r.biosample_id == biosample_id)
            .collect();

        let mut result = Reconciliation::default();
        let mut matched: Vec<&str> = Vec::new();

        for (placeholder, sample_id) in final_outputs.iter() {
            for row in rows
                .iter()
                .filter(|r| r.processedsample_placeholder == placeholder)
            {
                let raw_id = row.raw_data_identifier.as_str();
                if self.in_catalog(raw_id) {
                    result.updates.push(UpdateAction {
                        id: raw_id.to_string(),
                        action: "update".to_string(),
                        attribute: "has_input".to_string(),
                        value: sample_id.to_string(),
                    });
                } else {
                    result.deferred.push(DeferredLinkage {
                        biosample_id: biosample_id.to_string(),
                        raw_data_identifier: raw_id.to_string(),
                        final_sample_id: sample_id.to_string(),
                    });
                }
                matched.push(raw_id);
            }
        }

        result.unmatched = rows
            .iter()
            .filter(|r| !matched.contains(&r.raw_data_identifier.as_str()))
            .map(|r| (*r).clone())
            .collect();

        result
    }

    fn in_catalog(&self, raw_id: &str) -> bool {
        raw_id.contains(&self.catalog_prefix)
    }
}
