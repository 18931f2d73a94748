// Mapping Tables
// Typed rows for the external tabular interface (sample-to-raw-data mapping
// and per-biosample parameter overrides); CSV ingestion itself lives with the
// caller.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while validating mapping rows.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("mapping row {row} is missing a value for '{field}'")]
    MissingValue { row: usize, field: &'static str },
}

/// One row of the sample-to-raw-data mapping table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMapping {
    pub biosample_id: String,
    pub raw_data_identifier: String,
    pub processedsample_placeholder: String,
    pub material_processing_protocol_id: String,
}

/// One row of the optional per-biosample override table. The named slot of
/// the named step gets its numeric value replaced before pruning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterOverride {
    pub biosample_id: String,
    pub material_processing_protocol_id: String,
    pub stepname: String,
    pub slotname: String,
    pub value: f64,
}

/// A validated collection of sample mapping rows with the per-biosample
/// queries the curation run needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTable {
    rows: Vec<SampleMapping>,
}

impl MappingTable {
    /// Build a table, rejecting rows with empty key fields.
    pub fn new(rows: Vec<SampleMapping>) -> Result<Self, MappingError> {
        for (i, row) in rows.iter().enumerate() {
            if row.biosample_id.trim().is_empty() {
                return Err(MappingError::MissingValue {
                    row: i,
                    field: "biosample_id",
                });
            }
            if row.raw_data_identifier.trim().is_empty() {
                return Err(MappingError::MissingValue {
                    row: i,
                    field: "raw_data_identifier",
                });
            }
            if row.processedsample_placeholder.trim().is_empty() {
                return Err(MappingError::MissingValue {
                    row: i,
                    field: "processedsample_placeholder",
                });
            }
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[SampleMapping] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Restrict the table to rows for one protocol.
    pub fn for_protocol(&self, protocol_id: &str) -> MappingTable {
        MappingTable {
            rows: self
                .rows
                .iter()
                .filter(|r| r.material_processing_protocol_id == protocol_id)
                .cloned()
                .collect(),
        }
    }

    /// Unique biosample ids in first-seen order.
    pub fn biosamples(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.biosample_id) {
                seen.push(row.biosample_id.clone());
            }
        }
        seen
    }

    /// Rows belonging to one biosample.
    pub fn rows_for(&self, biosample_id: &str) -> Vec<SampleMapping> {
        self.rows
            .iter()
            .filter(|r| r.biosample_id == biosample_id)
            .cloned()
            .collect()
    }

    /// Unique target placeholders expected for one biosample, in row order.
    pub fn targets_for(&self, biosample_id: &str) -> Vec<String> {
        let mut targets = Vec::new();
        for row in &self.rows {
            if row.biosample_id == biosample_id
                && !targets.contains(&row.processedsample_placeholder)
            {
                targets.push(row.processedsample_placeholder.clone());
            }
        }
        targets
    }

    /// How many biosamples expect each combination of final outputs, keyed by
    /// the sorted ` + `-joined placeholder set. Useful as a pre-run sanity
    /// summary of the mapping table.
    pub fn pattern_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for biosample in self.biosamples() {
            let mut targets = self.targets_for(&biosample);
            targets.sort();
            *counts.entry(targets.join(" + ")).or_insert(0) += 1;
        }
        counts
    }
}
