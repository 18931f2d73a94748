// Curation Service
// Drives the per-biosample loop: clone the template, inject overrides, prune
// to the biosample's targets, materialize, reconcile, and commit the unit's
// records on full success.

use crate::error::ServiceResult;
use crate::inject::ParameterInjector;
use crate::mapping::{MappingTable, ParameterOverride};
use crate::materialize::{
    IdMinter, Materializer, ProcessTypeValidator, RecordStore, ResolvedTable,
};
use crate::prune::GraphPruner;
use crate::reconcile::{DeferredLinkage, Reconciler, UpdateAction};
use crate::template::ProtocolTemplate;

use log::info;

/// Default root placeholder name seeding each unit's resolved table.
pub const DEFAULT_ROOT_PLACEHOLDER: &str = "Biosample";

/// Per-biosample accounting for the run report.
#[derive(Debug, Clone)]
pub struct UnitSummary {
    pub biosample_id: String,
    pub targets: Vec<String>,
    pub final_output_count: usize,
    pub overrides_applied: usize,
    /// Targets no template step produces (caught again by reconciliation)
    pub missing_targets: Vec<String>,
}

/// Everything a successful run produces.
#[derive(Debug, Clone, Default)]
pub struct CurationOutcome {
    pub store: RecordStore,
    pub updates: Vec<UpdateAction>,
    pub deferred: Vec<DeferredLinkage>,
    pub summaries: Vec<UnitSummary>,
}

/// Expands one protocol's template for every biosample in a mapping table.
///
/// The loaded template is never mutated; each unit of work operates on its
/// own clone with its own resolved table, so a failed unit leaves no trace
/// in the outcome. The first failure aborts the run.
pub struct CurationService<M: IdMinter, V: ProcessTypeValidator> {
    template: ProtocolTemplate,
    protocol_id: String,
    root_placeholder: String,
    reconciler: Reconciler,
    minter: M,
    validator: V,
}

impl<M: IdMinter, V: ProcessTypeValidator> CurationService<M, V> {
    pub fn new(
        template: ProtocolTemplate,
        protocol_id: impl Into<String>,
        minter: M,
        validator: V,
    ) -> Self {
        Self {
            template,
            protocol_id: protocol_id.into(),
            root_placeholder: DEFAULT_ROOT_PLACEHOLDER.to_string(),
            reconciler: Reconciler::default(),
            minter,
            validator,
        }
    }

    pub fn with_root_placeholder(mut self, name: impl Into<String>) -> Self {
        self.root_placeholder = name.into();
        self
    }

    pub fn with_reconciler(mut self, reconciler: Reconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    /// Run every (biosample, protocol) unit of work the mapping table names.
    pub fn run(
        &mut self,
        mappings: &MappingTable,
        overrides: &[ParameterOverride],
    ) -> ServiceResult<CurationOutcome> {
        let scoped = mappings.for_protocol(&self.protocol_id);
        for (pattern, count) in scoped.pattern_counts() {
            info!("{} biosample(s) expect final outputs [{}]", count, pattern);
        }

        let mut outcome = CurationOutcome::default();

        for biosample_id in scoped.biosamples() {
            let unit_rows = scoped.rows_for(&biosample_id);
            let targets = scoped.targets_for(&biosample_id);

            let mut working = self.template.clone();
            let unit_overrides: Vec<ParameterOverride> = overrides
                .iter()
                .filter(|o| {
                    o.biosample_id == biosample_id
                        && o.material_processing_protocol_id == self.protocol_id
                })
                .cloned()
                .collect();
            let injection = ParameterInjector::apply(&mut working, &unit_overrides);

            let pruned = GraphPruner::prune(&working, &targets)?;

            let mut resolved = ResolvedTable::seeded(&self.root_placeholder, &biosample_id);
            let unit = Materializer::new(&mut self.minter, &self.validator)
                .run(&pruned.template, &mut resolved)?;

            let reconciliation =
                self.reconciler
                    .reconcile(&biosample_id, &unit.final_outputs, &unit_rows);
            reconciliation.ensure_complete(&biosample_id)?;

            outcome.store.commit(unit.batch);
            outcome.updates.extend(reconciliation.updates);
            outcome.deferred.extend(reconciliation.deferred);
            outcome.summaries.push(UnitSummary {
                biosample_id,
                targets,
                final_output_count: unit.final_outputs.len(),
                overrides_applied: injection.applied(),
                missing_targets: pruned.missing_targets,
            });
        }

        info!(
            "curation run complete: {} processed sample(s), {} processing step(s) across {} biosample(s)",
            outcome.store.processed_sample_set.len(),
            outcome.store.material_processing_set.len(),
            outcome.summaries.len()
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ServiceError;
    use crate::mapping::SampleMapping;
    use crate::materialize::{MintError, StandardProcessTypes};
    use crate::template::TemplateParser;

    const PROTOCOL: &str = "protocol-1";

    /// Scenario template:
    /// Step1 Extraction{in: [Biosample], out: [cold, hot]},
    /// Step2 Pooling{in: [cold], out: [pooled]}
    const OUTLINE: &str = r#"
steps:
  - Step 1:
      Metabolite extraction:
        Extraction:
          has_input:
            - Biosample
          has_output:
            - cold
            - hot
          volume:
            has_numeric_value: 10
            has_unit: mL
            has_raw_value: 10 mL
  - Step 2:
      Extract pooling:
        PoolingProcess:
          has_input:
            - cold
          has_output:
            - pooled
processedsamples:
  - cold:
      ProcessedSample:
        name: cold extract of <Biosample>
  - hot:
      ProcessedSample:
        name: hot extract of <Biosample>
  - pooled:
      ProcessedSample:
        name: pooled extract
"#;

    struct SequentialMinter {
        counter: u32,
    }

    impl IdMinter for SequentialMinter {
        fn mint(&mut self, type_tag: &str) -> Result<String, MintError> {
            self.counter += 1;
            let prefix = if type_tag == "ProcessedSample" {
                "procsm"
            } else {
                "proc"
            };
            Ok(format!("nmdc:{}-{}", prefix, self.counter))
        }
    }

    fn make_service() -> CurationService<SequentialMinter, StandardProcessTypes> {
        let template = TemplateParser::parse(OUTLINE).unwrap();
        CurationService::new(
            template,
            PROTOCOL,
            SequentialMinter { counter: 0 },
            StandardProcessTypes,
        )
    }

    fn mapping_row(biosample: &str, raw: &str, placeholder: &str) -> SampleMapping {
        SampleMapping {
            biosample_id: biosample.to_string(),
            raw_data_identifier: raw.to_string(),
            processedsample_placeholder: placeholder.to_string(),
            material_processing_protocol_id: PROTOCOL.to_string(),
        }
    }

    #[test]
    fn test_scenario_a_pooled_target() {
        let mut service = make_service();
        let mappings = MappingTable::new(vec![mapping_row(
            "nmdc:bsm-1",
            "sample1.raw",
            "pooled",
        )])
        .unwrap();

        let outcome = service.run(&mappings, &[]).unwrap();

        // Pruned unit: Extraction restricted to cold, then Pooling.
        assert_eq!(outcome.store.material_processing_set.len(), 2);
        assert_eq!(outcome.store.processed_sample_set.len(), 2); // cold + pooled

        // cold is consumed by pooling, so pooled is the only final output.
        assert_eq!(outcome.summaries.len(), 1);
        assert_eq!(outcome.summaries[0].final_output_count, 1);

        // Raw file has no catalog id yet -> deferred linkage.
        assert!(outcome.updates.is_empty());
        assert_eq!(outcome.deferred.len(), 1);
        assert_eq!(outcome.deferred[0].raw_data_identifier, "sample1.raw");
    }

    #[test]
    fn test_scenario_b_hot_target() {
        let mut service = make_service();
        let mappings =
            MappingTable::new(vec![mapping_row("nmdc:bsm-1", "sample1.raw", "hot")]).unwrap();

        let outcome = service.run(&mappings, &[]).unwrap();

        // Pooling is dropped; only the extraction step survives.
        assert_eq!(outcome.store.material_processing_set.len(), 1);
        assert_eq!(outcome.store.processed_sample_set.len(), 1);
        assert_eq!(
            outcome.store.material_processing_set[0].has_output.len(),
            1
        );
        assert_eq!(outcome.summaries[0].final_output_count, 1);
    }

    #[test]
    fn test_scenario_c_excluded_target_is_reconcile_error() {
        let mut service = make_service();
        // "ghost" is mapped but never produced by any step; pruning skips it
        // silently and reconciliation must catch it.
        let mappings = MappingTable::new(vec![
            mapping_row("nmdc:bsm-1", "sample1.raw", "ghost"),
            mapping_row("nmdc:bsm-1", "sample2.raw", "hot"),
        ])
        .unwrap();

        let err = service.run(&mappings, &[]).unwrap_err();
        assert!(matches!(err, ServiceError::Reconcile(_)));
    }

    #[test]
    fn test_failed_unit_commits_nothing() {
        let mut service = make_service();
        let mappings =
            MappingTable::new(vec![mapping_row("nmdc:bsm-1", "sample1.raw", "ghost")]).unwrap();

        assert!(service.run(&mappings, &[]).is_err());
        // The run owns the outcome; on error nothing escapes, so rerunning
        // with a fixed table starts from an empty store.
        let fixed =
            MappingTable::new(vec![mapping_row("nmdc:bsm-1", "sample1.raw", "hot")]).unwrap();
        let outcome = service.run(&fixed, &[]).unwrap();
        assert_eq!(outcome.store.processed_sample_set.len(), 1);
    }

    #[test]
    fn test_catalog_raw_identifier_gets_update_action() {
        let mut service = make_service();
        let mappings =
            MappingTable::new(vec![mapping_row("nmdc:bsm-1", "nmdc:dgms-42", "hot")]).unwrap();

        let outcome = service.run(&mappings, &[]).unwrap();

        assert_eq!(outcome.updates.len(), 1);
        assert!(outcome.deferred.is_empty());
        assert_eq!(outcome.updates[0].id, "nmdc:dgms-42");
        assert_eq!(outcome.updates[0].attribute, "has_input");
    }

    #[test]
    fn test_units_are_isolated_per_biosample() {
        let mut service = make_service();
        let mappings = MappingTable::new(vec![
            mapping_row("nmdc:bsm-1", "a.raw", "pooled"),
            mapping_row("nmdc:bsm-2", "b.raw", "hot"),
        ])
        .unwrap();

        let outcome = service.run(&mappings, &[]).unwrap();

        assert_eq!(outcome.summaries.len(), 2);
        // bsm-1: Extraction + Pooling; bsm-2: Extraction only.
        assert_eq!(outcome.store.material_processing_set.len(), 3);
        // Each unit's records reference its own biosample id.
        assert!(outcome.store.processed_sample_set.iter().any(|s| {
            s.attributes
                .values()
                .any(|v| v.as_str() == Some("cold extract of nmdc:bsm-1"))
        }));
        assert!(outcome.store.processed_sample_set.iter().any(|s| {
            s.attributes
                .values()
                .any(|v| v.as_str() == Some("hot extract of nmdc:bsm-2"))
        }));
    }

    #[test]
    fn test_overrides_scoped_to_biosample_and_protocol() {
        let mut service = make_service();
        let mappings =
            MappingTable::new(vec![mapping_row("nmdc:bsm-1", "a.raw", "hot")]).unwrap();

        let overrides = vec![
            ParameterOverride {
                biosample_id: "nmdc:bsm-1".to_string(),
                material_processing_protocol_id: PROTOCOL.to_string(),
                stepname: "Metabolite extraction".to_string(),
                slotname: "volume".to_string(),
                value: 25.0,
            },
            ParameterOverride {
                biosample_id: "nmdc:bsm-other".to_string(),
                material_processing_protocol_id: PROTOCOL.to_string(),
                stepname: "Metabolite extraction".to_string(),
                slotname: "volume".to_string(),
                value: 99.0,
            },
        ];

        let outcome = service.run(&mappings, &overrides).unwrap();

        assert_eq!(outcome.summaries[0].overrides_applied, 1);
        let step = &outcome.store.material_processing_set[0];
        let volume = step.attributes.get("volume").unwrap();
        assert_eq!(
            volume.get("has_raw_value").and_then(|v| v.as_str()),
            Some("25 mL")
        );
    }

    #[test]
    fn test_rows_for_other_protocols_ignored() {
        let mut service = make_service();
        let mut other = mapping_row("nmdc:bsm-1", "a.raw", "hot");
        other.material_processing_protocol_id = "protocol-2".to_string();
        let mappings = MappingTable::new(vec![other]).unwrap();

        let outcome = service.run(&mappings, &[]).unwrap();
        assert!(outcome.store.is_empty());
        assert!(outcome.summaries.is_empty());
    }
}
