// Parameter Injector
// Applies per-biosample scalar overrides onto quantity-shaped slots of
// matching template steps before pruning.

use crate::mapping::ParameterOverride;
use crate::template::ProtocolTemplate;

use log::warn;
use serde_json::{Map, Value};

/// What happened to a single override row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOutcome {
    /// At least one step slot was updated
    Applied,
    /// No step in the template carries the row's step name
    StepNotFound,
    /// A step matched but has no slot of the given name
    SlotNotFound,
    /// The slot exists but does not hold a quantity-shaped value
    NotAQuantity,
}

/// Per-row outcomes of one injection pass.
///
/// Unmatched rows are deliberately not fatal (sparse override tables are
/// normal), but they are reported here and logged so a gap in the template is
/// visible before the reconciler's generic unmatched check fires downstream.
#[derive(Debug, Clone, Default)]
pub struct InjectionReport {
    pub outcomes: Vec<OverrideOutcome>,
}

impl InjectionReport {
    pub fn applied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| **o == OverrideOutcome::Applied)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.applied()
    }
}

pub struct ParameterInjector;

impl ParameterInjector {
    /// Apply override rows to the working template.
    ///
    /// For each row, every step whose name matches gets the named slot's
    /// `has_numeric_value` replaced and `has_raw_value` recomputed as
    /// `"{value} {unit}"`. Applying the same table twice is idempotent.
    pub fn apply(
        template: &mut ProtocolTemplate,
        overrides: &[ParameterOverride],
    ) -> InjectionReport {
        let mut report = InjectionReport::default();

        for row in overrides {
            let outcome = Self::apply_row(template, row);
            match outcome {
                OverrideOutcome::Applied => {}
                OverrideOutcome::StepNotFound => warn!(
                    "override for step '{}' skipped: no step with that name",
                    row.stepname
                ),
                OverrideOutcome::SlotNotFound => warn!(
                    "override for '{}.{}' skipped: step has no such slot",
                    row.stepname, row.slotname
                ),
                OverrideOutcome::NotAQuantity => warn!(
                    "override for '{}.{}' skipped: slot is not quantity-shaped",
                    row.stepname, row.slotname
                ),
            }
            report.outcomes.push(outcome);
        }

        report
    }

    fn apply_row(template: &mut ProtocolTemplate, row: &ParameterOverride) -> OverrideOutcome {
        let mut outcome = OverrideOutcome::StepNotFound;

        for step in template.steps.iter_mut().filter(|s| s.name == row.stepname) {
            let slot = match step.attributes.get_mut(&row.slotname) {
                Some(slot) => slot,
                None => {
                    outcome = outcome.max_specificity(OverrideOutcome::SlotNotFound);
                    continue;
                }
            };

            match slot.as_object_mut().filter(|obj| is_quantity(obj)) {
                Some(quantity) => {
                    let unit = quantity
                        .get("has_unit")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    quantity.insert("has_numeric_value".to_string(), Value::from(row.value));
                    quantity.insert(
                        "has_raw_value".to_string(),
                        Value::from(format!("{} {}", row.value, unit)),
                    );
                    outcome = OverrideOutcome::Applied;
                }
                None => {
                    outcome = outcome.max_specificity(OverrideOutcome::NotAQuantity);
                }
            }
        }

        outcome
    }
}

impl OverrideOutcome {
    /// Keep the most specific non-applied outcome when a row touches several
    /// steps; `Applied` always wins.
    fn max_specificity(self, other: OverrideOutcome) -> OverrideOutcome {
        use OverrideOutcome::*;
        match (self, other) {
            (Applied, _) | (_, Applied) => Applied,
            (NotAQuantity, _) | (_, NotAQuantity) => NotAQuantity,
            (SlotNotFound, _) | (_, SlotNotFound) => SlotNotFound,
            _ => StepNotFound,
        }
    }
}

/// A slot is quantity-shaped when it carries both a numeric value and a unit.
fn is_quantity(obj: &Map<String, Value>) -> bool {
    obj.contains_key("has_numeric_value") && obj.contains_key("has_unit")
}
