// Graph Pruner
// Backward-reachability reduction of a protocol template to the minimal
// subgraph producing a requested set of output placeholders.

use crate::template::{ProtocolStep, ProtocolTemplate};

use log::warn;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Errors raised while pruning a template.
#[derive(Debug, Error)]
pub enum PruneError {
    #[error(
        "pruning did not converge after {passes} passes; the template likely \
         contains a placeholder cycle"
    )]
    NonConvergence { passes: usize },
}

/// Result of pruning: the reduced template plus the targets no step produces.
///
/// Missing targets are not an error here; the reconciler's unmatched-identifier
/// check is the authoritative downstream signal for them.
#[derive(Debug, Clone)]
pub struct PruneOutcome {
    pub template: ProtocolTemplate,
    pub missing_targets: Vec<String>,
}

pub struct GraphPruner;

impl GraphPruner {
    /// Reduce `template` to the steps and blueprints needed to produce
    /// exactly `targets`, restricting each retained step's outputs to the
    /// required subset and re-sorting by declared sequence number.
    ///
    /// The backward trace is a fixed-point iteration: a step may be revisited
    /// and its matched-output set extended across passes. Termination is
    /// bounded by the monotonic growth of the required-output set, with a
    /// hard pass cap as a guard against templates whose outputs are
    /// transitively their own inputs.
    pub fn prune(
        template: &ProtocolTemplate,
        targets: &[String],
    ) -> Result<PruneOutcome, PruneError> {
        let mut to_trace: BTreeSet<String> = targets.iter().cloned().collect();
        let mut required: Vec<usize> = Vec::new();
        let mut required_outputs: BTreeSet<String> = BTreeSet::new();
        let mut matched: HashMap<usize, BTreeSet<String>> = HashMap::new();

        // One pass per distinct output placeholder is the worst honest case;
        // anything beyond that is a cycle.
        let cap = template
            .steps
            .iter()
            .map(|s| s.has_output.len())
            .sum::<usize>()
            + 1;
        let mut passes = 0;

        while !to_trace.is_empty() {
            passes += 1;
            if passes > cap {
                return Err(PruneError::NonConvergence { passes });
            }

            let current = std::mem::take(&mut to_trace);
            let known_before = required_outputs.len();

            for (idx, step) in template.steps.iter().enumerate() {
                let hit: BTreeSet<String> = step
                    .has_output
                    .iter()
                    .filter(|o| current.contains(*o))
                    .cloned()
                    .collect();
                if hit.is_empty() {
                    continue;
                }

                matched.entry(idx).or_default().extend(hit.iter().cloned());
                if !required.contains(&idx) {
                    required.push(idx);
                }
                required_outputs.extend(hit);

                for input in &step.has_input {
                    if !required_outputs.contains(input) {
                        to_trace.insert(input.clone());
                    }
                }
            }

            // No step produced a new hit this pass; whatever is left in the
            // trace set cannot be produced by this template.
            if required_outputs.len() == known_before {
                break;
            }
        }

        let missing_targets: Vec<String> = targets
            .iter()
            .filter(|t| !required_outputs.contains(*t))
            .cloned()
            .collect();
        if !missing_targets.is_empty() {
            warn!(
                "targets not produced by any template step: {}",
                missing_targets.join(", ")
            );
        }

        let mut steps: Vec<ProtocolStep> = required
            .iter()
            .map(|&idx| {
                let mut step = template.steps[idx].clone();
                let keep = &matched[&idx];
                step.has_output.retain(|o| keep.contains(o));
                step
            })
            .collect();
        steps.sort_by_key(|s| s.sequence);

        let blueprints = template
            .blueprints
            .iter()
            .filter(|b| required_outputs.contains(&b.placeholder))
            .cloned()
            .collect();

        Ok(PruneOutcome {
            template: ProtocolTemplate { steps, blueprints },
            missing_targets,
        })
    }
}
