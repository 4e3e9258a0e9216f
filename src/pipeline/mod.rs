pub mod stage1_validate;
pub mod stage2_comparisons;
pub mod stage3_outcomes;
pub mod stage4_estimates;
pub mod stage5_weights;
pub mod stage6_report;

use crate::model::panel::Panel;
use stage2_comparisons::{Comparisons, run_comparisons};
use stage3_outcomes::{ComparisonOutcomes, run_outcomes};
use stage4_estimates::{ComparisonEstimate, Estimates, compare_ests, run_estimates};

/// Every intermediate table of one comparison run.
#[derive(Debug, Clone)]
pub struct ComparisonResults<'a> {
    pub comparisons: Comparisons<'a>,
    pub outcomes: ComparisonOutcomes,
    pub estimates: Estimates,
    pub comparison: Vec<ComparisonEstimate>,
}

pub fn full_comparison(panel: &Panel, max_horizon: usize) -> ComparisonResults<'_> {
    let comparisons = run_comparisons(panel, max_horizon);
    let outcomes = run_outcomes(&comparisons);
    let estimates = run_estimates(panel, &outcomes);
    let comparison = compare_ests(&estimates);

    tracing::debug!(
        cohorts = panel.cohorts().len(),
        estimates = comparison.len(),
        "comparison run finished"
    );

    ComparisonResults {
        comparisons,
        outcomes,
        estimates,
        comparison,
    }
}

/// SWDD and SGDD estimates for each (unit, cohort, horizon).
pub fn compare_estimators(panel: &Panel, max_horizon: usize) -> Vec<ComparisonEstimate> {
    full_comparison(panel, max_horizon).comparison
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/mod.rs"]
mod tests;
