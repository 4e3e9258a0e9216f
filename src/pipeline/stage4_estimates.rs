use std::collections::{BTreeMap, HashMap};

use crate::model::keys::CellKey;
use crate::model::panel::{Panel, UnitId};
use crate::pipeline::stage3_outcomes::{ComparisonOutcomes, ControlAggregate};

/// Double-differenced outcome of one treated unit at one horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectEstimate {
    pub unit: UnitId,
    pub t: i64,
    pub cohort: i64,
    pub horizon: i64,
    pub y: f64,
    /// Unit outcome in period `E - 1`.
    pub y_base: f64,
    pub y_c: f64,
    pub ghat: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Estimates {
    pub swdd: Vec<EffectEstimate>,
    pub sgdd: Vec<EffectEstimate>,
}

/// SWDD and SGDD estimate side by side for one (unit, cohort, horizon).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonEstimate {
    pub unit: UnitId,
    pub cohort: i64,
    pub horizon: i64,
    pub swdd: f64,
    pub sgdd: f64,
    pub control_swdd: f64,
    pub control_sgdd: f64,
}

pub fn run_estimates(panel: &Panel, outcomes: &ComparisonOutcomes) -> Estimates {
    Estimates {
        swdd: double_difference(panel, &outcomes.g_swdd),
        sgdd: double_difference(panel, &outcomes.g_sgdd),
    }
}

/// Joins every treated observation `(E, K)` with the control aggregate of
/// cell `(E, h = K)`: `ghat = Y - Y_{E-1} - Y_C(E, h)`. Observations without
/// a matching cell, without a `K = -1` row or with a null outcome on either
/// side get no estimate.
fn double_difference(
    panel: &Panel,
    aggregates: &BTreeMap<CellKey, ControlAggregate>,
) -> Vec<EffectEstimate> {
    let baselines: HashMap<UnitId, f64> = panel
        .observations()
        .iter()
        .filter(|o| o.k == Some(-1))
        .filter_map(|o| Some((o.unit, o.y?)))
        .collect();

    panel
        .observations()
        .iter()
        .filter_map(|o| {
            let (cohort, horizon) = (o.cohort?, o.k?);
            let agg = aggregates.get(&CellKey::new(cohort, horizon))?;
            let y_base = *baselines.get(&o.unit)?;
            let y = o.y?;
            Some(EffectEstimate {
                unit: o.unit,
                t: o.t,
                cohort,
                horizon,
                y,
                y_base,
                y_c: agg.y_c,
                ghat: y - y_base - agg.y_c,
            })
        })
        .collect()
}

/// Inner join of both estimators on (unit, cohort, horizon), in panel order.
pub fn compare_ests(estimates: &Estimates) -> Vec<ComparisonEstimate> {
    let sgdd: HashMap<(UnitId, i64, i64), &EffectEstimate> = estimates
        .sgdd
        .iter()
        .map(|e| ((e.unit, e.cohort, e.horizon), e))
        .collect();

    estimates
        .swdd
        .iter()
        .filter_map(|sw| {
            let sg = sgdd.get(&(sw.unit, sw.cohort, sw.horizon))?;
            Some(ComparisonEstimate {
                unit: sw.unit,
                cohort: sw.cohort,
                horizon: sw.horizon,
                swdd: sw.ghat,
                sgdd: sg.ghat,
                control_swdd: sw.y_c,
                control_sgdd: sg.y_c,
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_estimates.rs"]
mod tests;
