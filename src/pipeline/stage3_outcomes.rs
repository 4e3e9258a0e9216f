use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::model::keys::{CellKey, UnitCellKey};
use crate::model::panel::UnitId;
use crate::pipeline::stage2_comparisons::{ComparisonRow, Comparisons};

/// Outcome change of one control unit for one (cohort, horizon) cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutcome {
    pub cohort: i64,
    pub horizon: i64,
    pub unit: UnitId,
    pub y: f64,
    /// SGDD: outcome at the cohort baseline. SWDD: outcome at the preceding
    /// joined row, normally `E + h - 1`.
    pub y_ref: f64,
    pub dy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlAggregate {
    pub cohort: i64,
    pub horizon: i64,
    /// Counterfactual control change `Y_C(E, h)`.
    pub y_c: f64,
    /// Mean change of this cell alone. Equals `y_c` for SGDD.
    pub increment: f64,
    pub ids: Vec<UnitId>,
    pub count: usize,
    /// Units feeding `y_c`: the cell itself for SGDD, the cumulative union for SWDD.
    pub cumulative_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonOutcomes {
    pub y_sgdd: Vec<ControlOutcome>,
    pub y_swdd: Vec<ControlOutcome>,
    pub g_sgdd: BTreeMap<CellKey, ControlAggregate>,
    pub g_swdd: BTreeMap<CellKey, ControlAggregate>,
}

pub fn run_outcomes(comps: &Comparisons<'_>) -> ComparisonOutcomes {
    let index: HashMap<UnitCellKey, &ComparisonRow> =
        comps.rows.iter().map(|r| (r.key(), r)).collect();

    let y_sgdd = sgdd_outcomes(comps, &index);
    let g_sgdd = sgdd_aggregate(&y_sgdd);

    let y_swdd = swdd_outcomes(comps, &index);
    let g_swdd = swdd_aggregate(&y_swdd);

    tracing::debug!(
        sgdd_cells = g_sgdd.len(),
        swdd_cells = g_swdd.len(),
        "aggregated control outcomes"
    );

    ComparisonOutcomes {
        y_sgdd,
        y_swdd,
        g_sgdd,
        g_swdd,
    }
}

fn sgdd_outcomes(
    comps: &Comparisons<'_>,
    index: &HashMap<UnitCellKey, &ComparisonRow>,
) -> Vec<ControlOutcome> {
    let mut out = Vec::new();
    for (key, controls) in comps.sgdd.iter() {
        for unit in controls.iter() {
            let Some(row) = index.get(&UnitCellKey::new(key.cohort, unit, key.horizon)) else {
                continue;
            };
            // Null outcomes stay in the control set but not in the mean.
            let (Some(y), Some(y_ref)) = (row.y, row.baseline.and_then(|b| b.y)) else {
                continue;
            };
            out.push(ControlOutcome {
                cohort: key.cohort,
                horizon: key.horizon,
                unit,
                y,
                y_ref,
                dy: y - y_ref,
            });
        }
    }
    out
}

fn swdd_outcomes(
    comps: &Comparisons<'_>,
    index: &HashMap<UnitCellKey, &ComparisonRow>,
) -> Vec<ControlOutcome> {
    let mut out = Vec::new();
    for (key, controls) in comps.swdd.iter() {
        for unit in controls.iter() {
            let Some(row) = index.get(&UnitCellKey::new(key.cohort, unit, key.horizon)) else {
                continue;
            };
            // Same step the validity rule used; h = 0 steps off the h = -1 row.
            let (Some(y), Some(y_ref)) = (row.y, row.previous.and_then(|p| p.y)) else {
                continue;
            };
            out.push(ControlOutcome {
                cohort: key.cohort,
                horizon: key.horizon,
                unit,
                y,
                y_ref,
                dy: y - y_ref,
            });
        }
    }
    out
}

struct CellAccumulator {
    sum: f64,
    n: usize,
    ids: BTreeSet<UnitId>,
}

/// Mean `dy` and contributing unit ids per (cohort, horizon).
fn cell_means(outcomes: &[ControlOutcome]) -> BTreeMap<CellKey, (f64, Vec<UnitId>)> {
    let mut cells: BTreeMap<CellKey, CellAccumulator> = BTreeMap::new();
    for o in outcomes {
        let acc = cells
            .entry(CellKey::new(o.cohort, o.horizon))
            .or_insert_with(|| CellAccumulator {
                sum: 0.0,
                n: 0,
                ids: BTreeSet::new(),
            });
        acc.sum += o.dy;
        acc.n += 1;
        acc.ids.insert(o.unit);
    }
    cells
        .into_iter()
        .map(|(key, acc)| (key, (acc.sum / acc.n as f64, acc.ids.into_iter().collect())))
        .collect()
}

fn sgdd_aggregate(outcomes: &[ControlOutcome]) -> BTreeMap<CellKey, ControlAggregate> {
    cell_means(outcomes)
        .into_iter()
        .map(|(key, (mean, ids))| {
            let count = ids.len();
            let agg = ControlAggregate {
                cohort: key.cohort,
                horizon: key.horizon,
                y_c: mean,
                increment: mean,
                ids,
                count,
                cumulative_count: count,
            };
            (key, agg)
        })
        .collect()
}

/// Chains the per-step means of each cohort: `Y_C(E, h)` is the sum of the
/// increments of horizons 0..=h. A cohort's chain stops at the first horizon
/// without controls.
fn swdd_aggregate(outcomes: &[ControlOutcome]) -> BTreeMap<CellKey, ControlAggregate> {
    let mut out = BTreeMap::new();

    let mut cohort: Option<i64> = None;
    let mut expected = 0i64;
    let mut total = 0.0;
    let mut union: BTreeSet<UnitId> = BTreeSet::new();
    let mut broken = false;

    for (key, (mean, ids)) in cell_means(outcomes) {
        if cohort != Some(key.cohort) {
            cohort = Some(key.cohort);
            expected = 0;
            total = 0.0;
            union.clear();
            broken = false;
        }
        if broken {
            continue;
        }
        if key.horizon != expected {
            tracing::debug!(
                cohort = key.cohort,
                horizon = expected,
                "no SWDD controls; later horizons of the cohort dropped"
            );
            broken = true;
            continue;
        }

        total += mean;
        union.extend(ids.iter().copied());
        expected += 1;

        let count = ids.len();
        out.insert(
            key,
            ControlAggregate {
                cohort: key.cohort,
                horizon: key.horizon,
                y_c: total,
                increment: mean,
                ids,
                count,
                cumulative_count: union.len(),
            },
        );
    }
    out
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_outcomes.rs"]
mod tests;
