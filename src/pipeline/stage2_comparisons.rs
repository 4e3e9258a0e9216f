use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::model::keys::{CellKey, Estimator, UnitCellKey};
use crate::model::panel::{Observation, Panel, UnitId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("no {estimator} comparison for E={cohort}, h={horizon}")]
    NoComparison {
        cohort: i64,
        horizon: i64,
        estimator: Estimator,
    },
}

/// Treatment and outcome of a unit at one joined horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinedValue {
    pub horizon: i64,
    pub treated: Option<bool>,
    pub y: Option<f64>,
}

/// One unit observed at the target period `E + h` of a (cohort, horizon) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonRow {
    pub cohort: i64,
    pub horizon: i64,
    pub target: i64,
    pub unit: UnitId,
    pub treated: Option<bool>,
    pub y: Option<f64>,
    /// First joined row of the (cohort, unit) group. This is `h = -1` unless
    /// the unit is missing in period `E - 1`.
    pub baseline: Option<JoinedValue>,
    /// Preceding joined row of the same (cohort, unit), whatever its horizon.
    pub previous: Option<JoinedValue>,
    pub valid_sgdd: bool,
    pub valid_swdd: bool,
}

impl ComparisonRow {
    pub fn key(&self) -> UnitCellKey {
        UnitCellKey::new(self.cohort, self.unit, self.horizon)
    }

    pub fn value(&self) -> JoinedValue {
        JoinedValue {
            horizon: self.horizon,
            treated: self.treated,
            y: self.y,
        }
    }
}

/// Sorted, de-duplicated unit ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlSet(Vec<UnitId>);

impl ControlSet {
    pub fn as_slice(&self) -> &[UnitId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, unit: UnitId) -> bool {
        self.0.binary_search(&unit).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.0.iter().copied()
    }

    pub fn is_superset(&self, other: &ControlSet) -> bool {
        other.iter().all(|u| self.contains(u))
    }
}

impl FromIterator<UnitId> for ControlSet {
    fn from_iter<I: IntoIterator<Item = UnitId>>(iter: I) -> Self {
        let set: BTreeSet<UnitId> = iter.into_iter().collect();
        ControlSet(set.into_iter().collect())
    }
}

/// Control sets keyed by (cohort, horizon). Cells without controls are absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlTable {
    pub estimator: Estimator,
    cells: BTreeMap<CellKey, ControlSet>,
}

impl ControlTable {
    pub fn new(estimator: Estimator, cells: BTreeMap<CellKey, ControlSet>) -> Self {
        Self { estimator, cells }
    }

    pub fn get(&self, cohort: i64, horizon: i64) -> Option<&ControlSet> {
        self.cells.get(&CellKey::new(cohort, horizon))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &ControlSet)> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells of one cohort, ascending in horizon.
    pub fn cohort(&self, cohort: i64) -> impl Iterator<Item = (&CellKey, &ControlSet)> {
        self.cells
            .range(CellKey::new(cohort, i64::MIN)..=CellKey::new(cohort, i64::MAX))
    }

    pub fn horizons(&self, cohort: i64) -> Vec<i64> {
        self.cohort(cohort).map(|(k, _)| k.horizon).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Comparisons<'a> {
    pub panel: &'a Panel,
    pub max_horizon: usize,
    /// Comparison join, sorted by (cohort, unit, horizon).
    pub rows: Vec<ComparisonRow>,
    pub sgdd: ControlTable,
    pub swdd: ControlTable,
}

impl<'a> Comparisons<'a> {
    pub fn table(&self, estimator: Estimator) -> &ControlTable {
        match estimator {
            Estimator::Sgdd => &self.sgdd,
            Estimator::Swdd => &self.swdd,
        }
    }

    /// Panel rows of the units in the comparison group of (cohort, horizon).
    /// An absent cell is an error, never an empty result.
    pub fn query_comparisons(
        &self,
        cohort: i64,
        horizon: i64,
        estimator: Estimator,
    ) -> Result<Vec<&'a Observation>, QueryError> {
        let controls = self
            .table(estimator)
            .get(cohort, horizon)
            .ok_or(QueryError::NoComparison {
                cohort,
                horizon,
                estimator,
            })?;
        let panel: &'a Panel = self.panel;
        Ok(panel
            .observations()
            .iter()
            .filter(|o| controls.contains(o.unit))
            .collect())
    }

    pub fn cumulative_swdd(&self) -> ControlTable {
        cumulative_controls_swdd(&self.swdd)
    }
}

/// Joins every (cohort, horizon) target period against the panel and derives
/// the SGDD and SWDD control sets.
pub fn run_comparisons(panel: &Panel, max_horizon: usize) -> Comparisons<'_> {
    let rows = join_targets(panel, max_horizon);

    let sgdd = group_controls(Estimator::Sgdd, rows.iter().filter(|r| r.valid_sgdd));
    let swdd = group_controls(
        Estimator::Swdd,
        rows.iter().filter(|r| r.valid_swdd && r.horizon >= 0),
    );

    tracing::debug!(
        rows = rows.len(),
        sgdd_cells = sgdd.len(),
        swdd_cells = swdd.len(),
        "built comparison groups"
    );

    Comparisons {
        panel,
        max_horizon,
        rows,
        sgdd,
        swdd,
    }
}

fn join_targets(panel: &Panel, max_horizon: usize) -> Vec<ComparisonRow> {
    let by_period = panel.by_period();
    let horizons = std::iter::once(-1).chain(0..max_horizon as i64);

    let mut rows = Vec::new();
    for cohort in panel.cohorts() {
        for h in horizons.clone() {
            let key = CellKey::new(cohort, h);
            let Some(observed) = by_period.get(&key.target_period()) else {
                continue;
            };
            for obs in observed {
                rows.push(ComparisonRow {
                    cohort,
                    horizon: h,
                    target: key.target_period(),
                    unit: obs.unit,
                    treated: obs.treated,
                    y: obs.y,
                    baseline: None,
                    previous: None,
                    valid_sgdd: false,
                    valid_swdd: false,
                });
            }
        }
    }
    rows.sort_by_key(ComparisonRow::key);

    for group in rows.chunk_by_mut(|a, b| a.cohort == b.cohort && a.unit == b.unit) {
        let baseline = group.first().map(ComparisonRow::value);

        let mut previous: Option<JoinedValue> = None;
        for row in group.iter_mut() {
            row.baseline = baseline;
            row.previous = previous;
            row.valid_sgdd = sgdd_condition(row);
            row.valid_swdd = swdd_condition(row);
            previous = Some(row.value());
        }
    }
    rows
}

/// SGDD: untreated at the cohort baseline and at the target `E + h`.
fn sgdd_condition(row: &ComparisonRow) -> bool {
    row.horizon >= 0
        && row.treated == Some(false)
        && row.baseline.is_some_and(|b| b.treated == Some(false))
}

/// SWDD: untreated at `E + h` and at the preceding joined row of the unit.
/// A unit missing in `E + h - 1` steps from its last observed horizon.
fn swdd_condition(row: &ComparisonRow) -> bool {
    row.treated == Some(false) && row.previous.is_some_and(|p| p.treated == Some(false))
}

fn group_controls<'r>(
    estimator: Estimator,
    rows: impl Iterator<Item = &'r ComparisonRow>,
) -> ControlTable {
    let mut grouped: BTreeMap<CellKey, Vec<UnitId>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(CellKey::new(row.cohort, row.horizon))
            .or_default()
            .push(row.unit);
    }
    let cells = grouped
        .into_iter()
        .map(|(key, ids)| (key, ids.into_iter().collect()))
        .collect();
    ControlTable::new(estimator, cells)
}

/// Cumulative union of SWDD control sets: for each (E, h) the union of the
/// flat sets of every horizon h' <= h of the same cohort.
pub fn cumulative_controls_swdd(swdd: &ControlTable) -> ControlTable {
    let mut cells = BTreeMap::new();
    for (key, _) in swdd.iter() {
        let joined: ControlSet = swdd
            .cohort(key.cohort)
            .filter(|(other, _)| other.horizon <= key.horizon)
            .flat_map(|(_, set)| set.iter())
            .collect();
        cells.insert(*key, joined);
    }
    ControlTable::new(Estimator::Swdd, cells)
}

/// Control-group sizes per (cohort, horizon), full outer join of both estimators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlCount {
    pub cohort: i64,
    pub horizon: i64,
    /// Unique units in the cumulative SWDD set.
    pub swdd_units: Option<usize>,
    /// Running sum of flat SWDD set sizes, i.e. unit-period observations used.
    pub swdd_obs: Option<usize>,
    pub sgdd_units: Option<usize>,
}

impl ControlCount {
    pub fn extra_units(&self) -> Option<i64> {
        Some(self.swdd_units? as i64 - self.sgdd_units? as i64)
    }

    pub fn extra_obs(&self) -> Option<i64> {
        Some(self.swdd_obs? as i64 - self.sgdd_units? as i64)
    }
}

pub fn compare_controls(comps: &Comparisons<'_>) -> Vec<ControlCount> {
    let cumulative = comps.cumulative_swdd();

    let mut running: BTreeMap<CellKey, usize> = BTreeMap::new();
    let mut total_by_cohort: BTreeMap<i64, usize> = BTreeMap::new();
    for (key, set) in comps.swdd.iter() {
        let total = total_by_cohort.entry(key.cohort).or_insert(0);
        *total += set.len();
        running.insert(*key, *total);
    }

    let keys: BTreeSet<CellKey> = comps
        .swdd
        .iter()
        .chain(comps.sgdd.iter())
        .map(|(k, _)| *k)
        .collect();

    keys.into_iter()
        .map(|key| ControlCount {
            cohort: key.cohort,
            horizon: key.horizon,
            swdd_units: cumulative.get(key.cohort, key.horizon).map(ControlSet::len),
            swdd_obs: running.get(&key).copied(),
            sgdd_units: comps.sgdd.get(key.cohort, key.horizon).map(ControlSet::len),
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_comparisons.rs"]
mod tests;
