use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::pipeline::stage1_validate::{PanelError, build_panel};

/// Interned unit identifier. In a validated panel ids follow the natural
/// order of the unit labels; a resampled panel numbers units in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub u32);

impl UnitId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Untyped-unit input row, as read from a table or built by a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelRecord {
    pub unit: String,
    pub t: i64,
    /// `None` marks a never-treated unit.
    pub cohort: Option<i64>,
    pub treated: Option<bool>,
    /// `None` for a missing outcome.
    pub y: Option<f64>,
    pub k: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub unit: UnitId,
    pub t: i64,
    pub cohort: Option<i64>,
    pub treated: Option<bool>,
    pub y: Option<f64>,
    pub k: Option<i64>,
}

impl Observation {
    pub fn is_untreated(&self) -> bool {
        self.treated == Some(false)
    }
}

/// Validated panel, sorted by (unit, t).
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub(crate) labels: Vec<String>,
    pub(crate) obs: Vec<Observation>,
    pub(crate) never_treated: i64,
}

impl Panel {
    /// Validates `records` and builds the panel. `never_treated` is the cohort
    /// code reported for units without an adoption date.
    pub fn from_records(records: Vec<PanelRecord>, never_treated: i64) -> Result<Self, PanelError> {
        build_panel(records, never_treated)
    }

    pub fn observations(&self) -> &[Observation] {
        &self.obs
    }

    pub fn len(&self) -> usize {
        self.obs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obs.is_empty()
    }

    pub fn n_units(&self) -> usize {
        self.labels.len()
    }

    pub fn unit_ids(&self) -> impl Iterator<Item = UnitId> + '_ {
        (0..self.labels.len() as u32).map(UnitId)
    }

    pub fn label(&self, unit: UnitId) -> &str {
        self.labels
            .get(unit.index())
            .map(String::as_str)
            .unwrap_or("?")
    }

    pub fn unit_by_label(&self, label: &str) -> Option<UnitId> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|idx| UnitId(idx as u32))
    }

    pub fn never_treated(&self) -> i64 {
        self.never_treated
    }

    /// Cohort code as reported in tables: the sentinel for never-treated units.
    pub fn cohort_code(&self, cohort: Option<i64>) -> i64 {
        cohort.unwrap_or(self.never_treated)
    }

    /// Distinct adoption cohorts, ascending. The never-treated group is excluded.
    pub fn cohorts(&self) -> Vec<i64> {
        let set: BTreeSet<i64> = self.obs.iter().filter_map(|o| o.cohort).collect();
        set.into_iter().collect()
    }

    pub fn periods(&self) -> Vec<i64> {
        let set: BTreeSet<i64> = self.obs.iter().map(|o| o.t).collect();
        set.into_iter().collect()
    }

    /// Observations grouped by calendar period.
    pub fn by_period(&self) -> BTreeMap<i64, Vec<&Observation>> {
        let mut out: BTreeMap<i64, Vec<&Observation>> = BTreeMap::new();
        for obs in &self.obs {
            out.entry(obs.t).or_default().push(obs);
        }
        out
    }

    /// Observations of one unit, in time order.
    pub fn unit_rows(&self, unit: UnitId) -> &[Observation] {
        let start = self.obs.partition_point(|o| o.unit < unit);
        let end = self.obs.partition_point(|o| o.unit <= unit);
        &self.obs[start..end]
    }

    /// Rows of the units in `units`, in panel order.
    pub fn rows_of<'a>(&'a self, units: &'a [UnitId]) -> impl Iterator<Item = &'a Observation> + 'a {
        units.iter().flat_map(move |&u| self.unit_rows(u).iter())
    }

    /// Builds a new panel from the given unit draws. Every draw becomes its own
    /// unit, labelled `<label>#<draw index>`, so repeated draws are kept apart.
    /// Draw `i` gets `UnitId(i)`; labels are not re-sorted.
    pub fn resample(&self, draws: &[UnitId]) -> Panel {
        let mut labels = Vec::with_capacity(draws.len());
        let mut obs = Vec::new();
        for (copy, &unit) in draws.iter().enumerate() {
            let new_id = UnitId(copy as u32);
            labels.push(format!("{}#{}", self.label(unit), copy));
            obs.extend(self.unit_rows(unit).iter().map(|o| Observation {
                unit: new_id,
                ..*o
            }));
        }
        Panel {
            labels,
            obs,
            never_treated: self.never_treated,
        }
    }

    pub fn to_records(&self) -> Vec<PanelRecord> {
        self.obs
            .iter()
            .map(|o| PanelRecord {
                unit: self.label(o.unit).to_string(),
                t: o.t,
                cohort: o.cohort,
                treated: o.treated,
                y: o.y,
                k: o.k,
            })
            .collect()
    }
}

/// Orders labels numerically when both parse as integers, lexically otherwise.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/panel.rs"]
mod tests;
