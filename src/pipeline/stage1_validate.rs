use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::model::ColumnMap;
use crate::model::panel::{Observation, Panel, PanelRecord, UnitId, compare_labels};

#[derive(Debug, Error, PartialEq)]
pub enum PanelError {
    #[error("missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("panel has no observations")]
    Empty,

    #[error("unit '{unit}' is observed more than once in period {t}")]
    DuplicatePeriod { unit: String, t: i64 },

    #[error("unit '{unit}' changes cohort from {first:?} to {second:?}")]
    CohortChange {
        unit: String,
        first: Option<i64>,
        second: Option<i64>,
    },

    #[error("unit '{unit}' leaves treatment in period {t}; treatment must be absorbing")]
    TreatmentReversal { unit: String, t: i64 },

    #[error("unit '{unit}' period {t}: relative time {found:?} does not match expected {expected:?}")]
    RelativeTime {
        unit: String,
        t: i64,
        expected: Option<i64>,
        found: Option<i64>,
    },
}

/// Checks that every required column is present. All missing names are
/// reported at once, sorted.
pub fn validate_columns<S: AsRef<str>>(header: &[S], columns: &ColumnMap) -> Result<(), PanelError> {
    let mut missing: Vec<String> = columns
        .required()
        .iter()
        .filter(|name| !header.iter().any(|h| h.as_ref() == **name))
        .map(|name| name.to_string())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    missing.sort();
    missing.dedup();
    Err(PanelError::MissingColumns(missing))
}

/// Interns unit labels, sorts by (unit, t) and checks panel semantics.
pub fn build_panel(records: Vec<PanelRecord>, never_treated: i64) -> Result<Panel, PanelError> {
    if records.is_empty() {
        return Err(PanelError::Empty);
    }

    let mut labels: Vec<String> = records.iter().map(|r| r.unit.clone()).collect();
    labels.sort_by(|a, b| compare_labels(a, b));
    labels.dedup();
    let index: HashMap<&str, UnitId> = labels
        .iter()
        .enumerate()
        .map(|(i, l)| (l.as_str(), UnitId(i as u32)))
        .collect();

    let mut obs: Vec<Observation> = records
        .iter()
        .map(|r| Observation {
            unit: index[r.unit.as_str()],
            t: r.t,
            cohort: r.cohort,
            treated: r.treated,
            y: r.y,
            k: r.k,
        })
        .collect();
    obs.sort_by(|a, b| a.unit.cmp(&b.unit).then(a.t.cmp(&b.t)));

    let mut first_cohort: BTreeMap<UnitId, Option<i64>> = BTreeMap::new();
    for (i, o) in obs.iter().enumerate() {
        let label = || labels[o.unit.index()].clone();

        if i > 0 && obs[i - 1].unit == o.unit && obs[i - 1].t == o.t {
            return Err(PanelError::DuplicatePeriod {
                unit: label(),
                t: o.t,
            });
        }

        let cohort = *first_cohort.entry(o.unit).or_insert(o.cohort);
        if cohort != o.cohort {
            return Err(PanelError::CohortChange {
                unit: label(),
                first: cohort,
                second: o.cohort,
            });
        }

        let expected = o.cohort.map(|e| o.t - e);
        if o.k != expected {
            return Err(PanelError::RelativeTime {
                unit: label(),
                t: o.t,
                expected,
                found: o.k,
            });
        }
    }

    for unit_rows in obs.chunk_by(|a, b| a.unit == b.unit) {
        let mut seen_treated = false;
        for o in unit_rows {
            match o.treated {
                Some(true) => seen_treated = true,
                Some(false) if seen_treated => {
                    return Err(PanelError::TreatmentReversal {
                        unit: labels[o.unit.index()].clone(),
                        t: o.t,
                    });
                }
                _ => {}
            }
        }
    }

    tracing::debug!(
        units = labels.len(),
        observations = obs.len(),
        "validated panel"
    );

    Ok(Panel {
        labels,
        obs,
        never_treated,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_validate.rs"]
mod tests;
