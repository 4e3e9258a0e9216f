use std::fmt;
use std::str::FromStr;

use crate::model::panel::UnitId;

/// One (cohort, horizon) cell. Orders by cohort first, then horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub cohort: i64,
    pub horizon: i64,
}

impl CellKey {
    pub fn new(cohort: i64, horizon: i64) -> Self {
        Self { cohort, horizon }
    }

    pub fn target_period(&self) -> i64 {
        self.cohort + self.horizon
    }
}

/// Per-unit row key of the comparison join, ordered (cohort, unit, horizon).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitCellKey {
    pub cohort: i64,
    pub unit: UnitId,
    pub horizon: i64,
}

impl UnitCellKey {
    pub fn new(cohort: i64, unit: UnitId, horizon: i64) -> Self {
        Self {
            cohort,
            unit,
            horizon,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Estimator {
    Sgdd,
    Swdd,
}

impl Estimator {
    pub fn name(self) -> &'static str {
        match self {
            Estimator::Sgdd => "sgdd",
            Estimator::Swdd => "swdd",
        }
    }
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Estimator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sgdd" => Ok(Estimator::Sgdd),
            "swdd" => Ok(Estimator::Swdd),
            other => Err(format!("invalid estimator '{other}' (use sgdd|swdd)")),
        }
    }
}
