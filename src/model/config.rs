use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::input::InputError;

pub const DEFAULT_MAX_HORIZON: usize = 7;
pub const DEFAULT_NEVER_TREATED: i64 = 0;

/// Column names of the input panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub unit: String,
    pub time: String,
    pub cohort: String,
    pub treatment: String,
    pub outcome: String,
    pub relative_time: String,
    /// Optional unit-constant regression weight (`iwtr`).
    pub weight: Option<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            unit: "id".to_string(),
            time: "t".to_string(),
            cohort: "E".to_string(),
            treatment: "D".to_string(),
            outcome: "Y".to_string(),
            relative_time: "K".to_string(),
            weight: None,
        }
    }
}

impl ColumnMap {
    pub fn required(&self) -> [&str; 6] {
        [
            self.unit.as_str(),
            self.time.as_str(),
            self.cohort.as_str(),
            self.treatment.as_str(),
            self.outcome.as_str(),
            self.relative_time.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Horizons 0..max_horizon-1 are considered for every cohort.
    pub max_horizon: usize,
    /// Cohort code of never-treated units.
    pub never_treated: i64,
    pub columns: ColumnMap,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            max_horizon: DEFAULT_MAX_HORIZON,
            never_treated: DEFAULT_NEVER_TREATED,
            columns: ColumnMap::default(),
        }
    }
}

impl ComparisonConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, InputError> {
        let text = fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/config.rs"]
mod tests;
