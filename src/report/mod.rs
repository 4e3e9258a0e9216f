pub mod bootstrap;
pub mod csv;
pub mod json;
pub mod text;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::model::keys::Estimator;
use crate::pipeline::stage4_estimates::ComparisonEstimate;

pub const PERCENTILES: [f64; 11] = [
    0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 0.75, 0.9, 0.95, 0.975, 0.99,
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Grouping of estimates: by horizon, by (cohort, horizon), or overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggLevel {
    Dynamic,
    Group,
    Total,
}

impl AggLevel {
    pub fn name(self) -> &'static str {
        match self {
            AggLevel::Dynamic => "dynamic",
            AggLevel::Group => "group",
            AggLevel::Total => "total",
        }
    }

    /// Grouping key of an estimate at this level.
    pub fn key(self, cohort: i64, horizon: i64) -> (Option<i64>, Option<i64>) {
        match self {
            AggLevel::Dynamic => (None, Some(horizon)),
            AggLevel::Group => (Some(cohort), Some(horizon)),
            AggLevel::Total => (None, None),
        }
    }
}

impl fmt::Display for AggLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AggLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dynamic" => Ok(AggLevel::Dynamic),
            "group" => Ok(AggLevel::Group),
            "total" => Ok(AggLevel::Total),
            other => Err(format!("invalid option '{other}' (use dynamic|group|total)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateRow {
    pub cohort: Option<i64>,
    pub horizon: Option<i64>,
    pub swdd: f64,
    pub sgdd: f64,
    /// Number of estimates in the group, when requested.
    pub n: Option<usize>,
}

/// Mean SWDD and SGDD estimate per group, sorted by the group key.
pub fn aggregate(rows: &[ComparisonEstimate], level: AggLevel, with_counts: bool) -> Vec<AggregateRow> {
    let mut groups: BTreeMap<(Option<i64>, Option<i64>), (f64, f64, usize)> = BTreeMap::new();
    for r in rows {
        let acc = groups.entry(level.key(r.cohort, r.horizon)).or_insert((0.0, 0.0, 0));
        acc.0 += r.swdd;
        acc.1 += r.sgdd;
        acc.2 += 1;
    }
    groups
        .into_iter()
        .map(|((cohort, horizon), (swdd, sgdd, n))| AggregateRow {
            cohort,
            horizon,
            swdd: swdd / n as f64,
            sgdd: sgdd / n as f64,
            n: with_counts.then_some(n),
        })
        .collect()
}

/// SWDD and SGDD columns of an aggregate table, ordered by horizon.
pub fn comparison_arrays(rows: &[AggregateRow]) -> (Vec<f64>, Vec<f64>) {
    let mut sorted = rows.to_vec();
    sorted.sort_by_key(|r| r.horizon);
    sorted.iter().map(|r| (r.swdd, r.sgdd)).unzip()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    /// (percentile, value) for each of [`PERCENTILES`].
    pub percentiles: Vec<(f64, f64)>,
    pub max: f64,
}

/// Summary statistics; `None` for an empty input.
pub fn describe(values: &[f64]) -> Option<Describe> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(Describe {
        count: values.len(),
        mean: mean(values),
        std: std_dev(values),
        min: sorted[0],
        percentiles: PERCENTILES
            .iter()
            .map(|&p| (p, quantile_sorted(&sorted, p)))
            .collect(),
        max: sorted[sorted.len() - 1],
    })
}

/// Describe of the SWDD and SGDD estimates.
pub fn describe_estimates(rows: &[ComparisonEstimate]) -> Vec<(Estimator, Option<Describe>)> {
    let swdd: Vec<f64> = rows.iter().map(|r| r.swdd).collect();
    let sgdd: Vec<f64> = rows.iter().map(|r| r.sgdd).collect();
    vec![
        (Estimator::Sgdd, describe(&sgdd)),
        (Estimator::Swdd, describe(&swdd)),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuantileRow {
    pub cohort: Option<i64>,
    pub horizon: Option<i64>,
    pub estimator: Estimator,
    pub quantiles: Vec<(f64, f64)>,
}

/// Quantiles of the estimates per group and estimator.
pub fn quantile_desc(rows: &[ComparisonEstimate], level: AggLevel) -> Vec<QuantileRow> {
    let mut groups: BTreeMap<(Option<i64>, Option<i64>), (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for r in rows {
        let entry = groups.entry(level.key(r.cohort, r.horizon)).or_default();
        entry.0.push(r.sgdd);
        entry.1.push(r.swdd);
    }

    let mut out = Vec::new();
    for ((cohort, horizon), (sgdd, swdd)) in groups {
        for (estimator, mut values) in [(Estimator::Sgdd, sgdd), (Estimator::Swdd, swdd)] {
            values.sort_by(f64::total_cmp);
            out.push(QuantileRow {
                cohort,
                horizon,
                estimator,
                quantiles: PERCENTILES
                    .iter()
                    .map(|&p| (p, quantile_sorted(&values, p)))
                    .collect(),
            });
        }
    }
    out
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Nearest-rank quantile of an ascending slice.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

pub fn format_f64_6(v: f64) -> String {
    if v.is_nan() {
        return "-".to_string();
    }
    format!("{:.6}", v)
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;
