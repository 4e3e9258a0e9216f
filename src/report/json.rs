use serde::Serialize;

use crate::model::panel::Panel;
use crate::pipeline::ComparisonResults;
use crate::report::{AggLevel, aggregate, mean};

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub tool: &'static str,
    pub version: &'static str,
    pub input: InputSummary,
    pub controls: ControlSummary,
    pub estimates: EstimateSummary,
    pub dynamic: Vec<HorizonSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputSummary {
    pub n_units: usize,
    pub n_obs: usize,
    pub cohorts: Vec<i64>,
    pub periods: Vec<i64>,
    pub never_treated: i64,
    pub max_horizon: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControlSummary {
    pub sgdd_cells: usize,
    pub swdd_cells: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EstimateSummary {
    pub n_pairs: usize,
    pub swdd_mean: f64,
    pub sgdd_mean: f64,
    pub max_abs_diff: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HorizonSummary {
    pub horizon: i64,
    pub swdd: f64,
    pub sgdd: f64,
    pub n: usize,
}

pub fn build_summary(panel: &Panel, results: &ComparisonResults<'_>) -> Summary {
    let swdd: Vec<f64> = results.comparison.iter().map(|r| r.swdd).collect();
    let sgdd: Vec<f64> = results.comparison.iter().map(|r| r.sgdd).collect();
    let max_abs_diff = results
        .comparison
        .iter()
        .map(|r| (r.swdd - r.sgdd).abs())
        .fold(0.0, f64::max);

    let dynamic = aggregate(&results.comparison, AggLevel::Dynamic, true)
        .into_iter()
        .filter_map(|r| {
            Some(HorizonSummary {
                horizon: r.horizon?,
                swdd: r.swdd,
                sgdd: r.sgdd,
                n: r.n.unwrap_or(0),
            })
        })
        .collect();

    Summary {
        tool: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        input: InputSummary {
            n_units: panel.n_units(),
            n_obs: panel.len(),
            cohorts: panel.cohorts(),
            periods: panel.periods(),
            never_treated: panel.never_treated(),
            max_horizon: results.comparisons.max_horizon,
        },
        controls: ControlSummary {
            sgdd_cells: results.comparisons.sgdd.len(),
            swdd_cells: results.comparisons.swdd.len(),
        },
        estimates: EstimateSummary {
            n_pairs: results.comparison.len(),
            swdd_mean: mean(&swdd),
            sgdd_mean: mean(&sgdd),
            max_abs_diff,
        },
        dynamic,
    }
}

/// NaN means serialize as `null`.
pub fn render_summary_json(summary: &Summary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}
