use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use thiserror::Error;

use crate::model::panel::{Panel, UnitId};
use crate::pipeline::compare_estimators;
use crate::report::{AggLevel, Describe, aggregate, describe, mean, std_dev};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BootstrapError {
    #[error("cannot bootstrap an empty panel")]
    EmptyPanel,
    #[error("number of replicates must be positive")]
    NoReplicates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapOptions {
    pub replicates: usize,
    pub seed: u64,
    pub level: AggLevel,
    pub max_horizon: usize,
}

/// Aggregated estimates of one group in one replicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapRow {
    pub replicate: usize,
    pub cohort: Option<i64>,
    pub horizon: Option<i64>,
    pub swdd: f64,
    pub sgdd: f64,
}

/// Resamples units with replacement and reruns the whole comparison per
/// replicate. Replicate `b` draws from `StdRng::seed_from_u64(seed + b)`, so
/// the output does not depend on the thread pool.
pub fn bootstrap(panel: &Panel, options: &BootstrapOptions) -> Result<Vec<BootstrapRow>, BootstrapError> {
    if panel.is_empty() {
        return Err(BootstrapError::EmptyPanel);
    }
    if options.replicates == 0 {
        return Err(BootstrapError::NoReplicates);
    }

    let units: Vec<UnitId> = panel.unit_ids().collect();
    tracing::info!(
        replicates = options.replicates,
        units = units.len(),
        level = %options.level,
        "bootstrap started"
    );

    let rows: Vec<BootstrapRow> = (0..options.replicates)
        .into_par_iter()
        .map(|b| replicate(panel, &units, options, b))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();

    tracing::info!(rows = rows.len(), "bootstrap finished");
    Ok(rows)
}

fn replicate(panel: &Panel, units: &[UnitId], options: &BootstrapOptions, b: usize) -> Vec<BootstrapRow> {
    let mut rng = StdRng::seed_from_u64(options.seed.wrapping_add(b as u64));
    let draws: Vec<UnitId> = (0..units.len())
        .map(|_| units[rng.gen_range(0..units.len())])
        .collect();

    let sample = panel.resample(&draws);
    let estimates = compare_estimators(&sample, options.max_horizon);
    tracing::debug!(replicate = b, estimates = estimates.len(), "replicate done");

    aggregate(&estimates, options.level, false)
        .into_iter()
        .map(|row| BootstrapRow {
            replicate: b,
            cohort: row.cohort,
            horizon: row.horizon,
            swdd: row.swdd,
            sgdd: row.sgdd,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapSummary {
    pub cohort: Option<i64>,
    pub horizon: Option<i64>,
    pub replicates: usize,
    pub swdd_mean: f64,
    pub swdd_std: f64,
    pub sgdd_mean: f64,
    pub sgdd_std: f64,
}

/// Mean and standard deviation of each estimator over the replicates of a group.
pub fn bootstrap_summary(rows: &[BootstrapRow]) -> Vec<BootstrapSummary> {
    grouped(rows)
        .into_iter()
        .map(|((cohort, horizon), (swdd, sgdd))| BootstrapSummary {
            cohort,
            horizon,
            replicates: swdd.len(),
            swdd_mean: mean(&swdd),
            swdd_std: std_dev(&swdd),
            sgdd_mean: mean(&sgdd),
            sgdd_std: std_dev(&sgdd),
        })
        .collect()
}

/// Describe of the replicate estimates per group: `(cohort, horizon, sgdd, swdd)`.
pub fn bootstrap_describe(
    rows: &[BootstrapRow],
) -> Vec<(Option<i64>, Option<i64>, Option<Describe>, Option<Describe>)> {
    grouped(rows)
        .into_iter()
        .map(|((cohort, horizon), (swdd, sgdd))| (cohort, horizon, describe(&sgdd), describe(&swdd)))
        .collect()
}

type GroupValues = BTreeMap<(Option<i64>, Option<i64>), (Vec<f64>, Vec<f64>)>;

fn grouped(rows: &[BootstrapRow]) -> GroupValues {
    let mut groups: GroupValues = BTreeMap::new();
    for r in rows {
        let entry = groups.entry((r.cohort, r.horizon)).or_default();
        entry.0.push(r.swdd);
        entry.1.push(r.sgdd);
    }
    groups
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/bootstrap.rs"]
mod tests;
