use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::config::DEFAULT_NEVER_TREATED;
use crate::model::panel::{Panel, PanelRecord};
use crate::pipeline::stage1_validate::PanelError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid innovation scale {0}")]
    Scale(f64),
    #[error("simulation needs at least one cohort, one period and one unit")]
    Empty,
    #[error(transparent)]
    Panel(#[from] PanelError),
}

/// Staggered-adoption panel generator.
///
/// `Y = alpha + beta + gamma + eps` with cohort effect `alpha = -E` (0 for
/// never-treated), period effect `beta = 3t`, treatment effect
/// `gamma = 1 + K - group_effect * F` for `K >= 0` and AR(1) noise starting
/// at 0. `F` is a fair binary group indicator drawn per unit; with the
/// default `group_effect = 0` it does not enter the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    pub n_units: usize,
    pub rho: f64,
    pub scale: f64,
    /// Adoption dates drawn uniformly per unit; `None` is never treated.
    pub cohorts: Vec<Option<i64>>,
    pub periods: Vec<i64>,
    pub never_treated: i64,
    /// Effect reduction for units with `F = 1`; 0.5 gives heterogeneous effects.
    pub group_effect: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        let mut cohorts: Vec<Option<i64>> = (2..=6).map(Some).collect();
        cohorts.push(None);
        Self {
            n_units: 250,
            rho: 1.0,
            scale: (2.0f64 / 5.0).sqrt(),
            cohorts,
            periods: (1..=6).collect(),
            never_treated: DEFAULT_NEVER_TREATED,
            group_effect: 0.0,
        }
    }
}

/// Simulated panel plus each unit's group indicator `F`, indexed by `UnitId`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimPanel {
    pub panel: Panel,
    pub groups: Vec<bool>,
}

pub fn simulate<R: Rng + ?Sized>(params: &SimParams, rng: &mut R) -> Result<Panel, SimError> {
    simulate_groups(params, rng).map(|sim| sim.panel)
}

pub fn simulate_groups<R: Rng + ?Sized>(
    params: &SimParams,
    rng: &mut R,
) -> Result<SimPanel, SimError> {
    if params.cohorts.is_empty() || params.periods.is_empty() || params.n_units == 0 {
        return Err(SimError::Empty);
    }
    let noise = Normal::new(0.0, params.scale).map_err(|_| SimError::Scale(params.scale))?;

    let mut records = Vec::with_capacity(params.n_units * params.periods.len());
    let mut groups = Vec::with_capacity(params.n_units);
    for i in 1..=params.n_units {
        let cohort = params.cohorts.choose(rng).copied().flatten();
        let group = rng.gen_bool(0.5);
        groups.push(group);
        let shift = if group { params.group_effect } else { 0.0 };
        let alpha = cohort.map(|e| -e as f64).unwrap_or(0.0);

        let mut eps = 0.0;
        for (step, &t) in params.periods.iter().enumerate() {
            if step > 0 {
                eps = params.rho * eps + noise.sample(rng);
            }
            let k = cohort.map(|e| t - e);
            let gamma = match k {
                Some(k) if k >= 0 => (1 + k) as f64 - shift,
                _ => 0.0,
            };
            records.push(PanelRecord {
                unit: i.to_string(),
                t,
                cohort,
                treated: Some(k.is_some_and(|k| k >= 0)),
                y: Some(alpha + 3.0 * t as f64 + gamma + eps),
                k,
            });
        }
    }

    let panel = Panel::from_records(records, params.never_treated)?;
    tracing::debug!(
        units = panel.n_units(),
        observations = panel.len(),
        "simulated panel"
    );
    // Labels "1".."N" sort numerically, so draw i is UnitId(i - 1).
    Ok(SimPanel { panel, groups })
}

#[cfg(test)]
#[path = "../tests/src_inline/sim.rs"]
mod tests;
