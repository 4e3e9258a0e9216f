use thiserror::Error;

use crate::model::frame::{EstimationFrame, EstimationRow, WeightColumn};

pub const HORIZON_PREFIX: &str = "horizon";
pub const AVERAGE_COLUMN: &str = "average";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WeightError {
    #[error("column 'K' has no non-null values")]
    NoRelativeTime,

    #[error("no observations with K = {horizon} to normalise the horizon weights")]
    EmptyHorizon { horizon: i64 },

    #[error("no treated observations (K >= 0) to normalise the aggregate weight")]
    NoTreatedPeriods,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HorizonWeights {
    /// First horizon when `horizons` is not given.
    pub min_k: i64,
    /// Explicit horizons; defaults to `min_k..=max(K)`.
    pub horizons: Option<Vec<i64>>,
    pub prefix: String,
}

impl Default for HorizonWeights {
    fn default() -> Self {
        Self {
            min_k: 0,
            horizons: None,
            prefix: HORIZON_PREFIX.to_string(),
        }
    }
}

impl HorizonWeights {
    pub fn explicit(horizons: Vec<i64>) -> Self {
        Self {
            horizons: Some(horizons),
            ..Self::default()
        }
    }
}

pub fn horizon_column_name(prefix: &str, horizon: i64) -> String {
    format!("{prefix}{horizon}")
}

/// Adds one weight column per horizon `h`:
/// `iwtr / sum(iwtr | K == h)` where `0 <= K <= h` and `maxK >= h`, else 0.
/// A single weighted fit on these columns recovers every horizon effect.
pub fn assign_weights_horizon(
    frame: EstimationFrame,
    options: &HorizonWeights,
) -> Result<EstimationFrame, WeightError> {
    let horizons = match &options.horizons {
        Some(list) if !list.is_empty() => list.clone(),
        _ => {
            let max_k = frame.max_k().ok_or(WeightError::NoRelativeTime)?;
            (options.min_k..=max_k).collect()
        }
    };

    let mut frame = frame;
    for h in horizons {
        let values = horizon_weights(frame.rows(), h)?;
        frame = frame.with_column(WeightColumn {
            name: horizon_column_name(&options.prefix, h),
            values,
        });
    }
    Ok(frame)
}

fn horizon_weights(rows: &[EstimationRow], h: i64) -> Result<Vec<f64>, WeightError> {
    let total: f64 = rows
        .iter()
        .filter(|r| r.k == Some(h))
        .map(|r| r.iwtr)
        .sum();

    let in_window = |r: &EstimationRow| {
        r.k.is_some_and(|k| (0..=h).contains(&k)) && r.max_k.is_some_and(|m| m >= h)
    };

    if total == 0.0 {
        if rows.iter().any(in_window) {
            return Err(WeightError::EmptyHorizon { horizon: h });
        }
        return Ok(vec![0.0; rows.len()]);
    }

    Ok(rows
        .iter()
        .map(|r| if in_window(r) { r.iwtr / total } else { 0.0 })
        .collect())
}

/// Adds the `average` column: every post-treatment observation carries
/// `iwtr * (maxK - K + 1)` over the treated-period weight sum, so the fit
/// recovers the mean effect over all realised (unit, horizon) pairs.
pub fn assign_weights_agg(frame: EstimationFrame) -> Result<EstimationFrame, WeightError> {
    let total: f64 = frame
        .rows()
        .iter()
        .filter(|r| r.k.is_some_and(|k| k >= 0))
        .map(|r| r.iwtr)
        .sum();
    if total == 0.0 {
        return Err(WeightError::NoTreatedPeriods);
    }

    let values = frame
        .rows()
        .iter()
        .map(|r| match (r.k, r.max_k) {
            (Some(k), Some(max_k)) if k >= 0 => r.iwtr * (max_k - k + 1) as f64 / total,
            _ => 0.0,
        })
        .collect();

    Ok(frame.with_column(WeightColumn {
        name: AVERAGE_COLUMN.to_string(),
        values,
    }))
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_weights.rs"]
mod tests;
