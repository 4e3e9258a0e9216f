pub mod prep;

use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::model::frame::EstimationFrame;
use crate::model::panel::Panel;
use crate::pipeline::stage5_weights::{
    AVERAGE_COLUMN, HORIZON_PREFIX, HorizonWeights, WeightError, assign_weights_agg,
    assign_weights_horizon,
};

pub use prep::prepare;

pub type RegressionError = Box<dyn StdError + Send + Sync>;

/// Everything an external fitter needs for one weighted fit of `dY` on the
/// weight columns.
#[derive(Debug, Clone, Copy)]
pub struct FitRequest<'a> {
    pub data: &'a EstimationFrame,
    /// Weight columns entering as treatment regressors, in output order.
    pub weights: &'a [String],
    pub cluster: Option<&'a str>,
    pub fixed_effects: Option<&'a str>,
    pub covariates: &'a [String],
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermEstimate {
    pub term: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_stat: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// Weighted fixed-effects regression engine. The library ships none; callers
/// plug in their own.
pub trait WeightedRegression {
    fn fit(&self, request: &FitRequest<'_>) -> Result<Vec<TermEstimate>, RegressionError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HorizonSelection {
    /// Every horizon from 0 to max K, plus `average`.
    Event,
    /// `average` only.
    Static,
    All,
    Explicit(Vec<i64>),
}

impl FromStr for HorizonSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "event" => Ok(HorizonSelection::Event),
            "static" => Ok(HorizonSelection::Static),
            "all" => Ok(HorizonSelection::All),
            other => other
                .split(',')
                .map(|h| h.trim().parse::<i64>())
                .collect::<Result<Vec<_>, _>>()
                .map(HorizonSelection::Explicit)
                .map_err(|_| {
                    format!("invalid horizons '{other}' (use event|static|all or a list like 0,1,2)")
                }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EstimateOptions {
    pub horizons: Option<HorizonSelection>,
    /// Pre-computed weight columns, used when `horizons` is `None`.
    pub weights: Vec<String>,
    pub pretrends: bool,
    pub aweight: Option<String>,
    pub cluster: Option<String>,
    pub fixed_effects: Option<String>,
    pub covariates: Vec<String>,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            horizons: Some(HorizonSelection::Event),
            weights: Vec::new(),
            pretrends: false,
            aweight: None,
            cluster: None,
            fixed_effects: None,
            covariates: Vec::new(),
        }
    }
}

pub enum EstimationData<'a> {
    /// Raw panel, first-differenced by [`prepare`].
    Raw {
        panel: &'a Panel,
        unit_weights: Option<&'a [f64]>,
    },
    Prepared(EstimationFrame),
}

#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("analytic weights are not supported")]
    AnalyticWeights,

    #[error("pretrend estimation is not supported")]
    Pretrends,

    #[error("no horizons and no weight columns given; at least one is required")]
    NothingToEstimate,

    #[error("unknown weight column '{0}'")]
    UnknownWeight(String),

    #[error(transparent)]
    Weights(#[from] WeightError),

    #[error("regression failed: {0}")]
    Regression(#[source] RegressionError),
}

#[derive(Debug, Clone)]
pub struct DidSwResult {
    /// One row per weight column, horizon terms labelled by their number.
    pub estimates: Vec<TermEstimate>,
    pub n_obs: usize,
    pub data: EstimationFrame,
    pub names: Vec<String>,
}

impl DidSwResult {
    pub fn term(&self, name: &str) -> Option<&TermEstimate> {
        self.estimates.iter().find(|e| e.term == name)
    }
}

impl fmt::Display for DidSwResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "**** Estimation results ****")?;
        writeln!(f, "Nobs: {}", self.n_obs)?;
        writeln!(
            f,
            "{:>10} {:>12} {:>12} {:>10} {:>10} {:>12} {:>12}",
            "term", "estimate", "std_error", "t", "p", "ci_lower", "ci_upper"
        )?;
        for e in &self.estimates {
            writeln!(
                f,
                "{:>10} {:>12.6} {:>12.6} {:>10.4} {:>10.4} {:>12.6} {:>12.6}",
                e.term, e.estimate, e.std_error, e.t_stat, e.p_value, e.ci_lower, e.ci_upper
            )?;
        }
        Ok(())
    }
}

/// Adds the weight columns a horizon selection asks for.
pub fn assign_selection(
    frame: EstimationFrame,
    selection: &HorizonSelection,
) -> Result<EstimationFrame, WeightError> {
    match selection {
        HorizonSelection::Event | HorizonSelection::All => {
            assign_weights_agg(assign_weights_horizon(frame, &HorizonWeights::default())?)
        }
        HorizonSelection::Static => assign_weights_agg(frame),
        HorizonSelection::Explicit(list) => {
            assign_weights_horizon(frame, &HorizonWeights::explicit(list.clone()))
        }
    }
}

/// Builds the horizon weights and runs one weighted fit over them.
pub fn estimate<R: WeightedRegression + ?Sized>(
    data: EstimationData<'_>,
    options: &EstimateOptions,
    regression: &R,
) -> Result<DidSwResult, EstimateError> {
    if options.aweight.is_some() {
        return Err(EstimateError::AnalyticWeights);
    }
    if options.pretrends {
        return Err(EstimateError::Pretrends);
    }

    let frame = match data {
        EstimationData::Raw {
            panel,
            unit_weights,
        } => prepare(panel, unit_weights),
        EstimationData::Prepared(frame) => frame,
    };

    let (frame, weights) = match &options.horizons {
        Some(selection) => {
            let frame = assign_selection(frame, selection)?;
            let weights: Vec<String> = frame
                .column_names()
                .into_iter()
                .filter(|n| n.starts_with(HORIZON_PREFIX) || n == AVERAGE_COLUMN)
                .collect();
            (frame, weights)
        }
        None => {
            if options.weights.is_empty() {
                return Err(EstimateError::NothingToEstimate);
            }
            if let Some(unknown) = options.weights.iter().find(|w| frame.column(w).is_none()) {
                return Err(EstimateError::UnknownWeight(unknown.clone()));
            }
            (frame, options.weights.clone())
        }
    };

    tracing::info!(
        rows = frame.len(),
        weights = weights.len(),
        "fitting weighted regression"
    );

    let request = FitRequest {
        data: &frame,
        weights: &weights,
        cluster: options.cluster.as_deref(),
        fixed_effects: options.fixed_effects.as_deref(),
        covariates: &options.covariates,
    };
    let estimates = regression
        .fit(&request)
        .map_err(EstimateError::Regression)?
        .into_iter()
        .map(|mut e| {
            if let Some(rest) = e.term.strip_prefix(HORIZON_PREFIX) {
                e.term = rest.to_string();
            }
            e
        })
        .collect();

    Ok(DidSwResult {
        estimates,
        n_obs: frame.len(),
        names: weights,
        data: frame,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/estimator/mod.rs"]
mod tests;
