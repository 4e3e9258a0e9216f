//! Stepwise (SWDD) and sequential (SGDD) difference-in-differences
//! comparison groups for staggered adoption panels.

pub mod estimator;
pub mod input;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod sim;
pub mod tracing;

pub use estimator::{
    DidSwResult, EstimateError, EstimateOptions, EstimationData, FitRequest, HorizonSelection,
    TermEstimate, WeightedRegression, estimate,
};
pub use model::{ComparisonConfig, Estimator, Panel, PanelRecord, UnitId};
pub use pipeline::{ComparisonResults, compare_estimators, full_comparison};

#[cfg(test)]
#[path = "../tests/src_inline/testing.rs"]
pub(crate) mod testing;
