pub mod config;
pub mod frame;
pub mod keys;
pub mod panel;

pub use config::{ColumnMap, ComparisonConfig};
pub use frame::{EstimationFrame, EstimationRow, WeightColumn};
pub use keys::{CellKey, Estimator, UnitCellKey};
pub use panel::{Observation, Panel, PanelRecord, UnitId};
