use thiserror::Error;

pub mod gz;
pub mod panel;

pub use gz::open_maybe_gz;
pub use panel::{
    LoadedPanel, load_panel, read_panel, write_groups, write_observations, write_panel,
};

use crate::pipeline::stage1_validate::PanelError;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Panel(#[from] PanelError),

    #[error("line {line}, column '{column}': cannot parse '{value}' as {expected}")]
    Parse {
        line: u64,
        column: String,
        value: String,
        expected: &'static str,
    },

    #[error("unit '{unit}' has more than one value in weight column '{column}'")]
    UnitWeight { unit: String, column: String },
}
