use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlotError>;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Cannot read {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Nothing to plot: the measurement table is empty")]
    EmptyTable,

    #[error("Nothing to plot: no point is representable on the chosen axis scales")]
    NoPlottablePoints,

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PlotError {
    pub(crate) fn parse(line: usize, reason: impl Into<String>) -> PlotError {
        PlotError::Parse {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn render(e: impl std::fmt::Display) -> PlotError {
        PlotError::Render(e.to_string())
    }
}
