use std::io;
use std::path::PathBuf;

use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

/// Error type shared by the fetch, table and chart layers.
#[derive(Error, Debug)]
pub enum AgroError {
    /// A caller named a country, year or column the cleaned table does not
    /// contain.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// The fetch/cache layer could not produce the expected source file, or
    /// an operation ran before any data was loaded.
    #[error("missing data: {0}")]
    MissingData(String),

    /// A source file exists but does not look like the expected table.
    #[error("malformed source: {0}")]
    Malformed(String),

    #[error("could not read `{}`: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("could not parse table: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not parse boundaries: {0}")]
    Geo(#[from] geojson::Error),

    #[error("could not parse configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("chart rendering failed: {0}")]
    Render(String),
}

/// Result alias used throughout the crate.
pub type AgroResult<T> = Result<T, AgroError>;

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for AgroError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        AgroError::Render(err.to_string())
    }
}
