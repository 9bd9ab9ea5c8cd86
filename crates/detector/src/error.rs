use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Market data failed validation: {0}")]
    Validation(String),

    #[error("Detector received invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Failed to read the market data table: {0}")]
    Table(#[from] polars::prelude::PolarsError),

    #[error("I/O error while reading market data: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}
