//! Error types for the modeling pipeline.

use crate::config::ConfigError;
use hobart_data::DataError;
use hobart_exposure::ExposureError;
use hobart_output::{ExportError, SummaryError, ValidationError};
use hobart_regime::RegimeError;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, HobartError>;

/// Errors raised while running the pipeline or writing its bundle.
#[derive(Debug, Error)]
pub enum HobartError {
    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Loading or alignment failure
    #[error(transparent)]
    Data(#[from] DataError),

    /// Rolling regression or attribution failure
    #[error(transparent)]
    Exposure(#[from] ExposureError),

    /// Regime classification or summary failure
    #[error(transparent)]
    Regime(#[from] RegimeError),

    /// Portfolio summary failure
    #[error(transparent)]
    Summary(#[from] SummaryError),

    /// Bundle writing failure
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Bundle validation failure
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A factor sleeve names a table that was not loaded.
    #[error("sleeve {sleeve} needs factor table {table}, which was not supplied")]
    MissingFactorTable {
        /// Sleeve name
        sleeve: String,
        /// Factor table name
        table: String,
    },

    /// Configuration echo could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
