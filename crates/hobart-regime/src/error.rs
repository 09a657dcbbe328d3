//! Error types for regime classification.

use hobart_data::DataError;
use thiserror::Error;

/// Result type for regime operations.
pub type Result<T> = std::result::Result<T, RegimeError>;

/// Errors raised by the classifier and the regime summary.
#[derive(Debug, Error)]
pub enum RegimeError {
    /// Invalid parameter
    #[error("Invalid regime parameter: {0}")]
    InvalidParameter(String),

    /// Dates and returns differ in length.
    #[error("Length mismatch: {dates} dates, {returns} returns")]
    LengthMismatch {
        /// Number of dates
        dates: usize,
        /// Number of returns
        returns: usize,
    },

    /// Exposures and attribution describe different sleeves.
    #[error("Sleeve mismatch: exposures for {exposures}, attribution for {attribution}")]
    SleeveMismatch {
        /// Sleeve of the exposure series
        exposures: String,
        /// Sleeve of the attribution series
        attribution: String,
    },

    /// Underlying data error
    #[error(transparent)]
    Data(#[from] DataError),
}
