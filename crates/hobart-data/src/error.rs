//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading, aligning or combining return tables.
#[derive(Debug, Error)]
pub enum DataError {
    /// Dates are not strictly increasing.
    #[error("Dates in {table} are not strictly increasing at position {position}")]
    UnsortedDates {
        /// Table being validated
        table: String,
        /// Row index of the first offending date
        position: usize,
    },

    /// The same date appears twice.
    #[error("Duplicate date {date} in {table}")]
    DuplicateDate {
        /// Table being validated
        table: String,
        /// The repeated date
        date: String,
    },

    /// Requested columns are not present in a table.
    #[error("Missing columns in {table}: {columns:?}")]
    MissingColumns {
        /// Table that was queried
        table: String,
        /// Columns that could not be found
        columns: Vec<String>,
    },

    /// A modeling frame received a missing or non-finite value.
    #[error("Missing value in {table} column {column} on {date}")]
    MissingValue {
        /// Table being validated
        table: String,
        /// Column holding the value
        column: String,
        /// Date of the row
        date: String,
    },

    /// Column lengths disagree with the date index.
    #[error("Shape mismatch in {table}: expected {expected} rows, got {actual}")]
    ShapeMismatch {
        /// Table being validated
        table: String,
        /// Number of dates
        expected: usize,
        /// Number of values supplied
        actual: usize,
    },

    /// A modeling frame was built without regressors.
    #[error("Frame {0} has no regressor columns")]
    NoRegressors(String),

    /// Portfolio weights cannot be normalized.
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    /// An empty instrument list was supplied.
    #[error("Empty universe: {0}")]
    EmptyUniverse(String),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Unsupported file format
    #[error("Unsupported table format: {0}")]
    UnsupportedFormat(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Shorthand for a [`DataError::MissingColumns`] error.
    pub fn missing_columns(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self::MissingColumns {
            table: table.into(),
            columns,
        }
    }
}
