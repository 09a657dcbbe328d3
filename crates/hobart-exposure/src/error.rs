//! Error types for exposure estimation and attribution.

use hobart_data::DataError;
use thiserror::Error;

/// Result type for exposure operations.
pub type Result<T> = std::result::Result<T, ExposureError>;

/// Errors raised while fitting exposures or attributing returns.
#[derive(Debug, Error)]
pub enum ExposureError {
    /// The design matrix does not have full column rank.
    #[error("Rank-deficient design: rank {rank} of {columns} columns")]
    RankDeficient {
        /// Numerical rank of the design
        rank: usize,
        /// Number of design columns, intercept included
        columns: usize,
    },

    /// Fewer complete observations than required.
    #[error("Insufficient data: need {required} observations, got {actual}")]
    InsufficientData {
        /// Minimum number of observations
        required: usize,
        /// Observations available
        actual: usize,
    },

    /// Input arrays disagree in length.
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being checked
        context: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Rolling configuration is not usable.
    #[error("Invalid rolling configuration: {0}")]
    InvalidConfig(String),

    /// Exposures and frame disagree on regressor names.
    #[error("Regressor mismatch: exposures have {expected:?}, frame has {actual:?}")]
    RegressorMismatch {
        /// Regressors on the exposure series
        expected: Vec<String>,
        /// Regressors on the modeling frame
        actual: Vec<String>,
    },

    /// Underlying data error
    #[error(transparent)]
    Data(#[from] DataError),
}

impl ExposureError {
    /// Whether a rolling fit may skip the affected window and continue.
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RankDeficient { .. } | Self::InsufficientData { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(
            ExposureError::RankDeficient {
                rank: 2,
                columns: 3
            }
            .is_recoverable()
        );
        assert!(
            ExposureError::InsufficientData {
                required: 10,
                actual: 4
            }
            .is_recoverable()
        );
        assert!(!ExposureError::InvalidConfig("window".into()).is_recoverable());
    }
}
