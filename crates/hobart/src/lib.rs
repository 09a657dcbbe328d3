#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod universe;

// Re-export main types from sub-crates
pub use hobart_data as data;
pub use hobart_exposure as exposure;
pub use hobart_output as output;
pub use hobart_regime as regime;

pub use config::{ConfigError, ModelConfig, PortfolioSettings, RollingSettings};
pub use error::{HobartError, Result};
pub use pipeline::{Inputs, Pipeline, PipelineOutput, SleeveOutput};
pub use universe::{DEFAULT_TICKERS, Regressors, SleeveConfig, Universe, UniverseConfig};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
