#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod classifier;
pub mod error;
pub mod summary;

pub use classifier::{REGIME_RULE, Regime, RegimeClassifier, RegimeConfig, RegimeRecord, RegimeSeries};
pub use error::{RegimeError, Result};
pub use summary::{RegimeStats, RegimeSummary, summarize};
