#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod attribution;
pub mod error;
pub mod exposure;
pub mod ols;
pub mod rolling;

pub use attribution::{AttributionRecord, AttributionSeries, SHARE_EPSILON, attribute};
pub use error::{ExposureError, Result};
pub use exposure::{ExposureRecord, ExposureSeries};
pub use ols::{OlsFit, fit_ols};
pub use rolling::{RollingConfig, RollingRegression, fit_windows};
