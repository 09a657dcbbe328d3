#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod frame;
pub mod io;
pub mod portfolio;
pub mod stats;
pub mod table;

pub use error::{DataError, Result};
pub use frame::{FrameBuilder, ModelingFrame, TARGET_COLUMN};
pub use io::{TableFormat, read_table, write_table};
pub use portfolio::{MissingPolicy, normalize_weights, portfolio_returns};
pub use table::{ReturnTable, TimeSeries, intersect_dates};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
