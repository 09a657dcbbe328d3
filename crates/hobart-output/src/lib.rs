#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod dataset;
pub mod export;
pub mod manifest;
pub mod report;
pub mod summary;
pub mod validate;

pub use dataset::{
    COUNT_FIELDS, Dataset, DatasetRow, RegimeRow, RegimesPayload, attribution_dataset,
    exposure_dataset,
};
pub use export::{BundleWriter, ExportError, ExportFormat, Exporter, regimes_to_dataframe};
pub use manifest::{Manifest, Meta, RegimeMetadata, git_commit};
pub use report::SleeveReport;
pub use summary::{Compounding, PortfolioSummary, SummaryError, periods_per_year, summarize_portfolio};
pub use validate::{
    Alignment, DatasetCounts, SleeveValidation, ValidationError, ValidationReport,
    align_by_intersection, validate_bundle,
};
