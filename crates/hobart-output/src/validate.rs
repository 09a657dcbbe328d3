//! Validation of an exported JSON bundle.
//!
//! Every dataset must have sorted, unique dates and a consistent key set.
//! Attribution rows must carry contributions. Per sleeve, exposures,
//! attribution and regimes are aligned on the intersection of their dates and
//! the aligned lengths must agree.

use crate::dataset::{Dataset, DatasetRow, RegimesPayload};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File written by [`validate_bundle`].
pub const VALIDATION_FILE: &str = "validation.json";

/// Errors found while validating a bundle.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Dates are out of order.
    #[error("{dataset}: dates are not sorted ascending at row {row}")]
    UnsortedDates {
        /// Dataset name
        dataset: String,
        /// First out-of-order row
        row: usize,
    },

    /// A date repeats.
    #[error("{dataset}: duplicate date {date}")]
    DuplicateDate {
        /// Dataset name
        dataset: String,
        /// Repeated date
        date: NaiveDate,
    },

    /// A row's key set differs from the first row's.
    #[error("{dataset}: key mismatch at row {row} date={date}, missing={missing:?} extra={extra:?}")]
    KeyMismatch {
        /// Dataset name
        dataset: String,
        /// Offending row
        row: usize,
        /// Date of the offending row
        date: NaiveDate,
        /// Keys present on the first row only
        missing: Vec<String>,
        /// Keys present on the offending row only
        extra: Vec<String>,
    },

    /// An attribution row has no `contrib_` field.
    #[error("{dataset}: attribution row {date} has no factor contributions")]
    MissingContributions {
        /// Dataset name
        dataset: String,
        /// Row date
        date: NaiveDate,
    },

    /// Aligned datasets disagree in length.
    #[error(
        "{sleeve}: aligned lengths mismatch (exposures {exposures}, attribution {attribution}, regimes {regimes})"
    )]
    AlignedLengthMismatch {
        /// Sleeve name
        sleeve: String,
        /// Aligned exposure rows
        exposures: usize,
        /// Aligned attribution rows
        attribution: usize,
        /// Aligned regime rows
        regimes: usize,
    },

    /// A required file is absent.
    #[error("Missing dataset file: {0}")]
    MissingFile(PathBuf),

    /// The bundle has no exposure datasets.
    #[error("No exposures_<sleeve>.json files in {0}")]
    EmptyBundle(PathBuf),

    /// JSON error
    #[error("JSON error in {path}: {source}")]
    Json {
        /// File being parsed
        path: PathBuf,
        /// Parser error
        source: serde_json::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Row count and date range of one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetCounts {
    /// Exposure rows
    pub exposures: usize,
    /// Attribution rows
    pub attribution: usize,
    /// Regime rows
    pub regimes: usize,
    /// First date
    pub start: Option<NaiveDate>,
    /// Last date
    pub end: Option<NaiveDate>,
}

/// Raw and aligned counts for one sleeve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleeveValidation {
    /// Counts as exported
    pub raw: DatasetCounts,
    /// Counts after intersecting dates
    pub aligned: DatasetCounts,
}

/// Contents of `validation.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Per-sleeve results
    pub sleeves: BTreeMap<String, SleeveValidation>,
    /// How datasets were aligned
    pub alignment_rule: String,
    /// Validated directory
    pub data_dir: String,
}

/// Dates common to exposures, attribution and regimes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    /// Common dates, ascending
    pub dates: Vec<NaiveDate>,
    /// Exposure rows kept
    pub exposures: usize,
    /// Attribution rows kept
    pub attribution: usize,
    /// Regime rows kept
    pub regimes: usize,
}

impl Alignment {
    fn counts(&self) -> DatasetCounts {
        DatasetCounts {
            exposures: self.exposures,
            attribution: self.attribution,
            regimes: self.regimes,
            start: self.dates.first().copied(),
            end: self.dates.last().copied(),
        }
    }
}

/// Intersect the three date sets and count the rows each dataset keeps.
pub fn align_by_intersection(
    exposures: &[NaiveDate],
    attribution: &[NaiveDate],
    regimes: &[NaiveDate],
) -> Alignment {
    let e: BTreeSet<NaiveDate> = exposures.iter().copied().collect();
    let a: BTreeSet<NaiveDate> = attribution.iter().copied().collect();
    let r: BTreeSet<NaiveDate> = regimes.iter().copied().collect();
    let common: BTreeSet<NaiveDate> = e
        .iter()
        .filter(|d| a.contains(d) && r.contains(d))
        .copied()
        .collect();
    let kept = |dates: &[NaiveDate]| dates.iter().filter(|d| common.contains(d)).count();
    Alignment {
        exposures: kept(exposures),
        attribution: kept(attribution),
        regimes: kept(regimes),
        dates: common.into_iter().collect(),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ValidationError> {
    if !path.exists() {
        return Err(ValidationError::MissingFile(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| ValidationError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn read_dataset(dir: &Path, name: &str) -> Result<Dataset, ValidationError> {
    let rows: Vec<DatasetRow> = read_json(&dir.join(format!("{name}.json")))?;
    let dataset = Dataset::new(name, rows);
    dataset.validate()?;
    Ok(dataset)
}

/// Sleeves with an `exposures_<sleeve>.json` file in `dir`, sorted by name.
fn discover_sleeves(dir: &Path) -> Result<Vec<String>, ValidationError> {
    let mut sleeves = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if let Some(sleeve) = name
            .strip_prefix("exposures_")
            .and_then(|rest| rest.strip_suffix(".json"))
        {
            sleeves.push(sleeve.to_string());
        }
    }
    sleeves.sort();
    Ok(sleeves)
}

/// Validate the bundle in `dir` and write `validation.json` next to it.
pub fn validate_bundle(dir: &Path) -> Result<ValidationReport, ValidationError> {
    let sleeves = discover_sleeves(dir)?;
    if sleeves.is_empty() {
        return Err(ValidationError::EmptyBundle(dir.to_path_buf()));
    }

    let regimes: RegimesPayload = read_json(&dir.join("regimes.json"))?;
    let regime_rows: Vec<DatasetRow> = regimes
        .data
        .iter()
        .map(|r| {
            let mut row = DatasetRow::new(r.date);
            row.insert("vol", r.vol);
            row.insert("vol_thresh", r.vol_thresh);
            row
        })
        .collect();
    Dataset::new("regimes", regime_rows).validate()?;
    let regime_dates = regimes.dates();

    let mut report = BTreeMap::new();
    for sleeve in sleeves {
        let exposures = read_dataset(dir, &format!("exposures_{sleeve}"))?;
        let attribution = read_dataset(dir, &format!("attribution_{sleeve}"))?;
        attribution.require_contributions()?;

        let exposure_dates = exposures.dates();
        let attribution_dates = attribution.dates();
        let aligned = align_by_intersection(&exposure_dates, &attribution_dates, &regime_dates);
        if !(aligned.exposures == aligned.attribution && aligned.attribution == aligned.regimes) {
            return Err(ValidationError::AlignedLengthMismatch {
                sleeve,
                exposures: aligned.exposures,
                attribution: aligned.attribution,
                regimes: aligned.regimes,
            });
        }

        let raw = DatasetCounts {
            exposures: exposures.len(),
            attribution: attribution.len(),
            regimes: regimes.data.len(),
            start: exposure_dates.first().copied(),
            end: exposure_dates.last().copied(),
        };
        tracing::info!(
            sleeve = %sleeve,
            raw_exposures = raw.exposures,
            raw_attribution = raw.attribution,
            aligned = aligned.dates.len(),
            "validated sleeve"
        );
        report.insert(
            sleeve,
            SleeveValidation {
                raw,
                aligned: aligned.counts(),
            },
        );
    }

    let report = ValidationReport {
        sleeves: report,
        alignment_rule: "intersection of dates across exposures, attribution, regimes".to_string(),
        data_dir: dir.display().to_string(),
    };
    let json = serde_json::to_string_pretty(&report).map_err(|source| ValidationError::Json {
        path: dir.join(VALIDATION_FILE),
        source,
    })?;
    std::fs::write(dir.join(VALIDATION_FILE), json)?;
    Ok(report)
}
