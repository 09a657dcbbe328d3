//! Export rows.
//!
//! Exposure and attribution rows are tagged records: a required `date` and an
//! open map of numeric fields whose keys depend on the sleeve's regressors.
//! A [`Dataset`] is well formed when its dates are sorted and unique and every
//! row carries the same key set. Regime rows have a fixed shape.

use crate::manifest::RegimeMetadata;
use crate::validate::ValidationError;
use chrono::NaiveDate;
use hobart_exposure::{AttributionSeries, ExposureSeries};
use hobart_regime::{Regime, RegimeRecord, RegimeSeries, RegimeSummary};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Prefix of per-regressor attribution fields.
pub const CONTRIB_PREFIX: &str = "contrib_";

/// Fields holding counts; serialized as integers.
pub const COUNT_FIELDS: [&str; 3] = ["nobs", "rolling_window", "min_obs"];

/// One tagged row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetRow {
    /// Row date
    pub date: NaiveDate,
    /// Numeric fields; `None` marks an undefined value
    #[serde(flatten)]
    pub fields: BTreeMap<String, Option<f64>>,
}

impl DatasetRow {
    /// Empty row for `date`.
    pub const fn new(date: NaiveDate) -> Self {
        Self {
            date,
            fields: BTreeMap::new(),
        }
    }

    /// Set a field; non-finite values are stored as `None`.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.fields
            .insert(key.into(), value.is_finite().then_some(value));
    }

    /// Set an optional field.
    pub fn insert_opt(&mut self, key: impl Into<String>, value: Option<f64>) {
        self.fields
            .insert(key.into(), value.filter(|v| v.is_finite()));
    }

    /// Field value, `None` when absent or undefined.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.fields.get(key).copied().flatten()
    }

    /// Field names.
    pub fn keys(&self) -> BTreeSet<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}

impl Serialize for DatasetRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("date", &self.date)?;
        for (key, value) in &self.fields {
            match value {
                Some(v) if is_count(key, *v) => map.serialize_entry(key, &(*v as u64))?,
                _ => map.serialize_entry(key, value)?,
            }
        }
        map.end()
    }
}

fn is_count(key: &str, value: f64) -> bool {
    COUNT_FIELDS.contains(&key) && value >= 0.0 && value.fract() == 0.0
}

/// Named sequence of tagged rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    name: String,
    rows: Vec<DatasetRow>,
}

impl Dataset {
    /// Wrap `rows` without validation.
    pub fn new(name: impl Into<String>, rows: Vec<DatasetRow>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Dataset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rows in stored order.
    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row dates.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    /// Field names of the first row.
    pub fn columns(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|r| r.fields.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Check date order, date uniqueness and key-set consistency.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (i, pair) in self.rows.windows(2).enumerate() {
            if pair[1].date == pair[0].date {
                return Err(ValidationError::DuplicateDate {
                    dataset: self.name.clone(),
                    date: pair[1].date,
                });
            }
            if pair[1].date < pair[0].date {
                return Err(ValidationError::UnsortedDates {
                    dataset: self.name.clone(),
                    row: i + 1,
                });
            }
        }

        let Some(first) = self.rows.first() else {
            return Ok(());
        };
        let base = first.keys();
        for (i, row) in self.rows.iter().enumerate().skip(1) {
            let keys = row.keys();
            if keys != base {
                return Err(ValidationError::KeyMismatch {
                    dataset: self.name.clone(),
                    row: i,
                    date: row.date,
                    missing: base.difference(&keys).map(|k| k.to_string()).collect(),
                    extra: keys.difference(&base).map(|k| k.to_string()).collect(),
                });
            }
        }
        Ok(())
    }

    /// Require at least one `contrib_` field on every row.
    pub fn require_contributions(&self) -> Result<(), ValidationError> {
        match self
            .rows
            .iter()
            .find(|r| !r.fields.keys().any(|k| k.starts_with(CONTRIB_PREFIX)))
        {
            Some(row) => Err(ValidationError::MissingContributions {
                dataset: self.name.clone(),
                date: row.date,
            }),
            None => Ok(()),
        }
    }
}

/// Rows of an exposure series.
///
/// Fields: `alpha`, `alpha_se`, `beta_<name>`, `se_<name>`, `r2`, `nobs`,
/// `rolling_window` and `min_obs`.
pub fn exposure_dataset(series: &ExposureSeries) -> Dataset {
    let names = series.regressor_names();
    let rows = series
        .records()
        .iter()
        .map(|r| {
            let mut row = DatasetRow::new(r.date);
            row.insert("alpha", r.intercept);
            row.insert("alpha_se", r.intercept_std_error);
            for (j, name) in names.iter().enumerate() {
                row.insert(format!("beta_{name}"), r.coefficients[j]);
                row.insert(format!("se_{name}"), r.std_errors[j]);
            }
            row.insert("r2", r.r_squared);
            row.insert("nobs", r.nobs as f64);
            row.insert("rolling_window", series.window() as f64);
            row.insert("min_obs", series.min_obs() as f64);
            row
        })
        .collect();
    Dataset::new(format!("exposures_{}", series.sleeve()), rows)
}

/// Rows of an attribution series.
///
/// Fields: `y`, `alpha_contrib`, `contrib_<name>`, `explained_return`,
/// `residual_return`, `explained_share` and the `cum_` running sums.
pub fn attribution_dataset(series: &AttributionSeries) -> Dataset {
    let names = series.regressor_names();
    let rows = series
        .records()
        .iter()
        .map(|r| {
            let mut row = DatasetRow::new(r.date);
            row.insert("y", r.realized);
            row.insert("alpha_contrib", r.intercept_contribution);
            for (j, name) in names.iter().enumerate() {
                row.insert(format!("{CONTRIB_PREFIX}{name}"), r.contributions[j]);
                row.insert(format!("cum_{CONTRIB_PREFIX}{name}"), r.cum_contributions[j]);
            }
            row.insert("explained_return", r.explained);
            row.insert("residual_return", r.residual);
            row.insert_opt("explained_share", r.explained_share);
            row.insert("cum_y", r.cum_realized);
            row.insert("cum_explained_return", r.cum_explained);
            row.insert("cum_residual_return", r.cum_residual);
            row
        })
        .collect();
    Dataset::new(format!("attribution_{}", series.sleeve()), rows)
}

/// One classified date as exported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeRow {
    /// Classified date
    pub date: NaiveDate,
    /// Label
    pub regime: Regime,
    /// Portfolio return
    pub ret: f64,
    /// Rolling volatility
    pub vol: f64,
    /// Trailing threshold
    pub vol_thresh: f64,
}

impl From<&RegimeRecord> for RegimeRow {
    fn from(record: &RegimeRecord) -> Self {
        Self {
            date: record.date,
            regime: record.regime,
            ret: record.portfolio_return,
            vol: record.volatility,
            vol_thresh: record.threshold,
        }
    }
}

/// Contents of `regimes.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimesPayload {
    /// Rule and parameters
    pub metadata: RegimeMetadata,
    /// Fraction of classified dates labeled stress
    pub stress_fraction: Option<f64>,
    /// Per-sleeve regime summaries
    pub summary: BTreeMap<String, RegimeSummary>,
    /// Classified dates
    pub data: Vec<RegimeRow>,
}

impl RegimesPayload {
    /// Assemble the payload from a classification and sleeve summaries.
    pub fn new(regimes: &RegimeSeries, summary: BTreeMap<String, RegimeSummary>) -> Self {
        Self {
            metadata: RegimeMetadata::from(regimes.config()),
            stress_fraction: regimes.stress_fraction(),
            summary,
            data: regimes.records().iter().map(RegimeRow::from).collect(),
        }
    }

    /// Dates of the regime rows.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.data.iter().map(|r| r.date).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn row(day: u32, keys: &[&str]) -> DatasetRow {
        let mut row = DatasetRow::new(d(day));
        for key in keys {
            row.insert(*key, 1.0);
        }
        row
    }

    #[test]
    fn test_non_finite_values_become_none() {
        let mut r = DatasetRow::new(d(1));
        r.insert("se_SPY", f64::NAN);
        r.insert_opt("explained_share", Some(f64::INFINITY));
        assert_eq!(r.fields["se_SPY"], None);
        assert_eq!(r.fields["explained_share"], None);
        assert!(r.get("se_SPY").is_none());
    }

    #[test]
    fn test_row_json_shape() {
        let mut r = DatasetRow::new(d(8));
        r.insert("y", 0.5);
        r.insert_opt("explained_share", None);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"date":"2024-03-08","explained_share":null,"y":0.5}"#);
        let back: DatasetRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_count_fields_serialize_as_integers() {
        let mut r = DatasetRow::new(d(8));
        r.insert("alpha", 1.0);
        r.insert("min_obs", 45.0);
        r.insert("nobs", 52.0);
        r.insert("rolling_window", 52.0);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(
            json,
            r#"{"date":"2024-03-08","alpha":1.0,"min_obs":45,"nobs":52,"rolling_window":52}"#
        );
        let back: DatasetRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_validate_key_mismatch() {
        let ds = Dataset::new(
            "attribution_us",
            vec![row(1, &["y", "contrib_A"]), row(8, &["y", "contrib_B"])],
        );
        match ds.validate() {
            Err(ValidationError::KeyMismatch {
                row, missing, extra, ..
            }) => {
                assert_eq!(row, 1);
                assert_eq!(missing, vec!["contrib_A"]);
                assert_eq!(extra, vec!["contrib_B"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_validate_dates() {
        let dup = Dataset::new("x", vec![row(1, &["y"]), row(1, &["y"])]);
        assert!(matches!(
            dup.validate(),
            Err(ValidationError::DuplicateDate { .. })
        ));
        let unsorted = Dataset::new("x", vec![row(8, &["y"]), row(1, &["y"])]);
        assert!(matches!(
            unsorted.validate(),
            Err(ValidationError::UnsortedDates { row: 1, .. })
        ));
        assert!(Dataset::new("x", vec![]).validate().is_ok());
    }

    #[test]
    fn test_require_contributions() {
        let ok = Dataset::new("a", vec![row(1, &["y", "contrib_MKT_RF"])]);
        assert!(ok.require_contributions().is_ok());
        let bad = Dataset::new("a", vec![row(1, &["y", "cum_y"])]);
        assert!(bad.require_contributions().is_err());
    }
}
