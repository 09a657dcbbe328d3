//! Exposure records and series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OLS estimates for the window ending at `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureRecord {
    /// Last date of the estimation window.
    pub date: NaiveDate,
    /// Intercept estimate.
    pub intercept: f64,
    /// Slope per regressor, in the order of the series' regressor names.
    pub coefficients: Vec<f64>,
    /// Intercept standard error.
    pub intercept_std_error: f64,
    /// Slope standard errors.
    pub std_errors: Vec<f64>,
    /// In-window R².
    pub r_squared: f64,
    /// Observations used in the fit.
    pub nobs: usize,
}

/// Time-ordered exposure records for one sleeve and window length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureSeries {
    sleeve: String,
    regressor_names: Vec<String>,
    window: usize,
    min_obs: usize,
    records: Vec<ExposureRecord>,
}

impl ExposureSeries {
    pub(crate) const fn new(
        sleeve: String,
        regressor_names: Vec<String>,
        window: usize,
        min_obs: usize,
        records: Vec<ExposureRecord>,
    ) -> Self {
        Self {
            sleeve,
            regressor_names,
            window,
            min_obs,
            records,
        }
    }

    /// Sleeve the exposures were fitted for.
    pub fn sleeve(&self) -> &str {
        &self.sleeve
    }

    /// Regressor names, matching the coefficient order of each record.
    pub fn regressor_names(&self) -> &[String] {
        &self.regressor_names
    }

    /// Rolling window length.
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Minimum observations required per window.
    pub const fn min_obs(&self) -> usize {
        self.min_obs
    }

    /// Records in date order.
    pub fn records(&self) -> &[ExposureRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no window produced a fit.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record for the window ending on `date`.
    pub fn get(&self, date: NaiveDate) -> Option<&ExposureRecord> {
        self.records
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.records[i])
    }

    /// Coefficient path of one regressor.
    pub fn coefficient(&self, name: &str) -> Option<Vec<(NaiveDate, f64)>> {
        let j = self.regressor_names.iter().position(|n| n == name)?;
        Some(
            self.records
                .iter()
                .map(|r| (r.date, r.coefficients[j]))
                .collect(),
        )
    }
}
