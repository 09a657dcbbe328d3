//! Lagged return attribution.
//!
//! The return at frame date `t` is explained by the exposures fitted on the
//! window ending at the previous frame date. Exposures estimated with data up
//! to `t` never explain `t` itself, so the series starts strictly after the
//! first exposure date.

use crate::error::{ExposureError, Result};
use crate::exposure::ExposureSeries;
use chrono::NaiveDate;
use hobart_data::ModelingFrame;
use serde::{Deserialize, Serialize};

/// `explained_share` is absent when the realized return is smaller than this.
pub const SHARE_EPSILON: f64 = 1e-12;

/// Decomposition of one realized return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionRecord {
    /// Date of the realized return.
    pub date: NaiveDate,
    /// Date of the exposures applied.
    pub exposure_date: NaiveDate,
    /// Realized target value.
    pub realized: f64,
    /// Lagged intercept.
    pub intercept_contribution: f64,
    /// Lagged coefficient times current regressor value, per regressor.
    pub contributions: Vec<f64>,
    /// Intercept plus all contributions.
    pub explained: f64,
    /// Realized minus explained.
    pub residual: f64,
    /// Explained divided by realized.
    pub explained_share: Option<f64>,
    /// Running sum of `realized`.
    pub cum_realized: f64,
    /// Running sum of `explained`.
    pub cum_explained: f64,
    /// Running sum of `residual`.
    pub cum_residual: f64,
    /// Running sum of each contribution.
    pub cum_contributions: Vec<f64>,
}

/// Attribution records for one sleeve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionSeries {
    sleeve: String,
    regressor_names: Vec<String>,
    records: Vec<AttributionRecord>,
}

impl AttributionSeries {
    /// Sleeve name.
    pub fn sleeve(&self) -> &str {
        &self.sleeve
    }

    /// Regressor names, matching the contribution order.
    pub fn regressor_names(&self) -> &[String] {
        &self.regressor_names
    }

    /// Records in date order.
    pub fn records(&self) -> &[AttributionRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no date could be attributed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record for `date`.
    pub fn get(&self, date: NaiveDate) -> Option<&AttributionRecord> {
        self.records
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.records[i])
    }

    /// The last record, holding the cumulative totals.
    pub fn last(&self) -> Option<&AttributionRecord> {
        self.records.last()
    }
}

/// Attribute every frame date whose previous frame date has exposures.
pub fn attribute(frame: &ModelingFrame, exposures: &ExposureSeries) -> Result<AttributionSeries> {
    if frame.regressor_names() != exposures.regressor_names() {
        return Err(ExposureError::RegressorMismatch {
            expected: exposures.regressor_names().to_vec(),
            actual: frame.regressor_names().to_vec(),
        });
    }

    let k = frame.n_regressors();
    let mut records = Vec::with_capacity(exposures.len());
    let mut cum_realized = 0.0;
    let mut cum_explained = 0.0;
    let mut cum_residual = 0.0;
    let mut cum_contributions = vec![0.0; k];

    for t in 1..frame.len() {
        let prev = frame.dates()[t - 1];
        let Some(exposure) = exposures.get(prev) else {
            continue;
        };
        let x = frame.regressor_row(t);
        let contributions: Vec<f64> = exposure
            .coefficients
            .iter()
            .zip(x.iter())
            .map(|(b, v)| b * v)
            .collect();
        let explained = exposure.intercept + contributions.iter().sum::<f64>();
        let realized = frame.target()[t];
        let residual = realized - explained;
        let explained_share = (realized.abs() >= SHARE_EPSILON).then(|| explained / realized);

        cum_realized += realized;
        cum_explained += explained;
        cum_residual += residual;
        for (acc, c) in cum_contributions.iter_mut().zip(&contributions) {
            *acc += c;
        }

        records.push(AttributionRecord {
            date: frame.dates()[t],
            exposure_date: prev,
            realized,
            intercept_contribution: exposure.intercept,
            contributions,
            explained,
            residual,
            explained_share,
            cum_realized,
            cum_explained,
            cum_residual,
            cum_contributions: cum_contributions.clone(),
        });
    }

    tracing::info!(
        sleeve = frame.name(),
        records = records.len(),
        "attributed returns"
    );
    Ok(AttributionSeries {
        sleeve: frame.name().to_string(),
        regressor_names: frame.regressor_names().to_vec(),
        records,
    })
}
