//! Rolling-window exposure estimation.
//!
//! A window of length `W` ends at every row `i >= W - 1` and covers rows
//! `i - W + 1 ..= i`. Rows with a non-finite value are excluded from the fit;
//! windows with fewer than `min_obs` remaining rows, and windows whose design
//! is rank deficient, are skipped without a record.

use crate::error::{ExposureError, Result};
use crate::exposure::{ExposureRecord, ExposureSeries};
use crate::ols::fit_ols;
use chrono::NaiveDate;
use hobart_data::ModelingFrame;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Rolling window configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingConfig {
    /// Window length in periods.
    pub window: usize,
    /// Minimum complete observations per window.
    pub min_obs: usize,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            window: 52,
            min_obs: 45,
        }
    }
}

impl RollingConfig {
    /// Create a validated configuration for `n_regressors` regressors.
    pub fn new(window: usize, min_obs: usize, n_regressors: usize) -> Result<Self> {
        let config = Self { window, min_obs };
        config.validate(n_regressors)?;
        Ok(config)
    }

    /// Check the window can identify an intercept plus `n_regressors` slopes.
    pub fn validate(&self, n_regressors: usize) -> Result<()> {
        if self.window < n_regressors + 1 {
            return Err(ExposureError::InvalidConfig(format!(
                "window {} is shorter than the {} estimated parameters",
                self.window,
                n_regressors + 1
            )));
        }
        if self.min_obs == 0 || self.min_obs > self.window {
            return Err(ExposureError::InvalidConfig(format!(
                "min_obs {} must be between 1 and the window length {}",
                self.min_obs, self.window
            )));
        }
        Ok(())
    }
}

/// Rolling OLS estimator.
#[derive(Debug, Clone, Copy)]
pub struct RollingRegression {
    config: RollingConfig,
}

impl RollingRegression {
    /// Create an estimator with `config`.
    pub const fn new(config: RollingConfig) -> Self {
        Self { config }
    }

    /// The estimator configuration.
    pub const fn config(&self) -> &RollingConfig {
        &self.config
    }

    /// Fit exposures over every full window of `frame`.
    pub fn fit(&self, frame: &ModelingFrame) -> Result<ExposureSeries> {
        self.fit_arrays(
            frame.name(),
            frame.dates(),
            frame.target().view(),
            frame.regressors().view(),
            frame.regressor_names(),
        )
    }

    /// Fit exposures from raw arrays, tolerating missing values.
    ///
    /// `x` is `dates x regressors`. A window is fitted on its rows where the
    /// target and every regressor are finite.
    pub fn fit_arrays(
        &self,
        sleeve: &str,
        dates: &[NaiveDate],
        y: ArrayView1<'_, f64>,
        x: ArrayView2<'_, f64>,
        regressor_names: &[String],
    ) -> Result<ExposureSeries> {
        let n = dates.len();
        let k = regressor_names.len();
        if y.len() != n || x.nrows() != n {
            return Err(ExposureError::DimensionMismatch {
                context: "rolling rows",
                expected: n,
                actual: if y.len() == n { x.nrows() } else { y.len() },
            });
        }
        if x.ncols() != k {
            return Err(ExposureError::DimensionMismatch {
                context: "rolling regressors",
                expected: k,
                actual: x.ncols(),
            });
        }
        self.config.validate(k)?;

        let window = self.config.window;
        let complete: Vec<bool> = (0..n)
            .map(|i| y[i].is_finite() && x.row(i).iter().all(|v| v.is_finite()))
            .collect();

        let mut records = Vec::with_capacity(n.saturating_sub(window - 1));
        let mut skipped = 0usize;
        for end in window.saturating_sub(1)..n {
            let start = end + 1 - window;
            let rows: Vec<usize> = (start..=end).filter(|&i| complete[i]).collect();
            if rows.len() < self.config.min_obs {
                skipped += 1;
                tracing::debug!(
                    sleeve,
                    date = %dates[end],
                    nobs = rows.len(),
                    min_obs = self.config.min_obs,
                    "skipping window with too few observations"
                );
                continue;
            }

            let wy: Array1<f64> = rows.iter().map(|&i| y[i]).collect();
            let mut wx = Array2::<f64>::zeros((rows.len(), k));
            for (r, &i) in rows.iter().enumerate() {
                wx.row_mut(r).assign(&x.row(i));
            }

            match fit_ols(wx.view(), wy.view()) {
                Ok(fit) => records.push(ExposureRecord {
                    date: dates[end],
                    intercept: fit.intercept,
                    coefficients: fit.coefficients.to_vec(),
                    intercept_std_error: fit.intercept_std_error,
                    std_errors: fit.std_errors.to_vec(),
                    r_squared: fit.r_squared,
                    nobs: fit.nobs,
                }),
                Err(e) if e.is_recoverable() => {
                    skipped += 1;
                    tracing::debug!(sleeve, date = %dates[end], error = %e, "skipping window");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            sleeve,
            window,
            records = records.len(),
            skipped,
            "fitted rolling exposures"
        );
        Ok(ExposureSeries::new(
            sleeve.to_string(),
            regressor_names.to_vec(),
            window,
            self.config.min_obs,
            records,
        ))
    }
}

/// Fit one exposure series per window length, sharing `min_obs`.
///
/// `min_obs` is capped at each window length.
pub fn fit_windows(
    frame: &ModelingFrame,
    windows: &[usize],
    min_obs: usize,
) -> Result<Vec<ExposureSeries>> {
    windows
        .iter()
        .map(|&window| {
            let config = RollingConfig::new(window, min_obs.min(window), frame.n_regressors())?;
            RollingRegression::new(config).fit(frame)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(RollingConfig::new(52, 45, 3).is_ok());
        assert!(RollingConfig::new(3, 3, 3).is_err());
        assert!(RollingConfig::new(52, 0, 3).is_err());
        assert!(RollingConfig::new(52, 53, 3).is_err());
        assert!(RollingConfig::default().validate(5).is_ok());
    }
}
