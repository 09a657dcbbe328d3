//! Volatility regime classification without look-ahead.
//!
//! Each date gets a rolling volatility over the last `vol_window` returns and
//! a threshold taken as the `percentile` quantile of the `lookback` volatility
//! values strictly before it. Dates lacking either are not classified.

use crate::error::{RegimeError, Result};
use chrono::NaiveDate;
use derive_more::Display;
use hobart_data::TimeSeries;
use hobart_data::stats::{quantile, sample_std};
use serde::{Deserialize, Serialize};

/// Human-readable statement of the labeling rule, exported with the regimes.
pub const REGIME_RULE: &str =
    "stress if rolling vol_t >= trailing quantile(vol, percentile) using lookback ending at t-1";

/// Configuration for regime classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    /// Periods in each rolling volatility (default: 8 weeks)
    pub vol_window: usize,
    /// Prior volatility values forming the threshold distribution (default: 104 weeks)
    pub lookback: usize,
    /// Quantile of the trailing distribution, strictly between 0 and 1 (default: 0.75)
    pub percentile: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            vol_window: 8,
            lookback: 104,
            percentile: 0.75,
        }
    }
}

impl RegimeConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.vol_window < 2 {
            return Err(RegimeError::InvalidParameter(format!(
                "vol_window must be at least 2, got {}",
                self.vol_window
            )));
        }
        if self.lookback == 0 {
            return Err(RegimeError::InvalidParameter(
                "lookback must be positive".to_string(),
            ));
        }
        if !(self.percentile > 0.0 && self.percentile < 1.0) {
            return Err(RegimeError::InvalidParameter(format!(
                "percentile must lie strictly between 0 and 1, got {}",
                self.percentile
            )));
        }
        Ok(())
    }

    /// Index of the first classifiable observation.
    pub const fn warmup(&self) -> usize {
        self.vol_window - 1 + self.lookback
    }
}

/// Market regime label
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    /// Volatility below the trailing threshold
    #[display("calm")]
    Calm,
    /// Volatility at or above the trailing threshold
    #[display("stress")]
    Stress,
}

impl Regime {
    /// Label for a volatility and its threshold. Ties are stress.
    pub fn from_volatility(volatility: f64, threshold: f64) -> Self {
        if volatility >= threshold {
            Self::Stress
        } else {
            Self::Calm
        }
    }

    /// Whether this is the stress label.
    pub const fn is_stress(&self) -> bool {
        matches!(self, Self::Stress)
    }
}

/// Classification of one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeRecord {
    /// Classified date
    pub date: NaiveDate,
    /// Realized portfolio return on `date`
    pub portfolio_return: f64,
    /// Rolling volatility ending on `date`
    pub volatility: f64,
    /// Trailing quantile from earlier volatilities
    pub threshold: f64,
    /// Resulting label
    pub regime: Regime,
}

/// Classified dates with the configuration that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSeries {
    config: RegimeConfig,
    records: Vec<RegimeRecord>,
}

impl RegimeSeries {
    /// Configuration used for classification.
    pub const fn config(&self) -> &RegimeConfig {
        &self.config
    }

    /// Records in date order.
    pub fn records(&self) -> &[RegimeRecord] {
        &self.records
    }

    /// Number of classified dates.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing could be classified.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record for `date`.
    pub fn get(&self, date: NaiveDate) -> Option<&RegimeRecord> {
        self.records
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.records[i])
    }

    /// Fraction of classified dates labeled stress, `None` when empty.
    pub fn stress_fraction(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        let stress = self.records.iter().filter(|r| r.regime.is_stress()).count();
        Some(stress as f64 / self.records.len() as f64)
    }

    /// Records carrying `regime`.
    pub fn with_regime(&self, regime: Regime) -> impl Iterator<Item = &RegimeRecord> + '_ {
        self.records.iter().filter(move |r| r.regime == regime)
    }
}

/// Volatility regime classifier
#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    config: RegimeConfig,
}

impl RegimeClassifier {
    /// Create a classifier, validating `config`.
    pub fn new(config: RegimeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create a classifier with the default configuration.
    ///
    /// # Errors
    /// Returns an error if the default configuration is invalid (should not happen).
    pub fn try_default() -> Result<Self> {
        Self::new(RegimeConfig::default())
    }

    /// The classifier configuration.
    pub const fn config(&self) -> &RegimeConfig {
        &self.config
    }

    /// Classify a return series. Non-finite returns are dropped first.
    pub fn classify(&self, returns: &TimeSeries) -> Result<RegimeSeries> {
        let clean = returns.dropna();
        self.classify_values(clean.dates(), clean.values())
    }

    /// Classify aligned `dates` and `returns`.
    ///
    /// A volatility window holding a non-finite return has no volatility, so
    /// its date and the `lookback` dates that follow it are not classified.
    pub fn classify_values(&self, dates: &[NaiveDate], returns: &[f64]) -> Result<RegimeSeries> {
        if dates.len() != returns.len() {
            return Err(RegimeError::LengthMismatch {
                dates: dates.len(),
                returns: returns.len(),
            });
        }
        let RegimeConfig {
            vol_window,
            lookback,
            percentile,
        } = self.config;
        let n = returns.len();

        let volatility: Vec<Option<f64>> = (0..n)
            .map(|t| {
                (t + 1 >= vol_window)
                    .then(|| sample_std(&returns[t + 1 - vol_window..=t]))
                    .flatten()
                    .filter(|v| v.is_finite())
            })
            .collect();

        let mut records = Vec::with_capacity(n.saturating_sub(self.config.warmup()));
        for t in self.config.warmup()..n {
            let Some(vol) = volatility[t] else { continue };
            let trailing: Option<Vec<f64>> = volatility[t - lookback..t].iter().copied().collect();
            let Some(threshold) = trailing.and_then(|v| quantile(&v, percentile)) else {
                continue;
            };
            records.push(RegimeRecord {
                date: dates[t],
                portfolio_return: returns[t],
                volatility: vol,
                threshold,
                regime: Regime::from_volatility(vol, threshold),
            });
        }

        if records.is_empty() {
            tracing::warn!(
                observations = n,
                required = self.config.warmup() + 1,
                "not enough history to classify any regime"
            );
        } else {
            tracing::info!(
                classified = records.len(),
                stress = records.iter().filter(|r| r.regime.is_stress()).count(),
                "classified regimes"
            );
        }
        Ok(RegimeSeries {
            config: self.config,
            records,
        })
    }
}
