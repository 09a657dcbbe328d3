//! Portfolio summary statistics.
//!
//! Annualizes the weighted portfolio return series of the full universe.
//! Periods per year follow the frequency label: weekly 52, daily 252,
//! monthly 12.

use chrono::NaiveDate;
use hobart_data::stats::{max_drawdown, mean, sample_std};
use hobart_data::{DataError, MissingPolicy, ReturnTable, normalize_weights, portfolio_returns};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors raised while summarizing a portfolio.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Frequency label cannot be annualized.
    #[error("Unsupported frequency for annualization: {0}")]
    UnsupportedFrequency(String),

    /// No portfolio returns remain after the missing-value policy.
    #[error("Portfolio returns are empty after applying policy {0}")]
    EmptySeries(String),

    /// Underlying data error
    #[error(transparent)]
    Data(#[from] DataError),
}

/// How periodic returns are annualized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compounding {
    /// `prod(1 + r)^(periods / n) - 1`
    #[default]
    Geometric,
    /// `mean(r) * periods`
    Simple,
}

impl Compounding {
    /// Stable identifier used in reports.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Geometric => "geometric",
            Self::Simple => "simple",
        }
    }
}

/// Periods per year for a pandas-style frequency label (`W-FRI`, `D`, `M`, ...).
pub fn periods_per_year(frequency: &str) -> Option<u32> {
    match frequency.chars().next()?.to_ascii_uppercase() {
        'W' => Some(52),
        'D' => Some(252),
        'M' => Some(12),
        _ => None,
    }
}

/// Annualized statistics of the universe portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Universe tickers
    pub tickers: Vec<String>,
    /// Normalized weights
    pub weights: BTreeMap<String, f64>,
    /// First portfolio return date
    pub start: NaiveDate,
    /// Last portfolio return date
    pub end: NaiveDate,
    /// Frequency label
    pub frequency: String,
    /// Annualization convention
    pub compounding: Compounding,
    /// Missing-value policy
    pub missing_policy: MissingPolicy,
    /// Annualized return
    pub annualized_return: f64,
    /// Annualized volatility; `NaN` with fewer than two returns
    pub annualized_vol: f64,
    /// Maximum drawdown
    pub max_drawdown: f64,
}

impl fmt::Display for PortfolioSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}: return {:.2}%, vol {:.2}%, max drawdown {:.2}% ({} {})",
            self.start,
            self.end,
            self.annualized_return * 100.0,
            self.annualized_vol * 100.0,
            self.max_drawdown * 100.0,
            self.frequency,
            self.compounding.as_str()
        )
    }
}

/// Summarize the weighted portfolio of `tickers`.
pub fn summarize_portfolio(
    returns: &ReturnTable,
    tickers: &[String],
    weights: &BTreeMap<String, f64>,
    frequency: &str,
    compounding: Compounding,
    policy: MissingPolicy,
) -> Result<PortfolioSummary, SummaryError> {
    let periods = periods_per_year(frequency)
        .ok_or_else(|| SummaryError::UnsupportedFrequency(frequency.to_string()))?;
    let series = portfolio_returns(returns, tickers, weights, policy)?;
    let (Some(&start), Some(&end)) = (series.dates().first(), series.dates().last()) else {
        return Err(SummaryError::EmptySeries(policy.as_str().to_string()));
    };
    let values = series.values();
    let periods = f64::from(periods);

    let annualized_return = match compounding {
        Compounding::Geometric => {
            let growth: f64 = values.iter().map(|r| 1.0 + r).product();
            growth.powf(periods / values.len() as f64) - 1.0
        }
        Compounding::Simple => mean(values).unwrap_or(f64::NAN) * periods,
    };
    let annualized_vol = sample_std(values).map_or(f64::NAN, |s| s * periods.sqrt());
    let max_drawdown = max_drawdown(values).unwrap_or(0.0);

    let normalized = normalize_weights(weights, tickers)?;
    Ok(PortfolioSummary {
        tickers: tickers.to_vec(),
        weights: tickers.iter().cloned().zip(normalized).collect(),
        start,
        end,
        frequency: frequency.to_string(),
        compounding,
        missing_policy: policy,
        annualized_return,
        annualized_vol,
        max_drawdown,
    })
}
