//! Weighted portfolio return series.

use crate::error::{DataError, Result};
use crate::table::{ReturnTable, TimeSeries};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How dates with missing holding returns are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Drop a date when any holding return is missing.
    #[default]
    DropAny,
    /// Drop a date only when every holding return is missing; other gaps
    /// contribute zero.
    DropAll,
}

impl MissingPolicy {
    /// Stable identifier used in reports.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DropAny => "drop_any",
            Self::DropAll => "drop_all",
        }
    }
}

/// Normalize `weights` over `tickers` so they sum to one.
///
/// Tickers without a weight receive zero. Fails when `tickers` is empty or the
/// weights sum to a non-positive value.
pub fn normalize_weights(
    weights: &BTreeMap<String, f64>,
    tickers: &[String],
) -> Result<Vec<f64>> {
    if tickers.is_empty() {
        return Err(DataError::EmptyUniverse(
            "no tickers to weight".to_string(),
        ));
    }
    let raw: Vec<f64> = tickers
        .iter()
        .map(|t| weights.get(t).copied().unwrap_or(0.0))
        .collect();
    let total: f64 = raw.iter().sum();
    if total.is_nan() || total <= 0.0 {
        return Err(DataError::InvalidWeights(format!(
            "weights over {tickers:?} sum to {total}, expected a positive value"
        )));
    }
    Ok(raw.into_iter().map(|w| w / total).collect())
}

/// Compute the weighted portfolio return series for `tickers`.
pub fn portfolio_returns(
    returns: &ReturnTable,
    tickers: &[String],
    weights: &BTreeMap<String, f64>,
    policy: MissingPolicy,
) -> Result<TimeSeries> {
    let w = normalize_weights(weights, tickers)?;
    let holdings = returns.select(tickers)?;

    let mut dates = Vec::with_capacity(holdings.nrows());
    let mut values = Vec::with_capacity(holdings.nrows());
    for (date, row) in holdings.dates().iter().zip(holdings.values().outer_iter()) {
        let observed = row.iter().filter(|r| r.is_finite()).count();
        let keep = match policy {
            MissingPolicy::DropAny => observed == row.len(),
            MissingPolicy::DropAll => observed > 0,
        };
        if !keep {
            continue;
        }
        let value: f64 = row
            .iter()
            .zip(&w)
            .filter(|(r, _)| r.is_finite())
            .map(|(r, w)| r * w)
            .sum();
        dates.push(*date);
        values.push(value);
    }

    tracing::debug!(
        tickers = tickers.len(),
        kept = dates.len(),
        dropped = holdings.nrows() - dates.len(),
        policy = policy.as_str(),
        "computed portfolio returns"
    );
    TimeSeries::new("portfolio", dates, values)
}
