//! Per-regime aggregation of exposures and attribution.
//!
//! Exposure, attribution and regime records are inner-joined on date. The
//! joined rows are partitioned into calm and stress sequences and each is
//! reduced on its own. Drawdowns use every classified date of a label, joined
//! or not.

use crate::classifier::{Regime, RegimeRecord, RegimeSeries};
use crate::error::{RegimeError, Result};
use hobart_data::stats::{max_drawdown, mean};
use hobart_exposure::{AttributionRecord, AttributionSeries, ExposureRecord, ExposureSeries};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregates for one regime label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeStats {
    /// Label these statistics describe
    pub regime: Regime,
    /// Joined dates carrying the label
    pub observations: usize,
    /// Mean coefficient per regressor over joined dates
    pub mean_coefficients: BTreeMap<String, f64>,
    /// Mean explained share over joined dates where it is defined
    pub mean_explained_share: Option<f64>,
    /// Mean rolling volatility over joined dates
    pub mean_volatility: Option<f64>,
    /// Max drawdown of portfolio returns over all dates with the label
    pub max_drawdown: Option<f64>,
}

/// Calm and stress statistics for one sleeve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSummary {
    /// Sleeve summarized
    pub sleeve: String,
    /// Fraction of classified dates labeled stress
    pub stress_fraction: Option<f64>,
    /// Calm-regime statistics
    pub calm: RegimeStats,
    /// Stress-regime statistics
    pub stress: RegimeStats,
}

impl RegimeSummary {
    /// Statistics for `regime`.
    pub const fn get(&self, regime: Regime) -> &RegimeStats {
        match regime {
            Regime::Calm => &self.calm,
            Regime::Stress => &self.stress,
        }
    }

    /// Joined observations across both labels.
    pub const fn observations(&self) -> usize {
        self.calm.observations + self.stress.observations
    }
}

struct JoinedRow<'a> {
    exposure: &'a ExposureRecord,
    attribution: &'a AttributionRecord,
    regime: &'a RegimeRecord,
}

/// Summarize one sleeve's exposures and attribution by regime.
pub fn summarize(
    exposures: &ExposureSeries,
    attribution: &AttributionSeries,
    regimes: &RegimeSeries,
) -> Result<RegimeSummary> {
    if exposures.sleeve() != attribution.sleeve() {
        return Err(RegimeError::SleeveMismatch {
            exposures: exposures.sleeve().to_string(),
            attribution: attribution.sleeve().to_string(),
        });
    }

    let (stress_rows, calm_rows): (Vec<JoinedRow<'_>>, Vec<JoinedRow<'_>>) = attribution
        .records()
        .iter()
        .filter_map(|a| {
            Some(JoinedRow {
                exposure: exposures.get(a.date)?,
                attribution: a,
                regime: regimes.get(a.date)?,
            })
        })
        .partition(|row| row.regime.regime.is_stress());

    let names = exposures.regressor_names();
    let calm = reduce(Regime::Calm, &calm_rows, names, regimes);
    let stress = reduce(Regime::Stress, &stress_rows, names, regimes);
    tracing::info!(
        sleeve = exposures.sleeve(),
        calm = calm.observations,
        stress = stress.observations,
        "summarized regimes"
    );

    Ok(RegimeSummary {
        sleeve: exposures.sleeve().to_string(),
        stress_fraction: regimes.stress_fraction(),
        calm,
        stress,
    })
}

fn reduce(
    regime: Regime,
    rows: &[JoinedRow<'_>],
    names: &[String],
    regimes: &RegimeSeries,
) -> RegimeStats {
    let mean_coefficients = if rows.is_empty() {
        BTreeMap::new()
    } else {
        names
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let total: f64 = rows.iter().map(|r| r.exposure.coefficients[j]).sum();
                (name.clone(), total / rows.len() as f64)
            })
            .collect()
    };
    let shares: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.attribution.explained_share)
        .collect();
    let vols: Vec<f64> = rows.iter().map(|r| r.regime.volatility).collect();
    let labeled: Vec<f64> = regimes
        .with_regime(regime)
        .map(|r| r.portfolio_return)
        .collect();

    RegimeStats {
        regime,
        observations: rows.len(),
        mean_coefficients,
        mean_explained_share: mean(&shares),
        mean_volatility: mean(&vols),
        max_drawdown: max_drawdown(&labeled),
    }
}
