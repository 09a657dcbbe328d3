//! Terminal reports for one sleeve.

use chrono::NaiveDate;
use hobart_exposure::{AttributionRecord, AttributionSeries, ExposureRecord, ExposureSeries};
use hobart_regime::{Regime, RegimeStats, RegimeSummary};
use serde::{Deserialize, Serialize};

/// Latest exposures, cumulative attribution and regime statistics of a sleeve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleeveReport {
    /// Sleeve name.
    pub sleeve: String,
    /// Regressor names.
    pub regressors: Vec<String>,
    /// Rolling window length.
    pub window: usize,
    /// Exposures on the last window.
    pub latest: Option<ExposureRecord>,
    /// Last attribution record, carrying cumulative sums.
    pub cumulative: Option<AttributionRecord>,
    /// First attributed date.
    pub since: Option<NaiveDate>,
    /// Per-regime statistics.
    pub regimes: Option<RegimeSummary>,
}

impl SleeveReport {
    /// Build a report from a sleeve's outputs.
    pub fn new(
        exposures: &ExposureSeries,
        attribution: &AttributionSeries,
        regimes: Option<&RegimeSummary>,
    ) -> Self {
        Self {
            sleeve: exposures.sleeve().to_string(),
            regressors: exposures.regressor_names().to_vec(),
            window: exposures.window(),
            latest: exposures.records().last().cloned(),
            cumulative: attribution.last().cloned(),
            since: attribution.records().first().map(|r| r.date),
            regimes: regimes.cloned(),
        }
    }

    /// Generate an ASCII table representation.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nSleeve: {}\n", self.sleeve));
        output.push_str(&format!("Rolling window: {}\n", self.window));
        output.push_str(&"=".repeat(72));
        output.push('\n');

        let Some(latest) = &self.latest else {
            output.push_str("No exposure windows could be fitted.\n");
            return output;
        };

        output.push_str(&format!("Exposures as of {}\n", latest.date));
        output.push_str(&format!(
            "{:<16} {:>12} {:>12} {:>14}\n",
            "Regressor", "Beta", "Std Err", "Cum Contrib"
        ));
        output.push_str(&"-".repeat(72));
        output.push('\n');
        output.push_str(&format!(
            "{:<16} {:>12.4} {:>12.4}\n",
            "alpha", latest.intercept, latest.intercept_std_error
        ));
        for (j, name) in self.regressors.iter().enumerate() {
            let cum = self
                .cumulative
                .as_ref()
                .map_or(0.0, |c| c.cum_contributions[j]);
            output.push_str(&format!(
                "{:<16} {:>12.4} {:>12.4} {:>13.2}%\n",
                name,
                latest.coefficients[j],
                latest.std_errors[j],
                cum * 100.0
            ));
        }
        output.push_str(&"-".repeat(72));
        output.push('\n');
        output.push_str(&format!("R-squared: {:.4} ({} obs)\n", latest.r_squared, latest.nobs));

        if let (Some(c), Some(since)) = (&self.cumulative, self.since) {
            output.push_str(&format!("\nCumulative since {since}\n"));
            output.push_str(&format!("{:<20} {:>11.2}%\n", "Realized", c.cum_realized * 100.0));
            output.push_str(&format!("{:<20} {:>11.2}%\n", "Explained", c.cum_explained * 100.0));
            output.push_str(&format!("{:<20} {:>11.2}%\n", "Residual", c.cum_residual * 100.0));
        }

        if let Some(summary) = &self.regimes {
            output.push('\n');
            output.push_str(&format!(
                "{:<10} {:>6} {:>10} {:>12} {:>12}\n",
                "Regime", "Obs", "Mean Vol", "Expl Share", "Max DD"
            ));
            output.push_str(&"-".repeat(72));
            output.push('\n');
            for regime in [Regime::Calm, Regime::Stress] {
                let stats = summary.get(regime);
                output.push_str(&format!(
                    "{:<10} {:>6} {:>10} {:>12} {:>12}\n",
                    regime.to_string(),
                    stats.observations,
                    percent(stats.mean_volatility),
                    ratio(stats.mean_explained_share),
                    percent(stats.max_drawdown)
                ));
            }
            if let Some(fraction) = summary.stress_fraction {
                output.push_str(&format!("Stress fraction: {:.1}%\n", fraction * 100.0));
            }
        }

        output.push_str(&"=".repeat(72));
        output.push('\n');
        output
    }

    /// Generate a Markdown representation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# Sleeve: {}\n\n", self.sleeve));
        output.push_str(&format!("**Rolling window:** {}\n\n", self.window));

        if let Some(latest) = &self.latest {
            output.push_str(&format!("## Exposures as of {}\n\n", latest.date));
            output.push_str("| Regressor | Beta | Std Err |\n");
            output.push_str("|-----------|------|---------|\n");
            output.push_str(&format!(
                "| alpha | {:.4} | {:.4} |\n",
                latest.intercept, latest.intercept_std_error
            ));
            for (j, name) in self.regressors.iter().enumerate() {
                output.push_str(&format!(
                    "| {} | {:.4} | {:.4} |\n",
                    name, latest.coefficients[j], latest.std_errors[j]
                ));
            }
            output.push('\n');
            output.push_str(&format!("- **R-squared:** {:.4}\n\n", latest.r_squared));
        }

        if let Some(c) = &self.cumulative {
            output.push_str("## Cumulative Attribution\n\n");
            output.push_str(&format!("- **Realized:** {:.2}%\n", c.cum_realized * 100.0));
            output.push_str(&format!("- **Explained:** {:.2}%\n", c.cum_explained * 100.0));
            output.push_str(&format!("- **Residual:** {:.2}%\n\n", c.cum_residual * 100.0));
        }

        if let Some(summary) = &self.regimes {
            output.push_str("## Regimes\n\n");
            output.push_str("| Regime | Obs | Mean Vol | Explained Share | Max Drawdown |\n");
            output.push_str("|--------|-----|----------|-----------------|--------------|\n");
            for regime in [Regime::Calm, Regime::Stress] {
                output.push_str(&markdown_row(summary.get(regime)));
            }
        }

        output
    }
}

fn markdown_row(stats: &RegimeStats) -> String {
    format!(
        "| {} | {} | {} | {} | {} |\n",
        stats.regime,
        stats.observations,
        percent(stats.mean_volatility),
        ratio(stats.mean_explained_share),
        percent(stats.max_drawdown)
    )
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0))
}

fn ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}"))
}
