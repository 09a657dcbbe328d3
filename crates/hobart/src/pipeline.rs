//! End-to-end modeling pipeline.
//!
//! One run computes, in order:
//!
//! 1. the annualized summary and return series of the universe portfolio;
//! 2. calm/stress regimes of that series;
//! 3. per sleeve, the modeling frame, rolling exposures for every configured
//!    window, lagged attribution and the regime summary, all on the primary
//!    window.
//!
//! [`PipelineOutput::write_bundle`] persists the results in the layout read by
//! [`hobart_output::validate_bundle`].

use crate::config::{ConfigError, ModelConfig};
use crate::error::{HobartError, Result};
use crate::universe::{Regressors, SleeveConfig};
use hobart_data::{FrameBuilder, ModelingFrame, ReturnTable, portfolio_returns, read_table};
use hobart_exposure::{AttributionSeries, ExposureSeries, attribute, fit_windows};
use hobart_output::{
    BundleWriter, Dataset, ExportFormat, Exporter, Manifest, PortfolioSummary, RegimeMetadata,
    RegimesPayload, SleeveReport, attribution_dataset, exposure_dataset, summarize_portfolio,
};
use hobart_regime::{RegimeClassifier, RegimeSeries, RegimeSummary, summarize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Asset returns and factor tables feeding a run.
#[derive(Debug, Clone)]
pub struct Inputs {
    /// Periodic returns, one column per ticker
    pub returns: ReturnTable,
    /// Factor tables keyed by the name sleeves refer to
    pub factors: BTreeMap<String, ReturnTable>,
}

impl Inputs {
    /// Wrap already loaded tables.
    pub const fn new(returns: ReturnTable, factors: BTreeMap<String, ReturnTable>) -> Self {
        Self { returns, factors }
    }

    /// Load the return table and each named factor table from CSV or Parquet.
    pub fn load(returns: &Path, factors: &BTreeMap<String, PathBuf>) -> Result<Self> {
        let returns = read_table(returns)?.with_name("returns");
        let factors = factors
            .iter()
            .map(|(name, path)| -> Result<(String, ReturnTable)> {
                Ok((name.clone(), read_table(path)?.with_name(name.clone())))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self { returns, factors })
    }
}

/// Results for one sleeve.
#[derive(Debug, Clone)]
pub struct SleeveOutput {
    /// Sleeve name
    pub name: String,
    /// Modeling frame the regressions ran on
    pub frame: ModelingFrame,
    /// Exposure series, ascending by window length
    pub exposures: Vec<ExposureSeries>,
    /// Attribution on the primary window
    pub attribution: AttributionSeries,
    /// Regime summary on the primary window
    pub summary: RegimeSummary,
    primary: usize,
}

impl SleeveOutput {
    /// Exposures of the primary window.
    pub fn primary(&self) -> &ExposureSeries {
        &self.exposures[self.primary]
    }

    /// Exposures fitted with `window`.
    pub fn window(&self, window: usize) -> Option<&ExposureSeries> {
        self.exposures.iter().find(|e| e.window() == window)
    }

    /// Console report.
    pub fn report(&self) -> SleeveReport {
        SleeveReport::new(self.primary(), &self.attribution, Some(&self.summary))
    }
}

/// Results of a full run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Universe portfolio summary
    pub portfolio: PortfolioSummary,
    /// Regimes of the universe portfolio
    pub regimes: RegimeSeries,
    /// Per-sleeve results in configuration order
    pub sleeves: Vec<SleeveOutput>,
}

impl PipelineOutput {
    /// Results for the sleeve called `name`.
    pub fn sleeve(&self, name: &str) -> Option<&SleeveOutput> {
        self.sleeves.iter().find(|s| s.name == name)
    }

    /// Regime summaries keyed by sleeve.
    pub fn summaries(&self) -> BTreeMap<String, RegimeSummary> {
        self.sleeves
            .iter()
            .map(|s| (s.name.clone(), s.summary.clone()))
            .collect()
    }

    /// Write the bundle into `dir` and return its manifest.
    ///
    /// JSON files: `meta`, `exposures_<sleeve>`, `attribution_<sleeve>`,
    /// `regimes`, `regime_summary`, `portfolio_summary` and `manifest`.
    /// Parquet copies of the exposures, attribution and regimes sit next to
    /// them; other window lengths are written only as
    /// `exposures_<sleeve>_w<window>.parquet`. Modeling frames go under
    /// `frames/`.
    pub fn write_bundle(
        &self,
        dir: &Path,
        config: &ModelConfig,
        git_commit: Option<String>,
    ) -> Result<Manifest> {
        let writer = BundleWriter::create(dir)?;
        writer.write_json("meta", &config.meta())?;

        for sleeve in &self.sleeves {
            let exposures = exposure_dataset(sleeve.primary());
            writer.write_dataset(&exposures, ExportFormat::PrettyJson)?;
            writer.write_dataset(&exposures, ExportFormat::Parquet)?;
            for series in &sleeve.exposures {
                if series.window() == config.rolling.window {
                    continue;
                }
                let dataset = exposure_dataset(series);
                let renamed = Dataset::new(
                    format!("{}_w{}", dataset.name(), series.window()),
                    dataset.rows().to_vec(),
                );
                writer.write_dataset(&renamed, ExportFormat::Parquet)?;
            }

            let attribution = attribution_dataset(&sleeve.attribution);
            writer.write_dataset(&attribution, ExportFormat::PrettyJson)?;
            writer.write_dataset(&attribution, ExportFormat::Parquet)?;
            writer.write_table(&sleeve.frame.to_table()?)?;
        }

        let summaries = self.summaries();
        let payload = RegimesPayload::new(&self.regimes, summaries.clone());
        writer.write_json("regimes", &payload)?;
        payload
            .data
            .export_to_file(&dir.join("regimes.parquet"), ExportFormat::Parquet)?;
        writer.write_json("regime_summary", &summaries)?;
        writer.write_json("portfolio_summary", &self.portfolio)?;

        let manifest = Manifest::new(
            serde_json::to_value(config)?,
            RegimeMetadata::from(&config.regime),
            git_commit,
        );
        writer.write_json("manifest", &manifest)?;
        tracing::info!(
            dir = %dir.display(),
            sleeves = self.sleeves.len(),
            regimes = self.regimes.len(),
            "wrote bundle"
        );
        Ok(manifest)
    }
}

/// Runs the model described by a [`ModelConfig`].
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    config: &'a ModelConfig,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline over `config`.
    pub const fn new(config: &'a ModelConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub const fn config(&self) -> &ModelConfig {
        self.config
    }

    /// Run every sleeve.
    pub fn run(&self, inputs: &Inputs) -> Result<PipelineOutput> {
        self.run_with(inputs, |_| {})
    }

    /// Run every sleeve, calling `on_sleeve` as each one completes.
    pub fn run_with<F>(&self, inputs: &Inputs, mut on_sleeve: F) -> Result<PipelineOutput>
    where
        F: FnMut(&SleeveOutput),
    {
        let config = self.config;
        config.validate()?;
        let universe = &config.universe;
        let policy = config.portfolio.missing_policy;

        let portfolio = summarize_portfolio(
            &inputs.returns,
            &universe.tickers,
            &universe.weights,
            &config.frequency,
            config.portfolio.compounding,
            policy,
        )?;
        tracing::info!(%portfolio, "summarized universe portfolio");

        let universe_returns =
            portfolio_returns(&inputs.returns, &universe.tickers, &universe.weights, policy)?;
        let regimes = RegimeClassifier::new(config.regime)?.classify(&universe_returns)?;

        let builder = FrameBuilder::new(&inputs.returns, &universe.weights, policy);
        let mut sleeves = Vec::with_capacity(config.sleeves.len());
        for sleeve in &config.sleeves {
            let output = self.run_sleeve(sleeve, &builder, inputs, &regimes)?;
            on_sleeve(&output);
            sleeves.push(output);
        }

        Ok(PipelineOutput {
            portfolio,
            regimes,
            sleeves,
        })
    }

    fn run_sleeve(
        &self,
        sleeve: &SleeveConfig,
        builder: &FrameBuilder<'_>,
        inputs: &Inputs,
        regimes: &RegimeSeries,
    ) -> Result<SleeveOutput> {
        let frame = match &sleeve.regressors {
            Regressors::Factors {
                table,
                risk_free,
                columns,
            } => {
                let factors =
                    inputs
                        .factors
                        .get(table)
                        .ok_or_else(|| HobartError::MissingFactorTable {
                            sleeve: sleeve.name.clone(),
                            table: table.clone(),
                        })?;
                builder.factor_frame(
                    &sleeve.name,
                    &sleeve.tickers,
                    factors,
                    risk_free.as_deref(),
                    columns,
                )?
            }
            Regressors::Proxies { columns } => {
                builder.proxy_frame(&sleeve.name, &sleeve.tickers, columns)?
            }
        };

        let rolling = &self.config.rolling;
        let windows = rolling.all_windows();
        let primary = windows.binary_search(&rolling.window).map_err(|_| {
            ConfigError::Rolling(format!("primary window {} was not fitted", rolling.window))
        })?;
        let exposures = fit_windows(&frame, &windows, rolling.min_obs)?;
        let attribution = attribute(&frame, &exposures[primary])?;
        let summary = summarize(&exposures[primary], &attribution, regimes)?;

        tracing::info!(
            sleeve = %sleeve.name,
            rows = frame.len(),
            exposures = exposures[primary].len(),
            attribution = attribution.len(),
            joined = summary.observations(),
            "modeled sleeve"
        );
        Ok(SleeveOutput {
            name: sleeve.name.clone(),
            frame,
            exposures,
            attribution,
            summary,
            primary,
        })
    }
}
