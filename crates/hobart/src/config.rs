//! Model configuration.
//!
//! Loaded from TOML; every section is optional and falls back to the default
//! ten-ETF weekly setup.
//!
//! ```toml
//! frequency = "W-FRI"
//!
//! [universe]
//! tickers = ["SPY", "TLT"]
//! weights = { SPY = 0.6, TLT = 0.4 }
//!
//! [rolling]
//! window = 52
//! windows = [26, 52]
//! min_obs = 45
//!
//! [regime]
//! vol_window = 8
//! lookback = 104
//! percentile = 0.75
//!
//! [[sleeves]]
//! name = "macro"
//! tickers = ["SPY", "TLT"]
//! regressors = { kind = "proxies", columns = ["SPY", "TLT"] }
//! ```

use crate::universe::{SleeveConfig, Universe, UniverseConfig, sleeve::default_sleeves};
use hobart_data::{MissingPolicy, normalize_weights};
use hobart_exposure::RollingConfig;
use hobart_output::{Compounding, Meta, RegimeMetadata, periods_per_year};
use hobart_regime::RegimeConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors in the model configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Configuration file
        path: PathBuf,
        /// IO error
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The universe has no tickers.
    #[error("universe has no tickers")]
    EmptyUniverse,

    /// Weights cannot be normalized.
    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    /// Frequency cannot be annualized.
    #[error("unsupported frequency: {0}")]
    UnsupportedFrequency(String),

    /// Rolling window settings are unusable.
    #[error("invalid rolling settings: {0}")]
    Rolling(String),

    /// Regime settings are unusable.
    #[error("invalid regime settings: {0}")]
    Regime(String),

    /// Two sleeves share a name.
    #[error("duplicate sleeve name: {0}")]
    DuplicateSleeve(String),

    /// A sleeve has no tickers or no regressors.
    #[error("sleeve {0} needs at least one ticker and one regressor")]
    EmptySleeve(String),

    /// A sleeve holds a ticker outside the universe.
    #[error("sleeve {sleeve} holds {ticker}, which is not in the universe")]
    UnknownTicker {
        /// Sleeve name
        sleeve: String,
        /// Offending ticker
        ticker: String,
    },
}

/// Rolling regression settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingSettings {
    /// Primary window, used for attribution and regime summaries
    pub window: usize,
    /// Additional window lengths to fit
    pub windows: Vec<usize>,
    /// Minimum observations per window
    pub min_obs: usize,
}

impl Default for RollingSettings {
    fn default() -> Self {
        Self {
            window: 52,
            windows: vec![26, 52],
            min_obs: 45,
        }
    }
}

impl RollingSettings {
    /// All window lengths, ascending and unique, including the primary one.
    pub fn all_windows(&self) -> Vec<usize> {
        let mut set: BTreeSet<usize> = self.windows.iter().copied().collect();
        set.insert(self.window);
        set.into_iter().collect()
    }

    /// Rolling configuration for the primary window.
    pub const fn primary(&self) -> RollingConfig {
        RollingConfig {
            window: self.window,
            min_obs: self.min_obs,
        }
    }
}

/// Portfolio construction settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioSettings {
    /// Treatment of dates with missing holding returns
    pub missing_policy: MissingPolicy,
    /// Annualization convention for the portfolio summary
    pub compounding: Compounding,
}

/// Complete model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Return frequency label
    pub frequency: String,
    /// Universe tickers and weights
    pub universe: UniverseConfig,
    /// Rolling regression settings
    pub rolling: RollingSettings,
    /// Regime classifier settings
    pub regime: RegimeConfig,
    /// Portfolio construction settings
    pub portfolio: PortfolioSettings,
    /// Sleeves to model
    pub sleeves: Vec<SleeveConfig>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            frequency: "W-FRI".to_string(),
            universe: UniverseConfig::default(),
            rolling: RollingSettings::default(),
            regime: RegimeConfig::default(),
            portfolio: PortfolioSettings::default(),
            sleeves: default_sleeves(),
        }
    }
}

impl ModelConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), sleeves = config.sleeves.len(), "loaded configuration");
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Check every setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.universe.tickers.is_empty() {
            return Err(ConfigError::EmptyUniverse);
        }
        normalize_weights(&self.universe.weights, &self.universe.tickers)
            .map_err(|e| ConfigError::InvalidWeights(e.to_string()))?;
        if periods_per_year(&self.frequency).is_none() {
            return Err(ConfigError::UnsupportedFrequency(self.frequency.clone()));
        }
        self.regime
            .validate()
            .map_err(|e| ConfigError::Regime(e.to_string()))?;

        let mut names = BTreeSet::new();
        for sleeve in &self.sleeves {
            if !names.insert(sleeve.name.as_str()) {
                return Err(ConfigError::DuplicateSleeve(sleeve.name.clone()));
            }
            if sleeve.tickers.is_empty() || sleeve.regressors.columns().is_empty() {
                return Err(ConfigError::EmptySleeve(sleeve.name.clone()));
            }
            if let Some(ticker) = sleeve
                .symbols()
                .into_iter()
                .find(|t| !self.universe.contains(t))
            {
                return Err(ConfigError::UnknownTicker {
                    sleeve: sleeve.name.clone(),
                    ticker,
                });
            }
            normalize_weights(&self.universe.weights, &sleeve.tickers).map_err(|e| {
                ConfigError::InvalidWeights(format!("sleeve {}: {e}", sleeve.name))
            })?;

            let k = sleeve.regressors.columns().len();
            for window in self.rolling.all_windows() {
                RollingConfig {
                    window,
                    min_obs: self.rolling.min_obs.min(window),
                }
                .validate(k)
                .map_err(|e| ConfigError::Rolling(format!("sleeve {}: {e}", sleeve.name)))?;
            }
        }
        if self.rolling.min_obs == 0 || self.rolling.min_obs > self.rolling.window {
            return Err(ConfigError::Rolling(format!(
                "min_obs {} must be between 1 and the primary window {}",
                self.rolling.min_obs, self.rolling.window
            )));
        }
        Ok(())
    }

    /// Contents of `meta.json`.
    pub fn meta(&self) -> Meta {
        let weights = normalize_weights(&self.universe.weights, &self.universe.tickers)
            .map(|w| self.universe.tickers.iter().cloned().zip(w).collect())
            .unwrap_or_default();
        Meta {
            tickers: self.universe.tickers.clone(),
            weights,
            frequency: self.frequency.clone(),
            rolling_window: self.rolling.window,
            windows: self.rolling.all_windows(),
            min_obs: self.rolling.min_obs,
            sleeves: self.sleeves.iter().map(|s| s.name.clone()).collect(),
            regime: RegimeMetadata::from(&self.regime),
        }
    }
}
