//! Bundle metadata and the build manifest.

use chrono::{DateTime, Utc};
use hobart_regime::{REGIME_RULE, RegimeConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

/// Regime rule and parameters as exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeMetadata {
    /// Labeling rule
    pub rule: String,
    /// Rolling volatility window
    pub vol_window: usize,
    /// Trailing volatility values in the threshold distribution
    pub lookback: usize,
    /// Threshold quantile
    pub percentile: f64,
}

impl From<&RegimeConfig> for RegimeMetadata {
    fn from(config: &RegimeConfig) -> Self {
        Self {
            rule: REGIME_RULE.to_string(),
            vol_window: config.vol_window,
            lookback: config.lookback,
            percentile: config.percentile,
        }
    }
}

/// Contents of `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Universe tickers
    pub tickers: Vec<String>,
    /// Normalized universe weights
    pub weights: BTreeMap<String, f64>,
    /// Return frequency label, e.g. `W-FRI`
    pub frequency: String,
    /// Primary rolling window
    pub rolling_window: usize,
    /// All fitted window lengths
    pub windows: Vec<usize>,
    /// Minimum observations per window
    pub min_obs: usize,
    /// Sleeve names in configuration order
    pub sleeves: Vec<String>,
    /// Regime rule and parameters
    pub regime: RegimeMetadata,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// UTC build time
    pub build_timestamp: DateTime<Utc>,
    /// `HEAD` of the enclosing git repository, if any
    pub git_commit: Option<String>,
    /// Echo of the model configuration
    pub config: serde_json::Value,
    /// Regime rule and parameters
    pub regime_rule: RegimeMetadata,
    /// Units of the exported quantities
    pub units: BTreeMap<String, String>,
    /// Usage disclaimers
    pub disclaimers: Vec<String>,
}

impl Manifest {
    /// Manifest stamped with the current time.
    pub fn new(
        config: serde_json::Value,
        regime_rule: RegimeMetadata,
        git_commit: Option<String>,
    ) -> Self {
        let units = [
            ("returns", "decimals (0.01 = 1%)"),
            ("factors", "decimals (0.01 = 1%)"),
            ("volatility", "standard deviation of periodic returns (decimals)"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let disclaimers = [
            "Descriptive and retrospective analysis only.",
            "No forecasts or trading signals are produced.",
            "Past performance does not guarantee future results.",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        Self {
            build_timestamp: Utc::now(),
            git_commit,
            config,
            regime_rule,
            units,
            disclaimers,
        }
    }
}

/// Commit hash of the git repository containing `start`.
///
/// Walks up at most ten directories looking for `.git`; `None` when there is no
/// repository or `git` cannot be run.
pub fn git_commit(start: &Path) -> Option<String> {
    let start = start.canonicalize().ok()?;
    let root = start
        .ancestors()
        .take(10)
        .find(|dir| dir.join(".git").exists())?;
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(root)
        .output()
        .ok()?;
    if !output.status.success() {
        tracing::debug!(root = %root.display(), "git rev-parse failed");
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!hash.is_empty()).then_some(hash)
}
