//! Instrument universe and sleeves.
//!
//! The universe is the full weighted ETF list; sleeves are named subsets of it,
//! each with its own regressors.

pub mod sleeve;

pub use sleeve::{Regressors, SleeveConfig};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tickers of the default ten-ETF universe.
pub const DEFAULT_TICKERS: [&str; 10] = [
    "SPY", "QQQ", "IWM", "VTV", "VUG", "EFA", "TLT", "GLD", "VNQ", "DBC",
];

/// Trait for instrument universes.
pub trait Universe {
    /// Get all symbols in the universe.
    fn symbols(&self) -> Vec<String>;

    /// Check if a symbol is in the universe.
    fn contains(&self, symbol: &str) -> bool {
        self.symbols().iter().any(|s| s == symbol)
    }

    /// Get the number of constituents.
    fn size(&self) -> usize {
        self.symbols().len()
    }
}

/// Weighted universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    /// Tickers in reporting order
    pub tickers: Vec<String>,
    /// Raw weights; normalized over the tickers when used
    pub weights: BTreeMap<String, f64>,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            weights: DEFAULT_TICKERS
                .iter()
                .map(|t| (t.to_string(), 0.10))
                .collect(),
        }
    }
}

impl Universe for UniverseConfig {
    fn symbols(&self) -> Vec<String> {
        self.tickers.clone()
    }

    fn contains(&self, symbol: &str) -> bool {
        self.tickers.iter().any(|t| t == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universe_trait() {
        let universe = UniverseConfig::default();

        assert!(universe.contains("TLT"));
        assert!(!universe.contains("NOTREAL"));
        assert_eq!(universe.size(), 10);
        let total: f64 = universe.weights.values().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }
}
