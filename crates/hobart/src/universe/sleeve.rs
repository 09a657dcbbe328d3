//! Sleeve definitions.

use super::Universe;
use serde::{Deserialize, Serialize};

/// What a sleeve's return is regressed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressors {
    /// Columns of a named factor table; the target is in excess of `risk_free`.
    Factors {
        /// Factor table name
        table: String,
        /// Risk-free column subtracted from the sleeve return
        #[serde(default)]
        risk_free: Option<String>,
        /// Factor columns
        columns: Vec<String>,
    },
    /// Returns of proxy instruments from the asset return table.
    Proxies {
        /// Proxy tickers
        columns: Vec<String>,
    },
}

impl Regressors {
    /// Regressor column names.
    pub fn columns(&self) -> &[String] {
        match self {
            Self::Factors { columns, .. } | Self::Proxies { columns } => columns,
        }
    }

    /// Factor table this sleeve needs, if any.
    pub fn factor_table(&self) -> Option<&str> {
        match self {
            Self::Factors { table, .. } => Some(table),
            Self::Proxies { .. } => None,
        }
    }
}

/// A named, weighted subset of the universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleeveConfig {
    /// Sleeve name, used in file names
    pub name: String,
    /// Holdings; weights come from the universe
    pub tickers: Vec<String>,
    /// Regressors
    pub regressors: Regressors,
}

impl Universe for SleeveConfig {
    fn symbols(&self) -> Vec<String> {
        self.tickers.clone()
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// US equity, developed ex-US equity and total-portfolio macro sleeves.
pub fn default_sleeves() -> Vec<SleeveConfig> {
    let ff3 = strings(&["MKT_RF", "SMB", "HML"]);
    vec![
        SleeveConfig {
            name: "equity_us".to_string(),
            tickers: strings(&["SPY", "QQQ", "IWM", "VTV", "VUG"]),
            regressors: Regressors::Factors {
                table: "ff3_us".to_string(),
                risk_free: Some("RF".to_string()),
                columns: ff3.clone(),
            },
        },
        SleeveConfig {
            name: "equity_intl".to_string(),
            tickers: strings(&["EFA"]),
            regressors: Regressors::Factors {
                table: "ff3_devx".to_string(),
                risk_free: Some("RF".to_string()),
                columns: ff3,
            },
        },
        SleeveConfig {
            name: "total_macro".to_string(),
            tickers: strings(&super::DEFAULT_TICKERS),
            regressors: Regressors::Proxies {
                columns: strings(&["SPY", "TLT", "DBC", "GLD", "VNQ"]),
            },
        },
    ]
}
