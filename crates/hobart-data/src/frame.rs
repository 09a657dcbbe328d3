//! Modeling frames and the frame builder.
//!
//! A [`ModelingFrame`] pairs one target series with one or more regressor
//! series on a shared date index. Frames are complete by construction: every
//! value is finite and the index is strictly increasing and unique.
//!
//! [`FrameBuilder`] produces frames for the two sleeve shapes used by the model:
//!
//! - factor sleeves regress the sleeve's excess return (portfolio return minus
//!   the risk-free rate) on factor returns from a factor table;
//! - proxy sleeves regress the sleeve's portfolio return on the returns of
//!   proxy instruments taken from the asset return table.

use crate::error::{DataError, Result};
use crate::portfolio::{MissingPolicy, portfolio_returns};
use crate::table::{ReturnTable, TimeSeries, check_index, intersect_dates};
use chrono::NaiveDate;
use ndarray::{Array1, Array2, ArrayView1};
use std::collections::BTreeMap;

/// Default name of the target column.
pub const TARGET_COLUMN: &str = "Y";

/// Target and regressors on a shared, complete date index.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelingFrame {
    name: String,
    dates: Vec<NaiveDate>,
    target_name: String,
    target: Array1<f64>,
    regressor_names: Vec<String>,
    regressors: Array2<f64>,
}

impl ModelingFrame {
    /// Create a frame, validating shape, date order and completeness.
    pub fn new(
        name: impl Into<String>,
        dates: Vec<NaiveDate>,
        target_name: impl Into<String>,
        target: Array1<f64>,
        regressor_names: Vec<String>,
        regressors: Array2<f64>,
    ) -> Result<Self> {
        let name = name.into();
        let target_name = target_name.into();
        if regressor_names.is_empty() {
            return Err(DataError::NoRegressors(name));
        }
        let n = dates.len();
        if target.len() != n || regressors.nrows() != n {
            return Err(DataError::ShapeMismatch {
                table: name,
                expected: n,
                actual: if target.len() == n {
                    regressors.nrows()
                } else {
                    target.len()
                },
            });
        }
        if regressors.ncols() != regressor_names.len() {
            return Err(DataError::ShapeMismatch {
                table: name,
                expected: regressor_names.len(),
                actual: regressors.ncols(),
            });
        }
        check_index(&name, &dates)?;

        for (i, date) in dates.iter().enumerate() {
            if !target[i].is_finite() {
                return Err(DataError::MissingValue {
                    table: name,
                    column: target_name,
                    date: date.to_string(),
                });
            }
            if let Some(j) = regressors.row(i).iter().position(|v| !v.is_finite()) {
                return Err(DataError::MissingValue {
                    table: name,
                    column: regressor_names[j].clone(),
                    date: date.to_string(),
                });
            }
        }

        Ok(Self {
            name,
            dates,
            target_name,
            target,
            regressor_names,
            regressors,
        })
    }

    /// Frame (sleeve) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Date index.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Target column name.
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Target values.
    pub const fn target(&self) -> &Array1<f64> {
        &self.target
    }

    /// Regressor column names.
    pub fn regressor_names(&self) -> &[String] {
        &self.regressor_names
    }

    /// `dates x regressors` matrix.
    pub const fn regressors(&self) -> &Array2<f64> {
        &self.regressors
    }

    /// Regressor values on row `i`.
    pub fn regressor_row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.regressors.row(i)
    }

    /// Number of regressors (excluding the intercept).
    pub fn n_regressors(&self) -> usize {
        self.regressor_names.len()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the frame has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Position of `date` in the index.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// The frame as a plain table with the target as the first column.
    pub fn to_table(&self) -> Result<ReturnTable> {
        let mut columns = Vec::with_capacity(self.n_regressors() + 1);
        columns.push((self.target_name.clone(), self.target.to_vec()));
        for (j, name) in self.regressor_names.iter().enumerate() {
            columns.push((name.clone(), self.regressors.column(j).to_vec()));
        }
        ReturnTable::from_columns(self.name.clone(), self.dates.clone(), columns)
    }
}

/// Builds per-sleeve modeling frames from an asset return table.
#[derive(Debug, Clone, Copy)]
pub struct FrameBuilder<'a> {
    returns: &'a ReturnTable,
    weights: &'a BTreeMap<String, f64>,
    policy: MissingPolicy,
}

impl<'a> FrameBuilder<'a> {
    /// Create a builder over asset `returns` with the configured `weights`.
    pub const fn new(
        returns: &'a ReturnTable,
        weights: &'a BTreeMap<String, f64>,
        policy: MissingPolicy,
    ) -> Self {
        Self {
            returns,
            weights,
            policy,
        }
    }

    /// Weighted portfolio return series for `tickers`.
    pub fn portfolio(&self, tickers: &[String]) -> Result<TimeSeries> {
        portfolio_returns(self.returns, tickers, self.weights, self.policy)
    }

    /// Frame of sleeve excess returns on factor returns.
    ///
    /// The target is the sleeve portfolio return minus `risk_free` when a
    /// risk-free column is given. Dates are the intersection of the portfolio
    /// series and the factor table, less any row with a missing value.
    pub fn factor_frame(
        &self,
        name: &str,
        tickers: &[String],
        factors: &ReturnTable,
        risk_free: Option<&str>,
        columns: &[String],
    ) -> Result<ModelingFrame> {
        let mut wanted: Vec<String> = columns.to_vec();
        if let Some(rf) = risk_free {
            wanted.push(rf.to_string());
        }
        let factors = factors.select(&wanted)?;
        let portfolio = self.portfolio(tickers)?;

        let mut dates = Vec::new();
        let mut target = Vec::new();
        let mut rows = Vec::new();
        for (p, f) in intersect_dates(portfolio.dates(), factors.dates()) {
            let row = factors.values().row(f);
            let y = portfolio.values()[p];
            if !y.is_finite() || row.iter().any(|v| !v.is_finite()) {
                continue;
            }
            let excess = if risk_free.is_some() {
                y - row[columns.len()]
            } else {
                y
            };
            dates.push(portfolio.dates()[p]);
            target.push(excess);
            rows.push(row.iter().take(columns.len()).copied().collect::<Vec<_>>());
        }

        tracing::info!(
            frame = name,
            rows = dates.len(),
            regressors = columns.len(),
            "built factor frame"
        );
        assemble(name, dates, target, columns, rows)
    }

    /// Frame of sleeve portfolio returns on proxy instrument returns.
    ///
    /// Every proxy must be a column of the asset return table.
    pub fn proxy_frame(
        &self,
        name: &str,
        tickers: &[String],
        proxies: &[String],
    ) -> Result<ModelingFrame> {
        let missing = self.returns.missing_columns(proxies);
        if !missing.is_empty() {
            return Err(DataError::missing_columns(
                format!("{} (macro proxies)", self.returns.name()),
                missing,
            ));
        }
        let proxy_table = self.returns.select(proxies)?;
        let portfolio = self.portfolio(tickers)?;

        let mut dates = Vec::new();
        let mut target = Vec::new();
        let mut rows = Vec::new();
        for (p, x) in intersect_dates(portfolio.dates(), proxy_table.dates()) {
            let row = proxy_table.values().row(x);
            let y = portfolio.values()[p];
            if !y.is_finite() || row.iter().any(|v| !v.is_finite()) {
                continue;
            }
            dates.push(portfolio.dates()[p]);
            target.push(y);
            rows.push(row.to_vec());
        }

        tracing::info!(
            frame = name,
            rows = dates.len(),
            regressors = proxies.len(),
            "built proxy frame"
        );
        assemble(name, dates, target, proxies, rows)
    }
}

fn assemble(
    name: &str,
    dates: Vec<NaiveDate>,
    target: Vec<f64>,
    columns: &[String],
    rows: Vec<Vec<f64>>,
) -> Result<ModelingFrame> {
    let k = columns.len();
    let mut regressors = Array2::<f64>::zeros((rows.len(), k));
    for (i, row) in rows.iter().enumerate() {
        for (j, v) in row.iter().enumerate() {
            regressors[[i, j]] = *v;
        }
    }
    ModelingFrame::new(
        name,
        dates,
        TARGET_COLUMN,
        Array1::from(target),
        columns.to_vec(),
        regressors,
    )
}
