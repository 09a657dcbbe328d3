//! Ordinary least squares with an intercept.
//!
//! The design matrix is `[1, x_1, ..., x_k]`. Columns are scaled to unit norm
//! before the normal equations are inverted, so the rank test does not depend
//! on the units of the regressors.

use crate::error::{ExposureError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Pivots below this magnitude (on the unit-diagonal normal matrix) mark a
/// rank-deficient design.
pub const RANK_TOLERANCE: f64 = 1e-10;

/// Result of one OLS fit.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    /// Intercept estimate.
    pub intercept: f64,
    /// Slope estimates, one per regressor.
    pub coefficients: Array1<f64>,
    /// Standard error of the intercept; `NaN` with zero residual degrees of freedom.
    pub intercept_std_error: f64,
    /// Standard errors of the slopes; `NaN` with zero residual degrees of freedom.
    pub std_errors: Array1<f64>,
    /// Coefficient of determination; zero when the target is constant.
    pub r_squared: f64,
    /// Number of observations used.
    pub nobs: usize,
}

impl OlsFit {
    /// Fitted value for one regressor row.
    pub fn predict(&self, x: ArrayView1<'_, f64>) -> f64 {
        self.intercept + self.coefficients.dot(&x)
    }
}

/// Fit `y = a + X b + e` by least squares.
///
/// `x` is `nobs x k` without the intercept column.
pub fn fit_ols(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<OlsFit> {
    let (n, k) = x.dim();
    if y.len() != n {
        return Err(ExposureError::DimensionMismatch {
            context: "ols target",
            expected: n,
            actual: y.len(),
        });
    }
    let p = k + 1;
    if n == 0 {
        return Err(ExposureError::InsufficientData {
            required: p,
            actual: 0,
        });
    }

    let mut design = Array2::<f64>::ones((n, p));
    design.slice_mut(ndarray::s![.., 1..]).assign(&x);

    let scale: Array1<f64> = design.axis_iter(Axis(1)).map(column_norm).collect();
    if scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
        let rank = scale.iter().filter(|s| **s > 0.0).count();
        return Err(ExposureError::RankDeficient { rank, columns: p });
    }
    let scaled = &design / &scale;

    let gram = scaled.t().dot(&scaled);
    let gram_inv = invert(&gram)?;
    let beta_scaled = gram_inv.dot(&scaled.t().dot(&y));
    let beta = &beta_scaled / &scale;

    let fitted = design.dot(&beta);
    let residuals = &y - &fitted;
    let ssr = residuals.dot(&residuals);
    let y_mean = y.sum() / n as f64;
    let sst = y.iter().map(|v| (v - y_mean).powi(2)).sum::<f64>();
    let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { 0.0 };

    let std_errors: Array1<f64> = if n > p {
        let sigma2 = ssr / (n - p) as f64;
        (0..p)
            .map(|j| (sigma2 * gram_inv[[j, j]]).max(0.0).sqrt() / scale[j])
            .collect()
    } else {
        Array1::from_elem(p, f64::NAN)
    };

    Ok(OlsFit {
        intercept: beta[0],
        coefficients: beta.slice(ndarray::s![1..]).to_owned(),
        intercept_std_error: std_errors[0],
        std_errors: std_errors.slice(ndarray::s![1..]).to_owned(),
        r_squared,
        nobs: n,
    })
}

/// Gauss-Jordan inverse with partial pivoting.
fn invert(matrix: &Array2<f64>) -> Result<Array2<f64>> {
    let p = matrix.nrows();
    let mut a = matrix.clone();
    let mut inv = Array2::<f64>::eye(p);
    let mut rank = 0;
    let mut deficient = false;

    for col in 0..p {
        let pivot_row = (col..p)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        let pivot = a[[pivot_row, col]];
        if !pivot.is_finite() || pivot.abs() < RANK_TOLERANCE {
            deficient = true;
            continue;
        }
        rank += 1;
        if pivot_row != col {
            for j in 0..p {
                a.swap([col, j], [pivot_row, j]);
                inv.swap([col, j], [pivot_row, j]);
            }
        }
        for j in 0..p {
            a[[col, j]] /= pivot;
            inv[[col, j]] /= pivot;
        }
        for i in 0..p {
            if i == col {
                continue;
            }
            let factor = a[[i, col]];
            if factor == 0.0 {
                continue;
            }
            for j in 0..p {
                a[[i, j]] -= factor * a[[col, j]];
                inv[[i, j]] -= factor * inv[[col, j]];
            }
        }
    }

    if deficient {
        return Err(ExposureError::RankDeficient { rank, columns: p });
    }
    Ok(inv)
}

/// Euclidean norm of `c`, pre-scaled by its largest magnitude so the sum of
/// squares cannot overflow.
fn column_norm(c: ArrayView1<'_, f64>) -> f64 {
    let m = c.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if m == 0.0 || !m.is_finite() {
        return m;
    }
    m * c.iter().map(|v| (v / m).powi(2)).sum::<f64>().sqrt()
}
