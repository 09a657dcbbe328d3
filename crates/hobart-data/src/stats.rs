//! Small descriptive statistics shared by the regime classifier and the
//! portfolio summary.

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator), `None` below two observations.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|&r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    Some(variance.sqrt())
}

/// Quantile with linear interpolation between order statistics.
///
/// The quantile sits at position `q * (n - 1)` of the sorted sample. Returns
/// `None` for an empty sample or `q` outside `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Maximum peak-to-trough drawdown of a return series.
///
/// Wealth is the cumulative product of `1 + r`; the drawdown at each step is
/// `wealth / running_max - 1` and the result is its minimum (zero or negative).
/// The running maximum starts at the first wealth value. `None` when empty.
pub fn max_drawdown(returns: &[f64]) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    let mut wealth = 1.0;
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &r in returns {
        wealth *= 1.0 + r;
        peak = peak.max(wealth);
        worst = worst.min(wealth / peak - 1.0);
    }
    Some(worst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sample_std() {
        let vol = sample_std(&[0.01, -0.01, 0.02, -0.02, 0.0]).unwrap();
        assert_relative_eq!(vol, 0.0158113883, epsilon = 1e-9);
        assert!(sample_std(&[0.01]).is_none());
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(quantile(&values, 0.0).unwrap(), 1.0);
        assert_relative_eq!(quantile(&values, 1.0).unwrap(), 4.0);
        // position 0.75 * 3 = 2.25 -> 3 + 0.25 * (4 - 3)
        assert_relative_eq!(quantile(&values, 0.75).unwrap(), 3.25);
        assert!(quantile(&values, 1.5).is_none());
        assert!(quantile(&[], 0.5).is_none());
    }

    #[test]
    fn test_max_drawdown() {
        // wealth: 1.1, 0.99, 1.089 -> worst 0.99 / 1.1 - 1 = -0.1
        let dd = max_drawdown(&[0.10, -0.10, 0.10]).unwrap();
        assert_relative_eq!(dd, -0.1, epsilon = 1e-12);

        assert_relative_eq!(max_drawdown(&[0.01, 0.02]).unwrap(), 0.0);
        assert!(max_drawdown(&[]).is_none());
    }

    #[test]
    fn test_max_drawdown_ignores_initial_loss() {
        // The first wealth value is its own peak.
        assert_relative_eq!(max_drawdown(&[-0.5]).unwrap(), 0.0);
    }
}
