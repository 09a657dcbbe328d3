//! Integration tests for regime classification and the regime summary.

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use hobart_data::stats::max_drawdown;
use hobart_data::{ModelingFrame, TimeSeries};
use hobart_exposure::{RollingConfig, RollingRegression, attribute};
use hobart_regime::{Regime, RegimeClassifier, RegimeConfig, RegimeError, summarize};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;

fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2018, 1, 5).unwrap();
    (0..n).map(|i| start + Duration::weeks(i as i64)).collect()
}

/// Deterministic weekly returns whose amplitude doubles from week 61.
fn broken_series(n: usize) -> TimeSeries {
    let values = (0..n)
        .map(|t| {
            let scale = if t >= 60 { 2.0 } else { 1.0 };
            0.01 * scale * (2.3 * t as f64).sin()
        })
        .collect();
    TimeSeries::new("portfolio", dates(n), values).unwrap()
}

fn break_config() -> RegimeConfig {
    RegimeConfig {
        vol_window: 8,
        lookback: 52,
        percentile: 0.75,
    }
}

#[test]
fn stress_follows_volatility_break() {
    let series = broken_series(120);
    let regimes = RegimeClassifier::new(break_config())
        .unwrap()
        .classify(&series)
        .unwrap();

    assert_eq!(regimes.len(), 61);
    assert_eq!(regimes.records()[0].date, series.dates()[59]);

    let index = |date: NaiveDate| series.dates().iter().position(|d| *d == date).unwrap();
    for record in regimes.records() {
        let t = index(record.date);
        if t <= 60 {
            assert_eq!(record.regime, Regime::Calm, "week index {t}");
        }
        if (61..=81).contains(&t) {
            assert_eq!(record.regime, Regime::Stress, "week index {t}");
        }
    }
    assert_relative_eq!(regimes.stress_fraction().unwrap(), 37.0 / 61.0, epsilon = 1e-12);
}

#[rstest]
#[case(0.5)]
#[case(0.75)]
#[case(0.9)]
fn labels_follow_inclusive_threshold(#[case] percentile: f64) {
    let series = broken_series(120);
    let config = RegimeConfig {
        percentile,
        ..break_config()
    };
    let regimes = RegimeClassifier::new(config)
        .unwrap()
        .classify(&series)
        .unwrap();
    assert!(!regimes.is_empty());
    for record in regimes.records() {
        assert_eq!(
            record.regime.is_stress(),
            record.volatility >= record.threshold
        );
    }
}

#[test]
fn future_returns_never_change_past_labels() {
    let mut rng = StdRng::seed_from_u64(7);
    let n = 160;
    let base: Vec<f64> = (0..n).map(|_| rng.gen_range(-0.02..0.02)).collect();
    let cut = 110;
    let mut shocked = base.clone();
    for value in shocked.iter_mut().skip(cut) {
        *value = rng.gen_range(-0.15..0.15);
    }

    let classifier = RegimeClassifier::new(break_config()).unwrap();
    let a = classifier.classify_values(&dates(n), &base).unwrap();
    let b = classifier.classify_values(&dates(n), &shocked).unwrap();
    assert_eq!(a.len(), b.len());

    let cut_date = dates(n)[cut];
    let mut compared = 0;
    for (ra, rb) in a.records().iter().zip(b.records()) {
        if ra.date < cut_date {
            assert_eq!(ra, rb);
            compared += 1;
        }
    }
    assert_eq!(compared, cut - break_config().warmup());
}

#[test]
fn non_finite_returns_are_dropped() {
    let mut values: Vec<f64> = broken_series(120).values().to_vec();
    values[10] = f64::NAN;
    let series = TimeSeries::new("portfolio", dates(120), values).unwrap();
    let regimes = RegimeClassifier::new(break_config())
        .unwrap()
        .classify(&series)
        .unwrap();
    assert_eq!(regimes.len(), 60);
    assert!(regimes.records().iter().all(|r| r.volatility.is_finite()));
}

fn sleeve_frame(n: usize) -> ModelingFrame {
    let returns = broken_series(n);
    let x = Array2::from_shape_fn((n, 2), |(i, j)| {
        let base = returns.values()[i];
        base * (0.9 - 0.5 * j as f64) + 0.004 * ((i * (j + 2)) as f64 * 0.61).cos()
    });
    let y = Array1::from(returns.values().to_vec());
    ModelingFrame::new(
        "total_macro",
        dates(n),
        "Y",
        y,
        vec!["SPY".into(), "TLT".into()],
        x,
    )
    .unwrap()
}

#[test]
fn summary_partitions_joined_rows() {
    let n = 120;
    let frame = sleeve_frame(n);
    let exposures = RollingRegression::new(RollingConfig::new(26, 26, 2).unwrap())
        .fit(&frame)
        .unwrap();
    let attribution = attribute(&frame, &exposures).unwrap();
    let regimes = RegimeClassifier::new(break_config())
        .unwrap()
        .classify(&broken_series(n))
        .unwrap();

    let summary = summarize(&exposures, &attribution, &regimes).unwrap();

    // Regimes start at index 59, attribution at 26: the join is the regime range.
    assert_eq!(summary.observations(), regimes.len());
    assert_eq!(summary.stress_fraction, regimes.stress_fraction());

    let stress_dates: Vec<NaiveDate> = regimes
        .with_regime(Regime::Stress)
        .map(|r| r.date)
        .collect();
    assert_eq!(summary.stress.observations, stress_dates.len());

    let manual_beta = stress_dates
        .iter()
        .map(|d| exposures.get(*d).unwrap().coefficients[0])
        .sum::<f64>()
        / stress_dates.len() as f64;
    assert_relative_eq!(
        summary.stress.mean_coefficients["SPY"],
        manual_beta,
        epsilon = 1e-12
    );

    let calm_returns: Vec<f64> = regimes
        .with_regime(Regime::Calm)
        .map(|r| r.portfolio_return)
        .collect();
    assert_eq!(summary.calm.max_drawdown, max_drawdown(&calm_returns));
    assert!(summary.calm.max_drawdown.unwrap() <= 0.0);

    let stress_vol = summary.stress.mean_volatility.unwrap();
    let calm_vol = summary.calm.mean_volatility.unwrap();
    assert!(stress_vol > calm_vol);
    assert_eq!(summary.get(Regime::Stress), &summary.stress);
}

#[test]
fn summary_rejects_mismatched_sleeves() {
    let n = 120;
    let frame = sleeve_frame(n);
    let exposures = RollingRegression::new(RollingConfig::new(26, 26, 2).unwrap())
        .fit(&frame)
        .unwrap();
    let renamed = ModelingFrame::new(
        "equity_us",
        frame.dates().to_vec(),
        "Y",
        frame.target().clone(),
        frame.regressor_names().to_vec(),
        frame.regressors().clone(),
    )
    .unwrap();
    let other = RollingRegression::new(RollingConfig::new(26, 26, 2).unwrap())
        .fit(&renamed)
        .unwrap();
    let attribution = attribute(&renamed, &other).unwrap();
    let regimes = RegimeClassifier::try_default()
        .unwrap()
        .classify(&broken_series(n))
        .unwrap();

    assert!(matches!(
        summarize(&exposures, &attribution, &regimes),
        Err(RegimeError::SleeveMismatch { .. })
    ));
}

#[test]
fn empty_regimes_give_empty_summary() {
    let n = 60;
    let frame = sleeve_frame(n);
    let exposures = RollingRegression::new(RollingConfig::new(26, 26, 2).unwrap())
        .fit(&frame)
        .unwrap();
    let attribution = attribute(&frame, &exposures).unwrap();
    let regimes = RegimeClassifier::try_default()
        .unwrap()
        .classify(&broken_series(n))
        .unwrap();

    let summary = summarize(&exposures, &attribution, &regimes).unwrap();
    assert_eq!(summary.observations(), 0);
    assert!(summary.stress_fraction.is_none());
    assert!(summary.calm.mean_coefficients.is_empty());
    assert!(summary.stress.max_drawdown.is_none());
}
