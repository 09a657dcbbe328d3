//! Integration tests for rolling exposures and lagged attribution.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use chrono::{Duration, NaiveDate};
use hobart_data::ModelingFrame;
use hobart_exposure::{
    ExposureError, RollingConfig, RollingRegression, attribute, fit_windows,
};
use ndarray::{Array1, Array2};
use rstest::rstest;

fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
    (0..n).map(|i| start + Duration::weeks(i as i64)).collect()
}

fn regressors(n: usize) -> Array2<f64> {
    Array2::from_shape_fn((n, 3), |(i, j)| {
        let phase = (i as f64) * (0.7 + 0.45 * j as f64) + j as f64;
        0.02 * phase.sin()
    })
}

/// Target with known loadings plus a small deterministic disturbance.
fn frame(n: usize, noise: f64) -> ModelingFrame {
    let x = regressors(n);
    let y: Array1<f64> = (0..n)
        .map(|i| {
            0.0005 + 1.1 * x[[i, 0]] - 0.4 * x[[i, 1]] + 0.25 * x[[i, 2]]
                + noise * ((i as f64) * 2.9).cos()
        })
        .collect();
    ModelingFrame::new(
        "equity_us",
        dates(n),
        "Y",
        y,
        vec!["MKT_RF".into(), "SMB".into(), "HML".into()],
        x,
    )
    .unwrap()
}

#[rstest]
#[case(120, 52)]
#[case(60, 26)]
#[case(52, 52)]
#[case(30, 52)]
fn record_count_matches_full_windows(#[case] n: usize, #[case] window: usize) {
    let frame = frame(n, 0.001);
    let exposures = RollingRegression::new(RollingConfig::new(window, window, 3).unwrap())
        .fit(&frame)
        .unwrap();

    assert_eq!(exposures.len(), (n + 1).saturating_sub(window));
    if let Some(first) = exposures.records().first() {
        assert_eq!(first.date, frame.dates()[window - 1]);
        assert_eq!(first.nobs, window);
    }
    assert!(exposures.records().windows(2).all(|w| w[0].date < w[1].date));
}

#[test]
fn noiseless_target_recovers_loadings() {
    let frame = frame(80, 0.0);
    let exposures = RollingRegression::new(RollingConfig::default())
        .fit(&frame)
        .unwrap();
    for record in exposures.records() {
        assert_relative_eq!(record.intercept, 0.0005, epsilon = 1e-10);
        assert_relative_eq!(record.coefficients[0], 1.1, epsilon = 1e-8);
        assert_relative_eq!(record.coefficients[1], -0.4, epsilon = 1e-8);
        assert_relative_eq!(record.coefficients[2], 0.25, epsilon = 1e-8);
        assert_relative_eq!(record.r_squared, 1.0, epsilon = 1e-8);
    }
    let path = exposures.coefficient("SMB").unwrap();
    assert_eq!(path.len(), exposures.len());
    assert!(exposures.coefficient("MOM").is_none());
}

#[test]
fn missing_rows_reduce_observations() {
    let n = 20;
    let mut y: Array1<f64> = (0..n).map(|i| 0.01 * (i % 4) as f64 + 0.002).collect();
    for i in 3..=5 {
        y[i] = f64::NAN;
    }
    let x = Array2::from_shape_fn((n, 1), |(i, _)| 0.01 * (i % 4) as f64);
    let names = vec!["SPY".to_string()];

    let exposures = RollingRegression::new(RollingConfig::new(10, 8, 1).unwrap())
        .fit_arrays("raw", &dates(n), y.view(), x.view(), &names)
        .unwrap();

    assert_eq!(exposures.len(), 7);
    assert_eq!(exposures.records()[0].date, dates(n)[13]);
    assert_eq!(exposures.records()[0].nobs, 8);
    assert_eq!(exposures.records()[1].nobs, 9);
    assert_eq!(exposures.records()[2].nobs, 10);
}

#[test]
fn rank_deficient_windows_are_skipped() {
    let n = 40;
    let x = Array2::from_shape_fn((n, 1), |(i, _)| {
        if i < 15 { 0.01 } else { 0.01 * (i % 5) as f64 }
    });
    let y: Array1<f64> = (0..n).map(|i| 0.003 * ((i * 7) % 5) as f64).collect();
    let frame = ModelingFrame::new("macro", dates(n), "Y", y, vec!["TLT".into()], x).unwrap();

    let exposures = RollingRegression::new(RollingConfig::new(10, 10, 1).unwrap())
        .fit(&frame)
        .unwrap();
    assert_eq!(exposures.len(), n - 9 - 6);
    assert_eq!(exposures.records()[0].date, frame.dates()[15]);
}

#[test]
fn attribution_skips_the_date_after_a_skipped_window() {
    // The proxy is flat on rows 10..=15, so only the window ending at row 15
    // is collinear with the intercept.
    let (n, window, skipped) = (30, 6, 15);
    let x = Array2::from_shape_fn((n, 1), |(i, _)| {
        if (skipped + 1 - window..=skipped).contains(&i) {
            0.01
        } else {
            0.02 * (0.9 * i as f64 + 0.3).sin()
        }
    });
    let y: Array1<f64> = (0..n)
        .map(|i| 0.001 + 0.5 * x[[i, 0]] + 0.002 * (2.9 * i as f64).cos())
        .collect();
    let frame = ModelingFrame::new("macro", dates(n), "Y", y, vec!["TLT".into()], x).unwrap();

    let exposures = RollingRegression::new(RollingConfig::new(window, window, 1).unwrap())
        .fit(&frame)
        .unwrap();
    assert_eq!(exposures.len(), n - window + 1 - 1);
    assert!(exposures.get(frame.dates()[skipped]).is_none());
    assert!(exposures.get(frame.dates()[skipped - 1]).is_some());
    assert!(exposures.get(frame.dates()[skipped + 1]).is_some());

    let attribution = attribute(&frame, &exposures).unwrap();
    assert_eq!(attribution.len(), n - window - 1);

    let at_skipped = attribution.get(frame.dates()[skipped]).unwrap();
    assert_eq!(at_skipped.exposure_date, frame.dates()[skipped - 1]);
    let exposure = exposures.get(frame.dates()[skipped - 1]).unwrap();
    assert_abs_diff_eq!(
        at_skipped.explained,
        exposure.intercept + exposure.coefficients[0] * 0.01,
        epsilon = 1e-15
    );

    assert!(attribution.get(frame.dates()[skipped + 1]).is_none());
    let resumed = attribution.get(frame.dates()[skipped + 2]).unwrap();
    assert_eq!(resumed.exposure_date, frame.dates()[skipped + 1]);
    assert!(
        attribution
            .records()
            .iter()
            .all(|r| r.exposure_date != frame.dates()[skipped])
    );
}

#[test]
fn window_too_short_for_regressors_is_rejected() {
    let frame = frame(30, 0.001);
    let err = RollingRegression::new(RollingConfig {
        window: 3,
        min_obs: 3,
    })
    .fit(&frame)
    .unwrap_err();
    assert!(matches!(err, ExposureError::InvalidConfig(_)));
    assert!(!err.is_recoverable());
}

#[test]
fn multiple_windows_share_min_obs() {
    let frame = frame(100, 0.001);
    let series = fit_windows(&frame, &[26, 52], 45).unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].window(), 26);
    assert_eq!(series[0].min_obs(), 26);
    assert_eq!(series[0].len(), 75);
    assert_eq!(series[1].window(), 52);
    assert_eq!(series[1].min_obs(), 45);
    assert_eq!(series[1].len(), 49);
}

#[test]
fn attribution_identity_and_lag() {
    let frame = frame(104, 0.002);
    let exposures = RollingRegression::new(RollingConfig::default())
        .fit(&frame)
        .unwrap();
    let attribution = attribute(&frame, &exposures).unwrap();

    assert_eq!(attribution.len(), 104 - 52);
    assert!(attribution.records()[0].date > exposures.records()[0].date);
    for r in attribution.records() {
        assert!((r.explained + r.residual - r.realized).abs() < 1e-10);
        let exposure = exposures.get(r.exposure_date).unwrap();
        let t = frame.position(r.date).unwrap();
        assert_eq!(frame.dates()[t - 1], r.exposure_date);
        let manual = exposure.intercept
            + exposure
                .coefficients
                .iter()
                .zip(frame.regressor_row(t).iter())
                .map(|(b, x)| b * x)
                .sum::<f64>();
        assert_abs_diff_eq!(r.explained, manual, epsilon = 1e-15);
        assert_eq!(r.contributions.len(), 3);
    }
}

#[test]
fn perturbing_a_return_does_not_change_earlier_attribution() {
    let base = frame(90, 0.002);
    let t = 70;
    let mut target = base.target().clone();
    target[t] += 0.05;
    let shocked = ModelingFrame::new(
        base.name(),
        base.dates().to_vec(),
        base.target_name(),
        target,
        base.regressor_names().to_vec(),
        base.regressors().clone(),
    )
    .unwrap();

    let engine = RollingRegression::new(RollingConfig::default());
    let a = attribute(&base, &engine.fit(&base).unwrap()).unwrap();
    let b = attribute(&shocked, &engine.fit(&shocked).unwrap()).unwrap();

    for (ra, rb) in a.records().iter().zip(b.records()) {
        let pos = base.position(ra.date).unwrap();
        if pos < t {
            assert_eq!(ra, rb);
        } else if pos == t {
            assert_eq!(ra.explained, rb.explained);
            assert_ne!(ra.residual, rb.residual);
        }
    }
}

#[test]
fn explained_share_is_absent_for_zero_return() {
    let n = 60;
    let x = regressors(n);
    let mut y: Array1<f64> = (0..n).map(|i| 0.9 * x[[i, 0]] + 0.001 * (i % 3) as f64).collect();
    y[55] = 0.0;
    let frame = ModelingFrame::new(
        "equity_us",
        dates(n),
        "Y",
        y,
        vec!["MKT_RF".into(), "SMB".into(), "HML".into()],
        x,
    )
    .unwrap();
    let exposures = RollingRegression::new(RollingConfig::default())
        .fit(&frame)
        .unwrap();
    let attribution = attribute(&frame, &exposures).unwrap();

    let zero = attribution.get(frame.dates()[55]).unwrap();
    assert!(zero.explained_share.is_none());
    let other = attribution.get(frame.dates()[56]).unwrap();
    assert_relative_eq!(
        other.explained_share.unwrap(),
        other.explained / other.realized,
        epsilon = 1e-12
    );
}
