//! End-to-end tests of the modeling pipeline and its bundle.

use approx::assert_abs_diff_eq;
use chrono::{Duration, NaiveDate};
use hobart::data::{ReturnTable, write_table};
use hobart::output::validate_bundle;
use hobart::{DEFAULT_TICKERS, HobartError, Inputs, ModelConfig, Pipeline};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;
use std::collections::BTreeMap;
use std::path::PathBuf;

const WEEKS: usize = 200;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hobart-pipeline-{name}-{}", std::process::id()));
    std::fs::remove_dir_all(&dir).ok();
    dir
}

fn fridays(offset: usize, n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2018, 1, 5).unwrap();
    (offset..offset + n)
        .map(|i| start + Duration::weeks(i as i64))
        .collect()
}

fn factor_table(name: &str, rng: &mut StdRng, offset: usize, n: usize) -> ReturnTable {
    let mut column = |scale: f64| -> Vec<f64> {
        (0..n).map(|_| rng.gen_range(-scale..scale)).collect()
    };
    let columns = vec![
        ("MKT_RF".to_string(), column(0.02)),
        ("SMB".to_string(), column(0.01)),
        ("HML".to_string(), column(0.01)),
        ("RF".to_string(), vec![0.0002; n]),
    ];
    ReturnTable::from_columns(name, fridays(offset, n), columns).unwrap()
}

/// Ten ETFs driven by the US market factor, with volatility doubling from week 140.
fn inputs() -> Inputs {
    let mut rng = StdRng::seed_from_u64(7);
    let us = factor_table("ff3_us", &mut rng, 0, WEEKS);
    let devx = factor_table("ff3_devx", &mut rng, 10, WEEKS - 10);

    let mut values = Array2::<f64>::zeros((WEEKS, DEFAULT_TICKERS.len()));
    for i in 0..WEEKS {
        let scale = if i >= 140 { 2.0 } else { 1.0 };
        let market = us.values()[[i, 0]];
        for j in 0..DEFAULT_TICKERS.len() {
            let beta = 0.4 + 0.1 * j as f64;
            values[[i, j]] = scale * (beta * market + rng.gen_range(-0.01..0.01));
        }
    }
    let returns = ReturnTable::new(
        "returns",
        fridays(0, WEEKS),
        DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
        values,
    )
    .unwrap();

    Inputs::new(
        returns,
        BTreeMap::from([("ff3_us".to_string(), us), ("ff3_devx".to_string(), devx)]),
    )
}

#[test]
fn pipeline_models_every_sleeve() {
    let config = ModelConfig::default();
    let mut seen = Vec::new();
    let output = Pipeline::new(&config)
        .run_with(&inputs(), |sleeve| seen.push(sleeve.name.clone()))
        .unwrap();

    assert_eq!(seen, vec!["equity_us", "equity_intl", "total_macro"]);
    assert_eq!(output.regimes.len(), WEEKS - 111);
    assert!(output.regimes.stress_fraction().unwrap() > 0.0);

    let us = output.sleeve("equity_us").unwrap();
    assert_eq!(us.frame.len(), WEEKS);
    assert_eq!(us.exposures.len(), 2);
    assert_eq!(us.primary().window(), 52);
    assert_eq!(us.primary().len(), WEEKS - 51);
    assert_eq!(us.window(26).unwrap().len(), WEEKS - 25);
    assert_eq!(us.attribution.len(), WEEKS - 52);
    assert_eq!(us.summary.observations(), WEEKS - 111);

    let intl = output.sleeve("equity_intl").unwrap();
    assert_eq!(intl.frame.len(), WEEKS - 10);
    assert_eq!(intl.primary().len(), WEEKS - 10 - 51);
    assert_eq!(intl.summary.observations(), WEEKS - 111);

    let total = output.sleeve("total_macro").unwrap();
    assert_eq!(total.frame.n_regressors(), 5);
    assert_eq!(total.primary().len(), WEEKS - 51);
}

#[test]
fn attribution_uses_previous_exposures() {
    let config = ModelConfig::default();
    let output = Pipeline::new(&config).run(&inputs()).unwrap();
    let us = output.sleeve("equity_us").unwrap();

    for record in us.attribution.records() {
        let t = us.frame.position(record.date).unwrap();
        assert_eq!(record.exposure_date, us.frame.dates()[t - 1]);

        let exposure = us.primary().get(record.exposure_date).unwrap();
        let x = us.frame.regressor_row(t);
        let explained = exposure.intercept
            + exposure
                .coefficients
                .iter()
                .zip(x.iter())
                .map(|(b, v)| b * v)
                .sum::<f64>();
        assert_abs_diff_eq!(record.explained, explained, epsilon = 1e-12);
        assert_abs_diff_eq!(
            record.realized,
            record.explained + record.residual,
            epsilon = 1e-12
        );
    }
}

#[test]
fn bundle_validates_and_reruns_are_identical() {
    let config = ModelConfig::default();
    let inputs = inputs();
    let first = temp_dir("first");
    let second = temp_dir("second");

    let manifest = Pipeline::new(&config)
        .run(&inputs)
        .unwrap()
        .write_bundle(&first, &config, None)
        .unwrap();
    Pipeline::new(&config)
        .run(&inputs)
        .unwrap()
        .write_bundle(&second, &config, None)
        .unwrap();

    assert!(manifest.git_commit.is_none());
    assert_eq!(manifest.config["frequency"], "W-FRI");
    for file in [
        "meta.json",
        "regimes.json",
        "regime_summary.json",
        "portfolio_summary.json",
        "exposures_equity_us.json",
        "attribution_equity_us.json",
        "exposures_total_macro.json",
        "attribution_equity_intl.json",
    ] {
        let a = std::fs::read(first.join(file)).unwrap();
        let b = std::fs::read(second.join(file)).unwrap();
        assert_eq!(a, b, "{file} differs between runs");
    }
    assert!(first.join("exposures_equity_us_w26.parquet").exists());
    assert!(!first.join("exposures_equity_us_w26.json").exists());
    assert!(first.join("frames").join("equity_intl.parquet").exists());
    assert!(first.join("regimes.parquet").exists());

    let report = validate_bundle(&first).unwrap();
    assert_eq!(report.sleeves.len(), 3);
    for sleeve in report.sleeves.values() {
        assert_eq!(sleeve.aligned.exposures, WEEKS - 111);
        assert_eq!(sleeve.raw.regimes, WEEKS - 111);
    }

    std::fs::remove_dir_all(&first).ok();
    std::fs::remove_dir_all(&second).ok();
}

#[rstest]
#[case(vec![], 1)]
#[case(vec![26], 2)]
#[case(vec![26, 52, 104], 3)]
fn extra_windows_are_fitted(#[case] windows: Vec<usize>, #[case] expected: usize) {
    let mut config = ModelConfig::default();
    config.rolling.windows = windows;
    let output = Pipeline::new(&config).run(&inputs()).unwrap();
    for sleeve in &output.sleeves {
        assert_eq!(sleeve.exposures.len(), expected);
        assert_eq!(sleeve.primary().window(), 52);
        assert!(sleeve.exposures.windows(2).all(|w| w[0].window() < w[1].window()));
    }
}

#[test]
fn missing_factor_table_is_reported() {
    let config = ModelConfig::default();
    let mut inputs = inputs();
    inputs.factors.remove("ff3_devx");
    match Pipeline::new(&config).run(&inputs).unwrap_err() {
        HobartError::MissingFactorTable { sleeve, table } => {
            assert_eq!(sleeve, "equity_intl");
            assert_eq!(table, "ff3_devx");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn inputs_load_from_files() {
    let dir = temp_dir("inputs");
    std::fs::create_dir_all(&dir).unwrap();
    let original = inputs();
    write_table(&original.returns, &dir.join("returns.csv")).unwrap();
    let mut paths = BTreeMap::new();
    for (name, table) in &original.factors {
        let path = dir.join(format!("{name}.parquet"));
        write_table(table, &path).unwrap();
        paths.insert(name.clone(), path);
    }

    let loaded = Inputs::load(&dir.join("returns.csv"), &paths).unwrap();
    assert_eq!(loaded.returns.name(), "returns");
    assert_eq!(loaded.returns.columns(), original.returns.columns());
    assert_eq!(loaded.returns.dates(), original.returns.dates());
    assert_eq!(loaded.factors["ff3_devx"].nrows(), WEEKS - 10);

    let output = Pipeline::new(&ModelConfig::default()).run(&loaded).unwrap();
    assert_eq!(output.sleeves.len(), 3);

    std::fs::remove_dir_all(&dir).ok();
}
