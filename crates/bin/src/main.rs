//! Hobart CLI binary.
//!
//! Runs the exposure, attribution and regime model over local return tables
//! and writes a validated bundle.

use clap::{Parser, Subcommand};
use hobart::output::{git_commit, validate_bundle};
use hobart::{Inputs, ModelConfig, Pipeline};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hobart")]
#[command(about = "Hobart: rolling factor exposures, attribution and volatility regimes", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit every sleeve and write the bundle
    Run {
        /// Asset return table (CSV or Parquet)
        #[arg(long)]
        returns: PathBuf,

        /// Factor table as NAME=PATH; repeat for each table
        #[arg(long = "factors", value_parser = parse_factor_table)]
        factors: Vec<(String, PathBuf)>,

        /// Model configuration (TOML); defaults when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bundle directory
        #[arg(long, default_value = "out")]
        out: PathBuf,

        /// Print Markdown reports instead of tables
        #[arg(long)]
        markdown: bool,
    },

    /// Validate an existing bundle
    Validate {
        /// Bundle directory
        #[arg(long, default_value = "out")]
        dir: PathBuf,
    },

    /// Print the default configuration as TOML
    Config,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            returns,
            factors,
            config,
            out,
            markdown,
        } => {
            let config = match config {
                Some(path) => ModelConfig::load(&path)?,
                None => ModelConfig::default(),
            };
            let factors: BTreeMap<String, PathBuf> = factors.into_iter().collect();
            run_model(&config, &returns, &factors, &out, markdown)?;
        }
        Commands::Validate { dir } => validate(&dir)?,
        Commands::Config => print!("{}", ModelConfig::default().to_toml_string()?),
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},polars=warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_factor_table(raw: &str) -> Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got '{raw}'")),
    }
}

fn run_model(
    config: &ModelConfig,
    returns: &Path,
    factors: &BTreeMap<String, PathBuf>,
    out: &Path,
    markdown: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let inputs = Inputs::load(returns, factors)?;

    let pb = ProgressBar::new(config.sleeves.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.set_message("Modeling sleeves...");
    let output = Pipeline::new(config).run_with(&inputs, |sleeve| {
        pb.set_message(sleeve.name.clone());
        pb.inc(1);
    });
    let output = match output {
        Ok(output) => {
            pb.finish_with_message(format!("Modeled {} sleeves", output.sleeves.len()));
            output
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(e.into());
        }
    };

    println!("\nUniverse portfolio");
    println!("==================");
    println!("{}", output.portfolio);
    for sleeve in &output.sleeves {
        let report = sleeve.report();
        if markdown {
            println!("\n{}", report.to_markdown());
        } else {
            println!("{}", report.to_ascii_table());
        }
    }

    let manifest = output.write_bundle(out, config, git_commit(Path::new(".")))?;
    tracing::info!(
        commit = manifest.git_commit.as_deref().unwrap_or("none"),
        "stamped manifest"
    );
    validate(out)
}

fn validate(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let report = validate_bundle(dir)?;
    println!("\nValidated {}", report.data_dir);
    for (sleeve, counts) in &report.sleeves {
        println!(
            "  {:16} exposures {:4}  attribution {:4}  aligned {:4}",
            sleeve, counts.raw.exposures, counts.raw.attribution, counts.aligned.exposures
        );
    }
    Ok(())
}
