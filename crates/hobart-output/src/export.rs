//! Export of datasets and the JSON bundle.
//!
//! Datasets are written as CSV, JSON or Parquet. [`BundleWriter`] lays out the
//! bundle directory consumed by downstream dashboards and by
//! [`validate_bundle`](crate::validate_bundle).

use crate::dataset::{COUNT_FIELDS, Dataset, RegimeRow};
use hobart_data::DataError;
use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parquet writing error.
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    /// Table writing error.
    #[error(transparent)]
    Data(#[from] DataError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,

    /// Apache Parquet; file output only.
    Parquet,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
            Self::Parquet => "parquet",
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the format is binary.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn csv_into_string(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

impl Dataset {
    /// Polars frame with an ISO `date` column and one nullable column per key.
    pub fn to_dataframe(&self) -> Result<DataFrame, ExportError> {
        let columns = self.columns();
        let mut out = Vec::with_capacity(columns.len() + 1);
        let dates: Vec<String> = self
            .rows()
            .iter()
            .map(|r| r.date.format("%Y-%m-%d").to_string())
            .collect();
        out.push(Column::new("date".into(), dates));
        for key in &columns {
            let values: Vec<Option<f64>> = self.rows().iter().map(|r| r.get(key)).collect();
            if COUNT_FIELDS.contains(&key.as_str()) {
                let counts: Vec<Option<i64>> =
                    values.iter().map(|v| v.map(|v| v as i64)).collect();
                out.push(Column::new(key.as_str().into(), counts));
            } else {
                out.push(Column::new(key.as_str().into(), values));
            }
        }
        Ok(DataFrame::new(out)?)
    }
}

impl Exporter for Dataset {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let columns = self.columns();
                let mut wtr = csv::Writer::from_writer(vec![]);
                let mut header = vec!["date".to_string()];
                header.extend(columns.iter().cloned());
                wtr.write_record(&header)?;
                for row in self.rows() {
                    let mut record = vec![row.date.format("%Y-%m-%d").to_string()];
                    record.extend(
                        columns
                            .iter()
                            .map(|k| row.get(k).map(|v| v.to_string()).unwrap_or_default()),
                    );
                    wtr.write_record(&record)?;
                }
                csv_into_string(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self.rows())?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self.rows())?),
            ExportFormat::Parquet => Err(ExportError::InvalidFormat(
                "parquet is a binary format, export to a file instead".to_string(),
            )),
        }
    }

    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        if format == ExportFormat::Parquet {
            let mut df = self.to_dataframe()?;
            let mut file = File::create(path)?;
            ParquetWriter::new(&mut file).finish(&mut df)?;
            return Ok(());
        }
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl Exporter for Vec<RegimeRow> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for row in self {
                    wtr.serialize(row)?;
                }
                csv_into_string(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
            ExportFormat::Parquet => Err(ExportError::InvalidFormat(
                "parquet is a binary format, export to a file instead".to_string(),
            )),
        }
    }

    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        if format == ExportFormat::Parquet {
            let mut df = regimes_to_dataframe(self)?;
            let mut file = File::create(path)?;
            ParquetWriter::new(&mut file).finish(&mut df)?;
            return Ok(());
        }
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

/// Polars frame of classified dates: `date`, `regime`, `ret`, `vol`, `vol_thresh`.
pub fn regimes_to_dataframe(rows: &[RegimeRow]) -> Result<DataFrame, ExportError> {
    let dates: Vec<String> = rows
        .iter()
        .map(|r| r.date.format("%Y-%m-%d").to_string())
        .collect();
    let labels: Vec<String> = rows.iter().map(|r| r.regime.to_string()).collect();
    let column = |name: &str, f: fn(&RegimeRow) -> f64| {
        Column::new(name.into(), rows.iter().map(f).collect::<Vec<f64>>())
    };
    Ok(DataFrame::new(vec![
        Column::new("date".into(), dates),
        Column::new("regime".into(), labels),
        column("ret", |r| r.ret),
        column("vol", |r| r.vol),
        column("vol_thresh", |r| r.vol_thresh),
    ])?)
}

/// Writes files into a bundle directory.
#[derive(Debug, Clone)]
pub struct BundleWriter {
    dir: PathBuf,
}

impl BundleWriter {
    /// Create the writer, creating `dir` if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Bundle directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write any serializable value as pretty JSON to `<name>.json`.
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<PathBuf, ExportError> {
        let path = self.dir.join(format!("{name}.json"));
        let mut json = serde_json::to_string_pretty(value)?;
        json.push('\n');
        std::fs::write(&path, json)?;
        tracing::debug!(path = %path.display(), "wrote json");
        Ok(path)
    }

    /// Write a dataset as `<dataset name>.<ext>`.
    pub fn write_dataset(
        &self,
        dataset: &Dataset,
        format: ExportFormat,
    ) -> Result<PathBuf, ExportError> {
        let path = self
            .dir
            .join(format!("{}.{}", dataset.name(), format.extension()));
        dataset.export_to_file(&path, format)?;
        tracing::debug!(path = %path.display(), rows = dataset.len(), "wrote dataset");
        Ok(path)
    }

    /// Write a modeling frame or return table as Parquet under `frames/`.
    pub fn write_table(&self, table: &hobart_data::ReturnTable) -> Result<PathBuf, ExportError> {
        let path = self
            .dir
            .join("frames")
            .join(format!("{}.parquet", table.name()));
        hobart_data::write_table(table, &path)?;
        Ok(path)
    }
}
