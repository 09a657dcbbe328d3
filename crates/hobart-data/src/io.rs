//! Reading and writing return tables through polars.
//!
//! Tables on disk have a `date` column (ISO `YYYY-MM-DD`, or a polars `Date`)
//! followed by numeric columns. Nulls load as `NaN`. CSV and Parquet are
//! selected by file extension.

use crate::error::{DataError, Result};
use crate::table::ReturnTable;
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Name of the date column in every persisted table.
pub const DATE_COLUMN: &str = "date";

/// On-disk table formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Comma-separated values with a header row.
    Csv,
    /// Apache Parquet.
    Parquet,
}

impl TableFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("csv") => Ok(Self::Csv),
            Some("parquet" | "pq") => Ok(Self::Parquet),
            _ => Err(DataError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Load a table, sorting it by date.
pub fn read_table(path: &Path) -> Result<ReturnTable> {
    let df = match TableFormat::from_path(path)? {
        TableFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        TableFormat::Parquet => ParquetReader::new(File::open(path)?).finish()?,
    };
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string();
    let table = dataframe_to_table(&name, &df)?;
    tracing::info!(
        path = %path.display(),
        rows = table.nrows(),
        columns = table.ncols(),
        "loaded table"
    );
    Ok(table)
}

/// Write a table, creating parent directories as needed.
pub fn write_table(table: &ReturnTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut df = table_to_dataframe(table)?;
    let mut file = File::create(path)?;
    match TableFormat::from_path(path)? {
        TableFormat::Csv => CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)?,
        TableFormat::Parquet => {
            ParquetWriter::new(&mut file).finish(&mut df)?;
        }
    }
    tracing::debug!(path = %path.display(), rows = table.nrows(), "wrote table");
    Ok(())
}

/// Convert a polars frame into a [`ReturnTable`].
///
/// Rows are sorted by date before the index is validated, so unsorted files
/// load but duplicate dates are rejected.
pub fn dataframe_to_table(name: &str, df: &DataFrame) -> Result<ReturnTable> {
    let date_column = df.column(DATE_COLUMN).map_err(|_| {
        DataError::missing_columns(name, vec![DATE_COLUMN.to_string()])
    })?;
    let date_strings = date_column
        .as_materialized_series()
        .cast(&DataType::String)?;
    let mut dates = Vec::with_capacity(df.height());
    for value in date_strings.str()?.into_iter() {
        let raw = value.ok_or_else(|| DataError::Parse(format!("null date in {name}")))?;
        let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|e| DataError::Parse(format!("bad date '{raw}' in {name}: {e}")))?;
        dates.push(date);
    }

    let mut columns = Vec::new();
    for column in df.get_columns() {
        if column.name().as_str() == DATE_COLUMN {
            continue;
        }
        let values = column
            .as_materialized_series()
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect::<Vec<f64>>();
        columns.push((column.name().to_string(), values));
    }

    let mut order: Vec<usize> = (0..dates.len()).collect();
    order.sort_by_key(|&i| dates[i]);
    let sorted_dates = order.iter().map(|&i| dates[i]).collect();
    let sorted_columns = columns
        .into_iter()
        .map(|(c, v)| (c, order.iter().map(|&i| v[i]).collect()))
        .collect();
    ReturnTable::from_columns(name, sorted_dates, sorted_columns)
}

/// Convert a [`ReturnTable`] into a polars frame with an ISO date column.
pub fn table_to_dataframe(table: &ReturnTable) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(table.ncols() + 1);
    let dates: Vec<String> = table
        .dates()
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();
    columns.push(Column::new(DATE_COLUMN.into(), dates));
    for (j, name) in table.columns().iter().enumerate() {
        let values: Vec<Option<f64>> = table
            .values()
            .column(j)
            .iter()
            .map(|v| v.is_finite().then_some(*v))
            .collect();
        columns.push(Column::new(name.as_str().into(), values));
    }
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            TableFormat::from_path(Path::new("returns.csv")).unwrap(),
            TableFormat::Csv
        );
        assert_eq!(
            TableFormat::from_path(Path::new("frames/us.PARQUET")).unwrap(),
            TableFormat::Parquet
        );
        assert!(TableFormat::from_path(Path::new("returns.xlsx")).is_err());
    }

    #[test]
    fn test_dataframe_conversion_sorts_and_maps_nulls() {
        let df = DataFrame::new(vec![
            Column::new(DATE_COLUMN.into(), vec!["2024-01-12", "2024-01-05"]),
            Column::new("SPY".into(), vec![Some(0.02), None]),
        ])
        .unwrap();
        let table = dataframe_to_table("returns", &df).unwrap();
        assert_eq!(
            table.dates()[0],
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert!(table.values()[[0, 0]].is_nan());
        assert_eq!(table.values()[[1, 0]], 0.02);
    }

    #[test]
    fn test_table_round_trip_through_dataframe() {
        let table = ReturnTable::new(
            "returns",
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
            ],
            vec!["SPY".to_string()],
            array![[0.01], [f64::NAN]],
        )
        .unwrap();
        let df = table_to_dataframe(&table).unwrap();
        assert_eq!(df.height(), 2);
        let back = dataframe_to_table("returns", &df).unwrap();
        assert_eq!(back.dates(), table.dates());
        assert!(back.values()[[1, 0]].is_nan());
    }

    #[test]
    fn test_missing_date_column() {
        let df = DataFrame::new(vec![Column::new("SPY".into(), vec![0.01])]).unwrap();
        assert!(matches!(
            dataframe_to_table("returns", &df),
            Err(DataError::MissingColumns { .. })
        ));
    }
}
