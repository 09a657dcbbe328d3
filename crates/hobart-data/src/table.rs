//! Date-indexed numeric tables.
//!
//! Both [`TimeSeries`] and [`ReturnTable`] enforce a strictly increasing, unique
//! date index at construction. Missing observations are stored as `NaN`; the
//! frame builder is responsible for removing them before any model sees the data.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use ndarray::{Array2, Axis};

/// Check that `dates` is strictly increasing.
pub(crate) fn check_index(table: &str, dates: &[NaiveDate]) -> Result<()> {
    for (i, pair) in dates.windows(2).enumerate() {
        if pair[1] == pair[0] {
            return Err(DataError::DuplicateDate {
                table: table.to_string(),
                date: pair[1].to_string(),
            });
        }
        if pair[1] < pair[0] {
            return Err(DataError::UnsortedDates {
                table: table.to_string(),
                position: i + 1,
            });
        }
    }
    Ok(())
}

/// Merge-join two sorted date indexes.
///
/// Returns `(left_position, right_position)` pairs for every date present in
/// both inputs, in ascending date order.
pub fn intersect_dates(left: &[NaiveDate], right: &[NaiveDate]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::with_capacity(left.len().min(right.len()));
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                pairs.push((i, j));
                i += 1;
                j += 1;
            }
        }
    }
    pairs
}

/// A single named series on a date index.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a series, validating the date index.
    pub fn new(name: impl Into<String>, dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if dates.len() != values.len() {
            return Err(DataError::ShapeMismatch {
                table: name,
                expected: dates.len(),
                actual: values.len(),
            });
        }
        check_index(&name, &dates)?;
        Ok(Self {
            name,
            dates,
            values,
        })
    }

    /// Series name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Date index.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Values aligned with [`Self::dates`].
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of observations.
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no observations.
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(date, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Value on `date`, if the date is in the index.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| self.values[i])
    }

    /// Drop non-finite observations.
    pub fn dropna(&self) -> Self {
        let (dates, values): (Vec<_>, Vec<_>) = self.iter().filter(|(_, v)| v.is_finite()).unzip();
        Self {
            name: self.name.clone(),
            dates,
            values,
        }
    }

    /// Rename the series.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A date-indexed table of named numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnTable {
    name: String,
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Array2<f64>,
}

impl ReturnTable {
    /// Create a table from a `dates x columns` matrix.
    pub fn new(
        name: impl Into<String>,
        dates: Vec<NaiveDate>,
        columns: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self> {
        let name = name.into();
        if values.nrows() != dates.len() {
            return Err(DataError::ShapeMismatch {
                table: name,
                expected: dates.len(),
                actual: values.nrows(),
            });
        }
        if values.ncols() != columns.len() {
            return Err(DataError::ShapeMismatch {
                table: name,
                expected: columns.len(),
                actual: values.ncols(),
            });
        }
        check_index(&name, &dates)?;
        Ok(Self {
            name,
            dates,
            columns,
            values,
        })
    }

    /// Create a table from `(column name, values)` pairs.
    pub fn from_columns(
        name: impl Into<String>,
        dates: Vec<NaiveDate>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self> {
        let name = name.into();
        let n = dates.len();
        let mut values = Array2::<f64>::zeros((n, columns.len()));
        let mut names = Vec::with_capacity(columns.len());
        for (j, (column, data)) in columns.into_iter().enumerate() {
            if data.len() != n {
                return Err(DataError::ShapeMismatch {
                    table: format!("{name}.{column}"),
                    expected: n,
                    actual: data.len(),
                });
            }
            for (i, v) in data.into_iter().enumerate() {
                values[[i, j]] = v;
            }
            names.push(column);
        }
        Self::new(name, dates, names, values)
    }

    /// Table name, used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Date index.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Raw `dates x columns` matrix.
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Position of a column.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Columns from `wanted` that are absent from this table.
    pub fn missing_columns<S: AsRef<str>>(&self, wanted: &[S]) -> Vec<String> {
        wanted
            .iter()
            .map(AsRef::as_ref)
            .filter(|c| self.column_index(c).is_none())
            .map(str::to_string)
            .collect()
    }

    /// Extract one column as a series.
    pub fn column(&self, column: &str) -> Result<TimeSeries> {
        let j = self
            .column_index(column)
            .ok_or_else(|| DataError::missing_columns(&self.name, vec![column.to_string()]))?;
        Ok(TimeSeries {
            name: column.to_string(),
            dates: self.dates.clone(),
            values: self.values.column(j).to_vec(),
        })
    }

    /// Keep only the listed columns, in the listed order.
    pub fn select<S: AsRef<str>>(&self, wanted: &[S]) -> Result<Self> {
        let missing = self.missing_columns(wanted);
        if !missing.is_empty() {
            return Err(DataError::missing_columns(&self.name, missing));
        }
        let indices: Vec<usize> = wanted
            .iter()
            .filter_map(|c| self.column_index(c.as_ref()))
            .collect();
        Ok(Self {
            name: self.name.clone(),
            dates: self.dates.clone(),
            columns: wanted.iter().map(|c| c.as_ref().to_string()).collect(),
            values: self.values.select(Axis(1), &indices),
        })
    }

    /// Keep only the rows at `rows` (must be ascending).
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            dates: rows.iter().map(|&i| self.dates[i]).collect(),
            columns: self.columns.clone(),
            values: self.values.select(Axis(0), rows),
        }
    }

    /// Drop every row holding a non-finite value.
    pub fn drop_incomplete(&self) -> Self {
        let rows: Vec<usize> = self
            .values
            .outer_iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|v| v.is_finite()))
            .map(|(i, _)| i)
            .collect();
        self.take_rows(&rows)
    }

    /// Rename the table.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
