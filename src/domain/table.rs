use polars::prelude::{BooleanChunked, DataFrame, DataType, NamedFrom, NewChunkedArray, Series};
use serde::ser::{Error as _, SerializeStruct};
use serde::{Serialize, Serializer};

use super::value::{is_null_literal, Value};
use crate::error::{PipelineError, Result};

/// Inferred type of a column. After coercion every column is either a
/// `Float64` or a `String` series; one with only nulls reports `Empty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    Text,
    Empty,
}

impl ColumnType {
    pub fn of(series: &Series) -> Self {
        if series.null_count() == series.len() {
            ColumnType::Empty
        } else if series.dtype() == &DataType::String {
            ColumnType::Text
        } else {
            ColumnType::Number
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnType::Number => "number",
            ColumnType::Text => "text",
            ColumnType::Empty => "empty",
        };
        f.write_str(name)
    }
}

/// The record table flowing through the pipeline, backed by a polars
/// [`DataFrame`] whose columns are all `Float64` or `String`.
#[derive(Debug, Clone, Default)]
pub struct Table {
    frame: DataFrame,
}

impl Table {
    /// Wrap a frame, coercing its columns to the table's two dtypes.
    pub fn from_frame(frame: DataFrame) -> Result<Self> {
        let mut table = Self { frame };
        table.coerce_column_types()?;
        Ok(table)
    }

    /// Build a table from row-major cells. Column types are inferred the
    /// same way as for loaded data.
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(PipelineError::DuplicateColumn(name.clone()));
            }
        }
        if let Some(row) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(PipelineError::RowArity {
                expected: columns.len(),
                found: row.len(),
            });
        }

        let series: Vec<Series> = columns
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let values: Vec<Value> = rows.iter().map(|row| row[index].clone()).collect();
                series_from_values(name, &values)
            })
            .collect();
        Self::from_frame(DataFrame::new(series)?)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub(crate) fn frame_mut(&mut self) -> &mut DataFrame {
        &mut self.frame
    }

    pub fn columns(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn n_rows(&self) -> usize {
        self.frame.height()
    }

    pub fn n_columns(&self) -> usize {
        self.frame.width()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_columns())
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    /// Resolve a column or fail with [`PipelineError::MissingColumn`].
    pub fn require_column(&self, name: &str) -> Result<&Series> {
        self.frame
            .column(name)
            .map_err(|_| PipelineError::MissingColumn(name.to_string()))
    }

    pub fn column_type(&self, name: &str) -> Result<ColumnType> {
        self.require_column(name).map(ColumnType::of)
    }

    pub fn column_values(&self, name: &str) -> Result<Vec<Value>> {
        series_values(self.require_column(name)?)
    }

    /// Row-major copy of every cell.
    pub fn rows(&self) -> Result<Vec<Vec<Value>>> {
        let columns = self
            .frame
            .get_columns()
            .iter()
            .map(series_values)
            .collect::<Result<Vec<_>>>()?;
        Ok((0..self.n_rows())
            .map(|row| columns.iter().map(|c| c[row].clone()).collect())
            .collect())
    }

    /// Replace the named column in place, or append it when absent.
    pub fn set_column(&mut self, name: &str, values: &[Value]) -> Result<()> {
        if self.n_columns() > 0 && values.len() != self.n_rows() {
            return Err(PipelineError::RowArity {
                expected: self.n_rows(),
                found: values.len(),
            });
        }
        self.frame.with_column(series_from_values(name, values))?;
        Ok(())
    }

    pub fn head(&self, n: usize) -> Table {
        Table {
            frame: self.frame.head(Some(n)),
        }
    }

    /// Keep the rows whose mask entry is true.
    pub fn filter_rows(&self, mask: &[bool]) -> Result<Table> {
        let mask = BooleanChunked::from_slice("mask", mask);
        Ok(Table {
            frame: self.frame.filter(&mask)?,
        })
    }

    /// Bring every column to `Float64` or `String`.
    ///
    /// A string column whose non-null cells all parse as numbers becomes
    /// `Float64`, with NaN-ish literals mapped to null. Numeric and all-null
    /// columns become `Float64`; anything else is cast to `String`.
    pub fn coerce_column_types(&mut self) -> Result<()> {
        let coerced = self
            .frame
            .get_columns()
            .iter()
            .map(coerce_series)
            .collect::<Result<Vec<_>>>()?;
        self.frame = DataFrame::new(coerced)?;
        Ok(())
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.columns() == other.columns() && self.rows().ok() == other.rows().ok()
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let rows = self.rows().map_err(S::Error::custom)?;
        let mut state = serializer.serialize_struct("Table", 2)?;
        state.serialize_field("columns", &self.columns())?;
        state.serialize_field("rows", &rows)?;
        state.end()
    }
}

/// Cells of a series as [`Value`]s.
pub fn series_values(series: &Series) -> Result<Vec<Value>> {
    match series.dtype() {
        DataType::String => Ok(series
            .str()?
            .into_iter()
            .map(|v| v.map(Value::text).unwrap_or(Value::Null))
            .collect()),
        DataType::Float64 => Ok(series
            .f64()?
            .into_iter()
            .map(|v| v.map(Value::number).unwrap_or(Value::Null))
            .collect()),
        DataType::Null => Ok(vec![Value::Null; series.len()]),
        dtype if dtype.is_numeric() => series_values(&series.cast(&DataType::Float64)?),
        _ => series_values(&series.cast(&DataType::String)?),
    }
}

/// A `String` series when any cell is text, otherwise `Float64`.
pub fn series_from_values(name: &str, values: &[Value]) -> Series {
    if values.iter().any(|v| matches!(v, Value::Text(_))) {
        let cells: Vec<Option<String>> = values
            .iter()
            .map(|v| (!v.is_null()).then(|| v.to_string()))
            .collect();
        Series::new(name, cells)
    } else {
        let cells: Vec<Option<f64>> = values.iter().map(Value::as_f64).collect();
        Series::new(name, cells)
    }
}

fn coerce_series(series: &Series) -> Result<Series> {
    let name = series.name();
    match series.dtype() {
        DataType::String => {
            let cells = series.str()?;
            let parsed: Option<Vec<Option<f64>>> = cells
                .into_iter()
                .map(|cell| match cell {
                    None => Some(None),
                    Some(raw) if is_null_literal(raw.trim()) => Some(None),
                    Some(raw) => match Value::parse_field(raw) {
                        Value::Number(n) => Some(Some(n)),
                        _ => None,
                    },
                })
                .collect();
            Ok(match parsed {
                Some(numbers) => Series::new(name, numbers),
                None => series.clone(),
            })
        }
        DataType::Null => Ok(Series::new(name, vec![None::<f64>; series.len()])),
        dtype if dtype.is_numeric() => {
            let cast = series.cast(&DataType::Float64)?;
            let finite: Vec<Option<f64>> = cast
                .f64()?
                .into_iter()
                .map(|v| v.filter(|n| n.is_finite()))
                .collect();
            Ok(Series::new(name, finite))
        }
        _ => Ok(series.cast(&DataType::String)?),
    }
}
