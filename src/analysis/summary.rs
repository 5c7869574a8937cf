use std::collections::HashSet;

use polars::prelude::{
    ChunkAgg, ChunkQuantile, ChunkVar, DataType, IntoLazy, NamedFrom, QuantileInterpolOptions,
    Series, UniqueKeepStrategy,
};
use serde::Serialize;

use super::MetricsComputer;
use crate::domain::{ColumnType, Table};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub non_null: usize,
    pub dtype: ColumnType,
    pub memory_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    pub rows: usize,
    pub columns: usize,
    pub memory_bytes: usize,
    pub columns_info: Vec<ColumnInfo>,
}

/// Descriptive statistics for one numeric column. Undefined statistics
/// (an empty column, or `std` with fewer than two values) are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub q50: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// A per-column percentage, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnRatio {
    pub column: String,
    pub percent: f64,
}

impl ColumnRatio {
    /// Render as `"0.0%"`, `"50.0%"`, `"33.33%"`.
    pub fn display(&self) -> String {
        if self.percent.fract() == 0.0 {
            format!("{:.1}%", self.percent)
        } else {
            format!("{}%", self.percent)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnCount {
    pub column: String,
    pub count: usize,
}

impl<'a> MetricsComputer<'a> {
    /// Non-null counts, inferred types and polars' estimate of the memory held per column.
    pub fn info(&self) -> TableInfo {
        let columns_info: Vec<ColumnInfo> = self
            .table
            .frame()
            .get_columns()
            .iter()
            .map(|series| ColumnInfo {
                name: series.name().to_string(),
                non_null: series.len() - series.null_count(),
                dtype: ColumnType::of(series),
                memory_bytes: series.estimated_size(),
            })
            .collect();
        TableInfo {
            rows: self.table.n_rows(),
            columns: self.table.n_columns(),
            memory_bytes: columns_info.iter().map(|c| c.memory_bytes).sum(),
            columns_info,
        }
    }

    /// count / mean / std / min / quartiles / max for every numeric column.
    /// Columns holding only nulls are listed with a count of zero.
    pub fn describe(&self) -> Result<Vec<NumericSummary>> {
        self.table
            .frame()
            .get_columns()
            .iter()
            .filter(|series| series.dtype() == &DataType::Float64)
            .map(|series| {
                let values = series.f64()?;
                let count = series.len() - series.null_count();
                Ok(NumericSummary {
                    column: series.name().to_string(),
                    count,
                    mean: finite(values.mean()),
                    std: if count < 2 { None } else { finite(values.std(1)) },
                    min: values.min(),
                    q25: finite(values.quantile(0.25, QuantileInterpolOptions::Linear)?),
                    q50: finite(values.quantile(0.5, QuantileInterpolOptions::Linear)?),
                    q75: finite(values.quantile(0.75, QuantileInterpolOptions::Linear)?),
                    max: values.max(),
                })
            })
            .collect()
    }

    /// Rows identical across all columns to an earlier row, in table order.
    pub fn duplicate_rows(&self) -> Result<Table> {
        let table = self.table;
        if table.n_columns() == 0 || table.is_empty() {
            return Ok(table.head(0));
        }
        let columns = table.columns();
        let positions: Vec<u64> = (0..table.n_rows() as u64).collect();

        let mut indexed = table.frame().clone();
        indexed.with_column(Series::new(ROW_INDEX_COLUMN, positions))?;
        let first_seen = indexed
            .lazy()
            .unique_stable(Some(columns), UniqueKeepStrategy::First)
            .collect()?;
        let kept: HashSet<u64> = first_seen
            .column(ROW_INDEX_COLUMN)?
            .u64()?
            .into_iter()
            .flatten()
            .collect();

        let mask: Vec<bool> = (0..table.n_rows() as u64)
            .map(|row| !kept.contains(&row))
            .collect();
        table.filter_rows(&mask)
    }

    /// Percentage of null cells per column.
    pub fn missing_values(&self) -> Vec<ColumnRatio> {
        self.ratio_per_column(|series| series.null_count())
    }

    /// Percentage of cells exactly equal to numeric zero, for every column.
    pub fn zero_values(&self) -> Vec<ColumnRatio> {
        self.ratio_per_column(|series| match series.f64() {
            Ok(values) => values.into_iter().filter(|v| *v == Some(0.0)).count(),
            Err(_) => 0,
        })
    }

    /// Number of distinct non-null values per column.
    pub fn unique_values(&self) -> Result<Vec<ColumnCount>> {
        self.table
            .frame()
            .get_columns()
            .iter()
            .map(|series| {
                Ok(ColumnCount {
                    column: series.name().to_string(),
                    count: series.drop_nulls().n_unique()?,
                })
            })
            .collect()
    }

    fn ratio_per_column(&self, hits: impl Fn(&Series) -> usize) -> Vec<ColumnRatio> {
        let rows = self.table.n_rows();
        self.table
            .frame()
            .get_columns()
            .iter()
            .map(|series| {
                let percent = if rows == 0 {
                    0.0
                } else {
                    round2(hits(series) as f64 / rows as f64 * 100.0)
                };
                ColumnRatio {
                    column: series.name().to_string(),
                    percent,
                }
            })
            .collect()
    }
}

const ROW_INDEX_COLUMN: &str = "__row_index";

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Value;

    fn sample() -> Table {
        let rows = [
            (Some("Cali"), Some(1.0), Some(0.0)),
            (Some("Pasto"), Some(2.0), None),
            (Some("Cali"), Some(1.0), Some(0.0)),
            (None, Some(4.0), Some(8.0)),
        ]
        .into_iter()
        .map(|(m, a, p)| vec![Value::from(m), Value::from(a), Value::from(p)])
        .collect();
        Table::from_rows(["municipio", "area", "produccion"], rows).unwrap()
    }

    fn single_column(values: &[Option<f64>]) -> Table {
        let rows = values.iter().map(|v| vec![Value::from(*v)]).collect();
        Table::from_rows(["x"], rows).unwrap()
    }

    #[test]
    fn test_info() {
        let table = sample();
        let info = MetricsComputer::new(&table).info();
        assert_eq!(info.rows, 4);
        assert_eq!(info.columns, 3);
        assert_eq!(info.columns_info[0].non_null, 3);
        assert_eq!(info.columns_info[0].dtype, ColumnType::Text);
        assert_eq!(info.columns_info[2].dtype, ColumnType::Number);
        assert_eq!(info.columns_info[2].non_null, 3);
        assert!(info.columns_info.iter().all(|c| c.memory_bytes > 0));
        assert_eq!(
            info.memory_bytes,
            info.columns_info.iter().map(|c| c.memory_bytes).sum::<usize>()
        );
    }

    #[test]
    fn test_describe_numeric_only() {
        let table = sample();
        let summaries = MetricsComputer::new(&table).describe().unwrap();
        assert_eq!(summaries.len(), 2);

        let area = &summaries[0];
        assert_eq!(area.column, "area");
        assert_eq!(area.count, 4);
        assert_eq!(area.mean, Some(2.0));
        assert_eq!(area.min, Some(1.0));
        assert_eq!(area.q25, Some(1.0));
        assert_eq!(area.q50, Some(1.5));
        assert_eq!(area.q75, Some(2.5));
        assert_eq!(area.max, Some(4.0));
        let std = area.std.unwrap();
        assert!((std - 1.4142135623730951).abs() < 1e-12);

        assert_eq!(summaries[1].count, 3);
    }

    #[test]
    fn test_describe_single_value_has_no_std() {
        let table = single_column(&[Some(3.0)]);
        let summary = &MetricsComputer::new(&table).describe().unwrap()[0];
        assert_eq!(summary.std, None);
        assert_eq!(summary.q75, Some(3.0));
    }

    #[test]
    fn test_describe_lists_all_null_columns_with_zero_count() {
        let table = Table::from_rows(
            ["x", "vacio"],
            vec![vec![Value::from(1.0), Value::Null], vec![Value::from(3.0), Value::Null]],
        )
        .unwrap();
        let summaries = MetricsComputer::new(&table).describe().unwrap();
        assert_eq!(summaries.len(), 2);
        let empty = &summaries[1];
        assert_eq!(empty.column, "vacio");
        assert_eq!(empty.count, 0);
        assert_eq!(empty.mean, None);
        assert_eq!(empty.std, None);
        assert_eq!(empty.min, None);
        assert_eq!(empty.q50, None);
        assert_eq!(empty.max, None);
    }

    #[test]
    fn test_duplicate_rows_reports_later_occurrences() {
        let table = sample();
        let dups = MetricsComputer::new(&table).duplicate_rows().unwrap();
        assert_eq!(dups.n_rows(), 1);
        assert_eq!(dups.rows().unwrap()[0][0], Value::from("Cali"));
        assert_eq!(dups.columns(), table.columns());
    }

    #[test]
    fn test_duplicate_rows_treat_nulls_as_equal() {
        let table = single_column(&[None, Some(1.0), None, Some(1.0), Some(2.0)]);
        let dups = MetricsComputer::new(&table).duplicate_rows().unwrap();
        assert_eq!(
            dups.column_values("x").unwrap(),
            vec![Value::Null, Value::Number(1.0)]
        );
    }

    #[test]
    fn test_missing_values() {
        let table = sample();
        let missing = MetricsComputer::new(&table).missing_values();
        assert_eq!(missing[0].percent, 25.0);
        assert_eq!(missing[0].display(), "25.0%");
        assert_eq!(missing[1].percent, 0.0);
        assert_eq!(missing[1].display(), "0.0%");
        assert!(missing.iter().all(|r| (0.0..=100.0).contains(&r.percent)));
    }

    #[test]
    fn test_missing_values_rounding() {
        let table = single_column(&[None, Some(1.0), Some(2.0)]);
        let missing = MetricsComputer::new(&table).missing_values();
        assert_eq!(missing[0].percent, 33.33);
        assert_eq!(missing[0].display(), "33.33%");
    }

    #[test]
    fn test_zero_values_include_text_columns() {
        let table = sample();
        let zeros = MetricsComputer::new(&table).zero_values();
        assert_eq!(zeros[0].display(), "0.0%");
        assert_eq!(zeros[1].percent, 0.0);
        assert_eq!(zeros[2].percent, 50.0);
    }

    #[test]
    fn test_empty_table_ratios() {
        let table = Table::from_rows(["x"], vec![]).unwrap();
        let computer = MetricsComputer::new(&table);
        assert_eq!(computer.missing_values()[0].percent, 0.0);
        assert_eq!(computer.zero_values()[0].percent, 0.0);
        assert_eq!(computer.duplicate_rows().unwrap().n_rows(), 0);
    }

    #[test]
    fn test_unique_values_ignore_nulls() {
        let table = sample();
        let unique = MetricsComputer::new(&table).unique_values().unwrap();
        assert_eq!(unique[0].count, 2);
        assert_eq!(unique[1].count, 3);
        assert_eq!(unique[2].count, 2);
    }
}
