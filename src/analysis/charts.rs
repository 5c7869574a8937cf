//! Summary tables shaped for the external plotting layer.

use serde::Serialize;

use super::aggregate::{AggFunc, AggregationSpec, NamedAggregation, SortOrder};
use polars::prelude::DataType;

use super::MetricsComputer;
use crate::domain::{ColumnType, Table, Value};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Pearson correlation between numeric columns; `None` where undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

impl<'a> MetricsComputer<'a> {
    /// Mean of `value_column` per category, highest first.
    pub fn mean_by_category(&self, category: &str, value_column: &str, top_n: usize) -> Result<Table> {
        let spec = AggregationSpec::new(
            [category],
            vec![NamedAggregation::new(value_column, AggFunc::Mean, value_column)],
            value_column,
        )
        .with_top_n(top_n);
        self.grouped_table(&spec)
    }

    /// Row count and mean of `value_column` per category, lowest mean first.
    pub fn category_profile(&self, category: &str, value_column: &str, top_n: usize) -> Result<Table> {
        let mean_column = format!("mean_{}", value_column);
        let spec = AggregationSpec::new(
            [category],
            vec![
                NamedAggregation::new("count", AggFunc::Count, category),
                NamedAggregation::new(mean_column.clone(), AggFunc::Mean, value_column),
            ],
            mean_column,
        )
        .with_top_n(top_n)
        .with_order(SortOrder::Ascending);
        self.grouped_table(&spec)
    }

    /// Equal-width bins over a numeric column, optionally restricted to an
    /// inclusive `(min, max)` range. The last bin includes its upper edge.
    pub fn histogram(&self, column: &str, range: Option<(f64, f64)>, bins: usize) -> Result<Vec<HistogramBin>> {
        if bins == 0 {
            return Err(PipelineError::Aggregation("histogram needs at least one bin".to_string()));
        }
        if self.table.column_type(column)? == ColumnType::Text {
            return Err(PipelineError::Aggregation(format!(
                "histogram needs a numeric column but '{}' holds text",
                column
            )));
        }
        if let Some((lo, hi)) = range {
            if lo > hi {
                return Err(PipelineError::Aggregation(format!(
                    "histogram range is inverted: {} > {}",
                    lo, hi
                )));
            }
        }

        let values: Vec<f64> = numeric_values(self.table, column)?
            .into_iter()
            .flatten()
            .filter(|v| range.map_or(true, |(lo, hi)| *v >= lo && *v <= hi))
            .collect();
        if values.is_empty() {
            return Ok(Vec::new());
        }

        let (mut lo, mut hi) = range.unwrap_or_else(|| {
            values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
        });
        if hi <= lo {
            lo -= 0.5;
            hi += 0.5;
        }
        let width = (hi - lo) / bins as f64;

        let mut counts = vec![0usize; bins];
        for v in values {
            let slot = (((v - lo) / width).floor() as usize).min(bins - 1);
            counts[slot] += 1;
        }
        Ok(counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: lo + width * i as f64,
                upper: if i + 1 == bins { hi } else { lo + width * (i + 1) as f64 },
                count,
            })
            .collect())
    }

    /// Pairwise-complete Pearson correlation across every numeric column.
    pub fn correlation_matrix(&self) -> Result<CorrelationMatrix> {
        let columns: Vec<String> = self
            .table
            .frame()
            .get_columns()
            .iter()
            .filter(|s| s.dtype() == &DataType::Float64)
            .map(|s| s.name().to_string())
            .collect();
        let data = columns
            .iter()
            .map(|c| numeric_values(self.table, c))
            .collect::<Result<Vec<_>>>()?;
        let values = data
            .iter()
            .map(|a| data.iter().map(|b| pearson(a, b)).collect())
            .collect();
        Ok(CorrelationMatrix { columns, values })
    }
}

fn numeric_values(table: &Table, column: &str) -> Result<Vec<Option<f64>>> {
    Ok(table
        .column_values(column)?
        .iter()
        .map(Value::as_f64)
        .collect())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();
    if xs.len() < 2 {
        return None;
    }
    let (mx, my) = (mean(&xs), mean(&ys));
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(&ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx) * (x - mx);
        vy += (y - my) * (y - my);
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some((cov / (vx * vy).sqrt()).clamp(-1.0, 1.0))
}
