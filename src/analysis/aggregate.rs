use std::fmt;
use std::str::FromStr;

use polars::prelude::{col, Expr, IdxSize, IntoLazy, SortMultipleOptions};
use serde::{Deserialize, Serialize};

use super::MetricsComputer;
use crate::constants::DEFAULT_TOP_N;
use crate::domain::{ColumnType, Table};
use crate::error::{PipelineError, Result};

/// Aggregation applied to the rows of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    /// Non-null values
    Count,
    /// Rows, nulls included
    Size,
    Sum,
    Mean,
    Median,
    Std,
    Min,
    Max,
    Nunique,
    /// First non-null value
    First,
    /// Last non-null value
    Last,
}

impl AggFunc {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggFunc::Count => "count",
            AggFunc::Size => "size",
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Median => "median",
            AggFunc::Std => "std",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Nunique => "nunique",
            AggFunc::First => "first",
            AggFunc::Last => "last",
        }
    }

    pub fn requires_numeric(&self) -> bool {
        matches!(
            self,
            AggFunc::Sum | AggFunc::Mean | AggFunc::Median | AggFunc::Std
        )
    }

    /// The polars expression computing this function over `source` within a group.
    pub fn expr(&self, source: &str) -> Expr {
        let values = col(source);
        match self {
            AggFunc::Count => values.count(),
            AggFunc::Size => values.len(),
            AggFunc::Sum => values.sum(),
            AggFunc::Mean => values.mean(),
            AggFunc::Median => values.median(),
            AggFunc::Std => values.std(1),
            AggFunc::Min => values.min(),
            AggFunc::Max => values.max(),
            AggFunc::Nunique => values.drop_nulls().n_unique(),
            AggFunc::First => values.drop_nulls().first(),
            AggFunc::Last => values.drop_nulls().last(),
        }
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggFunc {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let func = match s.trim().to_ascii_lowercase().as_str() {
            "count" => AggFunc::Count,
            "size" => AggFunc::Size,
            "sum" => AggFunc::Sum,
            "mean" | "avg" => AggFunc::Mean,
            "median" => AggFunc::Median,
            "std" => AggFunc::Std,
            "min" => AggFunc::Min,
            "max" => AggFunc::Max,
            "nunique" => AggFunc::Nunique,
            "first" => AggFunc::First,
            "last" => AggFunc::Last,
            other => {
                return Err(PipelineError::Aggregation(format!(
                    "unknown aggregation function '{}'",
                    other
                )))
            }
        };
        Ok(func)
    }
}

/// One output column of a grouped table: `output = function(source)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedAggregation {
    pub output: String,
    pub source: String,
    pub function: AggFunc,
}

impl NamedAggregation {
    pub fn new(output: impl Into<String>, function: AggFunc, source: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            source: source.into(),
            function,
        }
    }
}

/// Parses `output=function:source`, e.g. `total=sum:producci_n_t`.
impl FromStr for NamedAggregation {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            PipelineError::Aggregation(format!(
                "expected 'output=function:source', got '{}'",
                s
            ))
        };
        let (output, rest) = s.split_once('=').ok_or_else(invalid)?;
        let (function, source) = rest.split_once(':').ok_or_else(invalid)?;
        let (output, source) = (output.trim(), source.trim());
        if output.is_empty() || source.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(output, function.parse()?, source))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Descending,
    Ascending,
}

/// What to group by, what to compute, and how to rank the groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub group_by: Vec<String>,
    pub aggregations: Vec<NamedAggregation>,
    pub sort_by: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default)]
    pub order: SortOrder,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

impl AggregationSpec {
    pub fn new<S: Into<String>>(
        group_by: impl IntoIterator<Item = S>,
        aggregations: Vec<NamedAggregation>,
        sort_by: impl Into<String>,
    ) -> Self {
        Self {
            group_by: group_by.into_iter().map(Into::into).collect(),
            aggregations,
            sort_by: sort_by.into(),
            top_n: DEFAULT_TOP_N,
            order: SortOrder::Descending,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    fn output_columns(&self) -> Vec<String> {
        self.group_by
            .iter()
            .cloned()
            .chain(self.aggregations.iter().map(|a| a.output.clone()))
            .collect()
    }
}

impl<'a> MetricsComputer<'a> {
    /// Group, aggregate, rank and truncate according to `spec`.
    ///
    /// Rows with a null in any group-by column are dropped. Groups are ranked
    /// by `spec.sort_by` (descending unless the spec says otherwise, nulls
    /// last); equal values fall back to the group-by columns ascending.
    pub fn grouped_table(&self, spec: &AggregationSpec) -> Result<Table> {
        let table = self.table;
        if spec.group_by.is_empty() {
            return Err(PipelineError::Aggregation(
                "at least one group-by column is required".to_string(),
            ));
        }
        for column in &spec.group_by {
            table.require_column(column)?;
        }
        for agg in &spec.aggregations {
            if agg.function.requires_numeric() && table.column_type(&agg.source)? == ColumnType::Text {
                return Err(PipelineError::Aggregation(format!(
                    "'{}' needs a numeric column but '{}' holds text",
                    agg.function, agg.source
                )));
            }
        }

        let output_columns = spec.output_columns();
        for (i, name) in output_columns.iter().enumerate() {
            if output_columns[..i].contains(name) {
                return Err(PipelineError::DuplicateColumn(name.clone()));
            }
        }
        if !output_columns.contains(&spec.sort_by) {
            return Err(PipelineError::Aggregation(format!(
                "sort column '{}' is not one of the output columns",
                spec.sort_by
            )));
        }

        let keys: Vec<Expr> = spec.group_by.iter().map(|c| col(c)).collect();
        let aggregations: Vec<Expr> = spec
            .aggregations
            .iter()
            .map(|agg| agg.function.expr(&agg.source).alias(&agg.output))
            .collect();
        let ranking: Vec<Expr> = std::iter::once(col(&spec.sort_by))
            .chain(keys.iter().cloned())
            .collect();
        let descending: Vec<bool> = std::iter::once(spec.order == SortOrder::Descending)
            .chain(spec.group_by.iter().map(|_| false))
            .collect();
        let limit = IdxSize::try_from(spec.top_n).unwrap_or(IdxSize::MAX);

        let grouped = table
            .frame()
            .clone()
            .lazy()
            .drop_nulls(Some(keys.clone()))
            .group_by(keys)
            .agg(aggregations)
            .sort_by_exprs(
                ranking,
                SortMultipleOptions::default()
                    .with_order_descending_multi(descending)
                    .with_nulls_last(true),
            )
            .limit(limit)
            .collect()?;
        Table::from_frame(grouped)
    }
}
