//! Read-only descriptive metrics over a [`Table`].
//!
//! Everything here borrows the table immutably and returns new values or
//! tables; rendering is left to whoever consumes the results.

pub mod aggregate;
pub mod charts;
pub mod summary;

use serde::Serialize;

use crate::domain::Table;
use crate::error::Result;

pub use aggregate::{AggFunc, AggregationSpec, NamedAggregation, SortOrder};
pub use charts::{CorrelationMatrix, HistogramBin};
pub use summary::{ColumnCount, ColumnInfo, ColumnRatio, NumericSummary, TableInfo};

pub struct MetricsComputer<'a> {
    table: &'a Table,
}

/// The full set of per-table summaries, as emitted by the `profile` command.
#[derive(Debug, Clone, Serialize)]
pub struct TableProfile {
    pub head: Table,
    pub info: TableInfo,
    pub describe: Vec<NumericSummary>,
    pub duplicate_rows: Table,
    pub missing_values: Vec<ColumnRatio>,
    pub zero_values: Vec<ColumnRatio>,
    pub unique_values: Vec<ColumnCount>,
}

impl<'a> MetricsComputer<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self { table }
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Table {
        self.table.head(n)
    }

    pub fn profile(&self, head_rows: usize) -> Result<TableProfile> {
        Ok(TableProfile {
            head: self.head(head_rows),
            info: self.info(),
            describe: self.describe()?,
            duplicate_rows: self.duplicate_rows()?,
            missing_values: self.missing_values(),
            zero_values: self.zero_values(),
            unique_values: self.unique_values()?,
        })
    }
}
