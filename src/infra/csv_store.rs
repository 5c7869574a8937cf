use std::fs::{self, File};
use std::path::Path;

use polars::prelude::{CsvReadOptions, CsvWriter, SerReader, SerWriter};
use tracing::{error, info};

use crate::domain::Table;
use crate::error::Result;
use crate::observability::metrics;

/// Write the table as comma-delimited UTF-8 with a header row and no index column.
/// Nulls are written as empty fields; missing parent directories are created.
pub fn write_csv(table: &Table, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    let mut frame = table.frame().clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut frame)?;
    Ok(())
}

/// Best-effort save: failures are logged, never raised.
pub fn save_csv(table: &Table, path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match write_csv(table, path) {
        Ok(()) => {
            metrics::persist::write_success(table.n_rows());
            info!(path = %path.display(), rows = table.n_rows(), "Data saved");
            true
        }
        Err(e) => {
            metrics::persist::write_error();
            error!(path = %path.display(), "Error saving data: {}", e);
            false
        }
    }
}

/// Read a CSV written by [`write_csv`] (or any headed CSV), inferring column types.
///
/// Every field is read as text first so that the table's own coercion decides
/// which columns are numeric.
pub fn read_csv(path: impl AsRef<Path>) -> Result<Table> {
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
        .finish()?;
    Table::from_frame(frame)
}
