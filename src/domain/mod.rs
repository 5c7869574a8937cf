//! Tabular shapes shared across the loader, processing stages and analysis.

pub mod table;
pub mod value;

pub use table::{ColumnType, Table};
pub use value::Value;

use serde::{Deserialize, Serialize};

/// A resolved point for a location key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}
