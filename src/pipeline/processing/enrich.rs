use indexmap::IndexMap;
use polars::prelude::{DataFrame, DataFrameJoinOps, JoinType, NamedFrom, Series};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::ports::Geocoder;
use crate::config::GeocoderConfig;
use crate::constants::{
    DEFAULT_COUNTRY, DEPARTMENT_COLUMN, LATITUDE_COLUMN, LOCATION_KEY_COLUMN, LONGITUDE_COLUMN,
    MUNICIPALITY_COLUMN,
};
use crate::domain::{Coordinates, Table, Value};
use crate::error::Result;
use crate::infra::rate_limiter::RateLimiter;
use crate::observability::metrics;

/// The two text columns a location key is built from, plus the country suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationColumns {
    pub municipality: String,
    pub department: String,
    pub country: String,
}

impl Default for LocationColumns {
    fn default() -> Self {
        Self {
            municipality: MUNICIPALITY_COLUMN.to_string(),
            department: DEPARTMENT_COLUMN.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

impl From<&GeocoderConfig> for LocationColumns {
    fn from(config: &GeocoderConfig) -> Self {
        Self {
            municipality: config.municipality_column.clone(),
            department: config.department_column.clone(),
            country: config.country.clone(),
        }
    }
}

impl LocationColumns {
    /// `"{municipality}, {department}, {country}"`, or `None` when either part is null.
    pub fn location_key(&self, municipality: &Value, department: &Value) -> Option<String> {
        if municipality.is_null() || department.is_null() {
            return None;
        }
        Some(format!("{}, {}, {}", municipality, department, self.country))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnrichOutcome {
    Enriched,
    /// The table lacked a key column and was returned unchanged
    MissingColumns { missing: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichReport {
    pub outcome: EnrichOutcome,
    pub rows: usize,
    pub distinct_keys: usize,
    /// External calls made; always equal to `distinct_keys` when enriched
    pub lookups: usize,
    pub resolved: usize,
    /// Lookups that errored (counted as unresolved, not fatal)
    pub failed: usize,
}

/// Attaches approximate coordinates to every row from its location key.
///
/// Each distinct key is looked up once, in first-seen order, with the rate
/// limiter consulted before every call. Results are left-joined back so the
/// table keeps its row count and order; misses and failed lookups give null
/// coordinates.
pub struct GeocodingEnricher {
    geocoder: Box<dyn Geocoder>,
    limiter: RateLimiter,
    columns: LocationColumns,
}

impl GeocodingEnricher {
    pub fn new(geocoder: Box<dyn Geocoder>, limiter: RateLimiter, columns: LocationColumns) -> Self {
        Self {
            geocoder,
            limiter,
            columns,
        }
    }

    pub fn enrich(&self, table: &mut Table) -> Result<EnrichReport> {
        let missing: Vec<String> = [&self.columns.municipality, &self.columns.department]
            .into_iter()
            .filter(|c| !table.has_column(c))
            .cloned()
            .collect();
        if !missing.is_empty() {
            warn!(
                "Table does not contain required columns: {}",
                missing.join(", ")
            );
            return Ok(EnrichReport {
                outcome: EnrichOutcome::MissingColumns { missing },
                rows: table.n_rows(),
                distinct_keys: 0,
                lookups: 0,
                resolved: 0,
                failed: 0,
            });
        }

        let municipality = table.column_values(&self.columns.municipality)?;
        let department = table.column_values(&self.columns.department)?;
        let keys: Vec<Option<String>> = municipality
            .iter()
            .zip(&department)
            .map(|(m, d)| self.columns.location_key(m, d))
            .collect();

        let lookup = self.resolve(keys.iter().flatten().map(String::as_str));

        let mut frame = table.frame().clone();
        for name in [LOCATION_KEY_COLUMN, LATITUDE_COLUMN, LONGITUDE_COLUMN] {
            if table.has_column(name) {
                frame = frame.drop(name)?;
            }
        }
        frame.with_column(Series::new(LOCATION_KEY_COLUMN, keys))?;
        let joined = frame.join(
            &lookup.to_frame()?,
            [LOCATION_KEY_COLUMN],
            [LOCATION_KEY_COLUMN],
            JoinType::Left.into(),
        )?;
        *table = Table::from_frame(joined)?;

        let report = EnrichReport {
            outcome: EnrichOutcome::Enriched,
            rows: table.n_rows(),
            distinct_keys: lookup.coordinates.len(),
            lookups: lookup.lookups,
            resolved: lookup.coordinates.values().filter(|c| c.is_some()).count(),
            failed: lookup.failed,
        };
        info!(
            rows = report.rows,
            distinct_keys = report.distinct_keys,
            resolved = report.resolved,
            failed = report.failed,
            "Geocoding enrichment finished"
        );
        Ok(report)
    }

    /// Look up each distinct key once, serialized behind the rate limiter.
    pub fn resolve<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> GeocodeLookup {
        let mut coordinates: IndexMap<String, Option<Coordinates>> = IndexMap::new();
        for key in keys {
            coordinates.entry(key.to_string()).or_insert(None);
        }

        let mut lookups = 0;
        let mut failed = 0;
        for (key, slot) in coordinates.iter_mut() {
            let waited = self.limiter.acquire();
            metrics::geocode::rate_limit_wait(waited.as_secs_f64());
            metrics::geocode::lookup();
            lookups += 1;
            match self.geocoder.geocode(key) {
                Ok(Some(coords)) => {
                    metrics::geocode::hit();
                    debug!(
                        location = %key,
                        latitude = coords.latitude,
                        longitude = coords.longitude,
                        "Location resolved"
                    );
                    *slot = Some(coords);
                }
                Ok(None) => {
                    metrics::geocode::miss();
                    debug!(location = %key, "No match for location");
                }
                Err(e) => {
                    metrics::geocode::error();
                    failed += 1;
                    warn!(location = %key, "Geocoding failed: {:#}", e);
                }
            }
        }

        GeocodeLookup {
            coordinates,
            lookups,
            failed,
        }
    }
}

/// Distinct location keys (first-seen order) mapped to their lookup result.
#[derive(Debug, Clone, Default)]
pub struct GeocodeLookup {
    pub coordinates: IndexMap<String, Option<Coordinates>>,
    pub lookups: usize,
    pub failed: usize,
}

impl GeocodeLookup {
    /// One row per distinct key with its coordinates, ready to join on the key column.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let keys: Vec<Option<String>> = self.coordinates.keys().cloned().map(Some).collect();
        let latitudes: Vec<Option<f64>> = self
            .coordinates
            .values()
            .map(|c| c.map(|c| c.latitude))
            .collect();
        let longitudes: Vec<Option<f64>> = self
            .coordinates
            .values()
            .map(|c| c.map(|c| c.longitude))
            .collect();
        Ok(DataFrame::new(vec![
            Series::new(LOCATION_KEY_COLUMN, keys),
            Series::new(LATITUDE_COLUMN, latitudes),
            Series::new(LONGITUDE_COLUMN, longitudes),
        ])?)
    }
}
