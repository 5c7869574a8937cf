//! Simple metrics module for the pipeline
//!
//! Phases record through the `metrics` facade using the names in [`MetricName`].
//! `init` installs an in-process Prometheus recorder whose text snapshot can be
//! rendered at the end of a run. Without an installed recorder every call is a no-op.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Source metrics
    SourceRequestsSuccess,
    SourceRequestsError,
    SourceRequestDuration,
    SourceRowsLoaded,

    // Normalize metrics
    NormalizeValuesChanged,
    NormalizeColumnsProcessed,

    // Geocode metrics
    GeocodeLookups,
    GeocodeHits,
    GeocodeMisses,
    GeocodeErrors,
    GeocodeRateLimitWait,

    // Persist metrics
    PersistWritesSuccess,
    PersistWritesError,
    PersistRowsWritten,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::SourceRequestsSuccess => "datagov_source_requests_success_total",
            MetricName::SourceRequestsError => "datagov_source_requests_error_total",
            MetricName::SourceRequestDuration => "datagov_source_request_duration_seconds",
            MetricName::SourceRowsLoaded => "datagov_source_rows_loaded_total",

            MetricName::NormalizeValuesChanged => "datagov_normalize_values_changed_total",
            MetricName::NormalizeColumnsProcessed => "datagov_normalize_columns_processed_total",

            MetricName::GeocodeLookups => "datagov_geocode_lookups_total",
            MetricName::GeocodeHits => "datagov_geocode_hits_total",
            MetricName::GeocodeMisses => "datagov_geocode_misses_total",
            MetricName::GeocodeErrors => "datagov_geocode_errors_total",
            MetricName::GeocodeRateLimitWait => "datagov_geocode_rate_limit_wait_seconds",

            MetricName::PersistWritesSuccess => "datagov_persist_writes_success_total",
            MetricName::PersistWritesError => "datagov_persist_writes_error_total",
            MetricName::PersistRowsWritten => "datagov_persist_rows_written_total",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            SourceRequestsSuccess,
            SourceRequestsError,
            SourceRequestDuration,
            SourceRowsLoaded,
            NormalizeValuesChanged,
            NormalizeColumnsProcessed,
            GeocodeLookups,
            GeocodeHits,
            GeocodeMisses,
            GeocodeErrors,
            GeocodeRateLimitWait,
            PersistWritesSuccess,
            PersistWritesError,
            PersistRowsWritten,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init() -> anyhow::Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Text exposition of everything recorded so far, if the recorder is installed.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Source Metrics
// ============================================================================

pub mod source {
    use super::MetricName;

    pub fn request_success() {
        ::metrics::counter!(MetricName::SourceRequestsSuccess.as_str()).increment(1);
    }

    pub fn request_error() {
        ::metrics::counter!(MetricName::SourceRequestsError.as_str()).increment(1);
    }

    pub fn request_duration(secs: f64) {
        ::metrics::histogram!(MetricName::SourceRequestDuration.as_str()).record(secs);
    }

    pub fn rows_loaded(rows: usize) {
        ::metrics::counter!(MetricName::SourceRowsLoaded.as_str()).increment(rows as u64);
    }
}

// ============================================================================
// Normalize Metrics
// ============================================================================

pub mod normalize {
    use super::MetricName;

    pub fn columns_processed(count: usize) {
        ::metrics::counter!(MetricName::NormalizeColumnsProcessed.as_str()).increment(count as u64);
    }

    pub fn values_changed(count: usize) {
        ::metrics::counter!(MetricName::NormalizeValuesChanged.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Geocode Metrics
// ============================================================================

pub mod geocode {
    use super::MetricName;

    pub fn lookup() {
        ::metrics::counter!(MetricName::GeocodeLookups.as_str()).increment(1);
    }

    pub fn hit() {
        ::metrics::counter!(MetricName::GeocodeHits.as_str()).increment(1);
    }

    pub fn miss() {
        ::metrics::counter!(MetricName::GeocodeMisses.as_str()).increment(1);
    }

    pub fn error() {
        ::metrics::counter!(MetricName::GeocodeErrors.as_str()).increment(1);
    }

    pub fn rate_limit_wait(secs: f64) {
        ::metrics::histogram!(MetricName::GeocodeRateLimitWait.as_str()).record(secs);
    }
}

// ============================================================================
// Persist Metrics
// ============================================================================

pub mod persist {
    use super::MetricName;

    pub fn write_success(rows: usize) {
        ::metrics::counter!(MetricName::PersistWritesSuccess.as_str()).increment(1);
        ::metrics::counter!(MetricName::PersistRowsWritten.as_str()).increment(rows as u64);
    }

    pub fn write_error() {
        ::metrics::counter!(MetricName::PersistWritesError.as_str()).increment(1);
    }
}
