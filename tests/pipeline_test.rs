use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tempfile::tempdir;

use datagov_pipeline::app::ports::{Geocoder, HttpClientPort, HttpGetResult};
use datagov_pipeline::app::PipelineUseCase;
use datagov_pipeline::domain::{Coordinates, Value};
use datagov_pipeline::infra::{read_csv, RateLimiter};
use datagov_pipeline::pipeline::processing::{EnrichOutcome, GeocodingEnricher, LocationColumns};
use datagov_pipeline::pipeline::RemoteSourceLoader;

const ENDPOINT: &str = "https://www.datos.gov.co/resource/abcd-1234.json";

struct StaticHttp {
    status: u16,
    body: &'static str,
}

impl HttpClientPort for StaticHttp {
    fn get(&self, _url: &str) -> std::result::Result<HttpGetResult, String> {
        Ok(HttpGetResult {
            status: self.status,
            bytes: self.body.as_bytes().to_vec(),
            content_type: "application/json".to_string(),
            content_length: self.body.len() as u64,
        })
    }
}

struct UnreachableHttp;

impl HttpClientPort for UnreachableHttp {
    fn get(&self, url: &str) -> std::result::Result<HttpGetResult, String> {
        Err(format!("connection refused: {}", url))
    }
}

#[derive(Clone, Default)]
struct RecordingGeocoder {
    queries: Arc<Mutex<Vec<String>>>,
}

impl Geocoder for RecordingGeocoder {
    fn geocode(&self, query: &str) -> anyhow::Result<Option<Coordinates>> {
        self.queries.lock().unwrap().push(query.to_string());
        match query {
            "Bogota, Cundinamarca, Colombia" => Ok(Some(Coordinates::new(4.711, -74.0721))),
            "Medellin, Antioquia, Colombia" => Ok(Some(Coordinates::new(6.2442, -75.5812))),
            _ => Ok(None),
        }
    }
}

const PAYLOAD: &str = r#"[
    {"municipio": "BOGOTÁ", "departamento": "CUNDINAMARCA", "producci_n_t": "10"},
    {"municipio": "Medellín", "departamento": "ANTIOQUIA", "producci_n_t": "4.5"},
    {"municipio": "bogota", "departamento": "Cundinamarca", "producci_n_t": "2"},
    {"municipio": "Nowhere", "departamento": "Nada", "producci_n_t": "0"}
]"#;

fn enricher(geocoder: RecordingGeocoder) -> GeocodingEnricher {
    GeocodingEnricher::new(
        Box::new(geocoder),
        RateLimiter::new(Duration::from_millis(1)),
        LocationColumns::default(),
    )
}

#[test]
fn test_full_run_normalizes_geocodes_and_saves() -> Result<()> {
    let dir = tempdir()?;
    let output = dir.path().join("out").join("dataset.csv");
    let geocoder = RecordingGeocoder::default();
    let queries = geocoder.queries.clone();

    let loader = RemoteSourceLoader::new(Box::new(StaticHttp {
        status: 200,
        body: PAYLOAD,
    }));
    let use_case = PipelineUseCase::new(loader, Some(enricher(geocoder)));
    let (table, report) = use_case.run(ENDPOINT, &output);

    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);
    assert!(report.saved);
    assert_eq!(report.rows_loaded, Some(4));

    // Both Bogota spellings collapse onto one key after normalization.
    assert_eq!(
        *queries.lock().unwrap(),
        vec![
            "Bogota, Cundinamarca, Colombia",
            "Medellin, Antioquia, Colombia",
            "Nowhere, Nada, Colombia",
        ]
    );
    let enrich = report.enrich.expect("enrich report");
    assert_eq!(enrich.outcome, EnrichOutcome::Enriched);
    assert_eq!(enrich.distinct_keys, 3);
    assert_eq!(enrich.resolved, 2);

    let table = table.expect("table");
    assert_eq!(
        table.columns(),
        &[
            "municipio",
            "departamento",
            "producci_n_t",
            "geolocalizacion",
            "latitude",
            "longitude"
        ]
    );
    let rows = table.rows()?;
    assert_eq!(
        rows[0],
        vec![
            Value::from("Bogota"),
            Value::from("Cundinamarca"),
            Value::from(10.0),
            Value::from("Bogota, Cundinamarca, Colombia"),
            Value::from(4.711),
            Value::from(-74.0721),
        ]
    );
    assert_eq!(rows[3][4], Value::Null);

    let reloaded = read_csv(&output)?;
    assert_eq!(reloaded.shape(), table.shape());
    let reloaded_rows = reloaded.rows()?;
    assert_eq!(reloaded_rows[1][0], Value::from("Medellin"));
    assert_eq!(reloaded_rows[1][2], Value::from(4.5));
    assert_eq!(reloaded_rows[0][4], Value::from(4.711));
    Ok(())
}

#[test]
fn test_run_without_location_columns_still_saves() -> Result<()> {
    let dir = tempdir()?;
    let output = dir.path().join("dataset.csv");
    let geocoder = RecordingGeocoder::default();
    let queries = geocoder.queries.clone();

    let loader = RemoteSourceLoader::new(Box::new(StaticHttp {
        status: 200,
        body: r#"[{"cultivo": "CAFÉ", "valor": "3"}]"#,
    }));
    let (table, report) = PipelineUseCase::new(loader, Some(enricher(geocoder))).run(ENDPOINT, &output);

    assert!(report.saved);
    assert!(queries.lock().unwrap().is_empty());
    assert!(matches!(
        report.enrich.map(|e| e.outcome),
        Some(EnrichOutcome::MissingColumns { .. })
    ));
    let table = table.expect("table");
    assert_eq!(table.columns(), &["cultivo", "valor"]);
    assert_eq!(table.rows()?[0][0], Value::from("Cafe"));
    Ok(())
}

#[test]
fn test_load_failure_is_reported_and_nothing_is_written() -> Result<()> {
    let dir = tempdir()?;
    let output = dir.path().join("dataset.csv");

    let loader = RemoteSourceLoader::new(Box::new(UnreachableHttp));
    let (table, report) = PipelineUseCase::new(loader, None).run(ENDPOINT, &output);

    assert!(table.is_none());
    assert!(!report.saved);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("load:"));
    assert!(!output.exists());
    Ok(())
}

#[test]
fn test_http_error_status_is_a_load_failure() -> Result<()> {
    let dir = tempdir()?;
    let output = dir.path().join("dataset.csv");

    let loader = RemoteSourceLoader::new(Box::new(StaticHttp {
        status: 503,
        body: "unavailable",
    }));
    let (table, report) = PipelineUseCase::new(loader, None).run(ENDPOINT, &output);

    assert!(table.is_none());
    assert!(report.errors[0].contains("503"));
    Ok(())
}
