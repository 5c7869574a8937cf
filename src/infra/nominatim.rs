use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::app::ports::Geocoder;
use crate::config::GeocoderConfig;
use crate::domain::Coordinates;

/// Geocoder backed by a Nominatim `/search` endpoint.
///
/// Rate limiting is not done here; callers pace requests with a
/// [`RateLimiter`](super::rate_limiter::RateLimiter).
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    search_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .context("building Nominatim HTTP client")?;
        Ok(Self {
            client,
            search_url: format!("{}/search", config.base_url.trim_end_matches('/')),
        })
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, query: &str) -> Result<Option<Coordinates>> {
        let body = self
            .client
            .get(&self.search_url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .with_context(|| format!("geocoding request for '{}'", query))?
            .error_for_status()
            .with_context(|| format!("geocoding request for '{}'", query))?
            .bytes()?;
        parse_search_response(&body)
    }
}

/// Decode a `/search?format=json` body, keeping the first hit.
pub fn parse_search_response(body: &[u8]) -> Result<Option<Coordinates>> {
    let hits: Vec<SearchHit> =
        serde_json::from_slice(body).context("decoding Nominatim search response")?;
    let Some(hit) = hits.into_iter().next() else {
        return Ok(None);
    };
    let latitude: f64 = hit
        .lat
        .parse()
        .with_context(|| format!("invalid latitude '{}'", hit.lat))?;
    let longitude: f64 = hit
        .lon
        .parse()
        .with_context(|| format!("invalid longitude '{}'", hit.lon))?;
    if let Some(name) = &hit.display_name {
        debug!(place = %name, latitude, longitude, "Nominatim match");
    }
    Ok(Some(Coordinates::new(latitude, longitude)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_first_hit() {
        let body = br#"[
            {"lat": "4.6533816", "lon": "-74.0836333", "display_name": "Bogota, Colombia"},
            {"lat": "1.0", "lon": "2.0"}
        ]"#;
        let coords = parse_search_response(body).unwrap().unwrap();
        assert!((coords.latitude - 4.6533816).abs() < 1e-9);
        assert!((coords.longitude + 74.0836333).abs() < 1e-9);
    }

    #[test]
    fn test_parse_no_hits() {
        assert_eq!(parse_search_response(b"[]").unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_search_response(b"<html>").is_err());
        assert!(parse_search_response(br#"[{"lat": "north", "lon": "1"}]"#).is_err());
    }

    #[test]
    fn test_search_url_trims_trailing_slash() {
        let config = GeocoderConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..GeocoderConfig::default()
        };
        let geocoder = NominatimGeocoder::new(&config).unwrap();
        assert_eq!(geocoder.search_url, "http://localhost:8080/search");
    }
}
