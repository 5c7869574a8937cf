use crate::domain::Coordinates;

// Ingest-side ports
pub trait HttpClientPort: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpGetResult, String>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub content_length: u64,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Resolves a free-text place description to a coordinate pair.
///
/// `Ok(None)` is a normal miss; `Err` is a transport or decoding failure for
/// this one query.
pub trait Geocoder: Send + Sync {
    fn geocode(&self, query: &str) -> anyhow::Result<Option<Coordinates>>;
}
