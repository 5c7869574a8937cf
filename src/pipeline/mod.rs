// Data processing pipeline: ingestion and processing stages

pub mod ingestion;
pub mod processing;

pub use ingestion::RemoteSourceLoader;
pub use processing::{GeocodingEnricher, TextNormalizer};
