// Pipeline processing: text normalization and geocoding enrichment

pub mod enrich;
pub mod normalize;

pub use enrich::{EnrichOutcome, EnrichReport, GeocodingEnricher, LocationColumns};
pub use normalize::{normalize_text, NormalizeReport, TextNormalizer};
