// Pipeline ingestion: fetching remote datasets into tables

pub mod loader;

pub use loader::{parse_payload, RemoteSourceLoader};
