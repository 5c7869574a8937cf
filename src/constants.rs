//! Column and service names shared across the pipeline stages.

// Columns the geocoding enricher reads by default
pub const MUNICIPALITY_COLUMN: &str = "municipio";
pub const DEPARTMENT_COLUMN: &str = "departamento";

// Columns the geocoding enricher writes
pub const LOCATION_KEY_COLUMN: &str = "geolocalizacion";
pub const LATITUDE_COLUMN: &str = "latitude";
pub const LONGITUDE_COLUMN: &str = "longitude";

/// Suffix appended to every location key
pub const DEFAULT_COUNTRY: &str = "Colombia";

// Nominatim usage policy: identify the client and stay at or below one request per second
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "datagov_pipeline/0.1";
pub const DEFAULT_MIN_DELAY_MS: u64 = 1000;

pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_OUTPUT_FILE: &str = "output/dataset.csv";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Socrata's query parameter for capping the number of returned rows
pub const SOCRATA_LIMIT_PARAM: &str = "$limit";

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_HEAD_ROWS: usize = 5;
