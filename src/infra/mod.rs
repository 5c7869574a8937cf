pub mod csv_store;
pub mod http_client;
pub mod nominatim;
pub mod rate_limiter;

pub use csv_store::{read_csv, save_csv, write_csv};
pub use http_client::ReqwestHttp;
pub use nominatim::NominatimGeocoder;
pub use rate_limiter::RateLimiter;
