// Observability: metrics recorded by each pipeline phase

pub mod metrics;

pub use metrics::{init, render};
