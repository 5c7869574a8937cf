use std::fs;
use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE_PREFIX: &str = "pipeline.log";
const DEFAULT_FILTER: &str = "datagov_pipeline=info";

/// Install the global subscriber: JSON lines to a daily file under `log_dir`
/// and plain text to stderr, so stdout carries only command output.
///
/// `RUST_LOG` overrides the default filter. Buffered file output is flushed
/// when the returned guard is dropped, so hold it until the process exits.
pub fn init_logging(log_dir: &str) -> io::Result<WorkerGuard> {
    fs::create_dir_all(log_dir)?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX));

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(file_writer))
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .init();

    Ok(guard)
}
