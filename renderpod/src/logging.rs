use std::path::Path;

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Installs the global subscriber: human-readable output on stderr (stdout is
/// reserved for the response JSON), full detail in an append-only log file.
///
/// The returned guard must live until exit or buffered file output is lost.
pub fn init_logging(
    stderr_level: LevelFilter,
    log_path: &Path,
    file_level: LevelFilter,
) -> Result<WorkerGuard> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = std::fs::OpenOptions::new().create(true).append(true).open(log_path)?;
    let (file_writer, guard) = tracing_appender::non_blocking(log_file);

    let stderr_filter = EnvFilter::builder()
        .with_default_directive(stderr_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_filter(stderr_filter))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer).with_filter(file_level))
        .try_init()?;

    Ok(guard)
}
