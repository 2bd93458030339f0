use std::fs;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Make sure the working storage directory exists so imports and exports
/// have somewhere to land.
pub fn ensure_files_dir(files_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(files_dir)?;
    Ok(())
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr so they never interleave with the report on stdout.
/// Falls back to `warn` if the level string is not a valid filter.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let lower = log_level.to_lowercase();
    let normalised = match lower.as_str() {
        "warning" => "warn",
        "critical" => "error",
        other => other,
    };

    let filter = EnvFilter::try_new(normalised).unwrap_or_else(|_| EnvFilter::new("warn"));

    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;

    Ok(())
}
