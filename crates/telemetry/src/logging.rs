//! Structured logging setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the log filter from an explicit level or `RUST_LOG`, defaulting to `info`.
pub fn build_filter(log_level: Option<&str>) -> EnvFilter {
    match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Initialize JSON structured logging with environment-based filtering.
///
/// # Arguments
/// * `log_level` - Optional log level override (e.g., "info", "debug", "wastetrack_api=trace")
pub fn init_logging(log_level: Option<&str>) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(build_filter(log_level))
        .with(fmt::layer().json())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    Ok(())
}
