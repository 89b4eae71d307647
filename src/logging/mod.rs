// Logging module for structured logging using the tracing crate

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize the tracing subscriber for structured logging
///
/// The subscriber is configured with:
/// - JSON (default) or human-readable formatting
/// - Filtering from `RUST_LOG`, falling back to the configured level
/// - Output to stdout for container deployments
///
/// Calling this more than once is harmless: only the first call installs a
/// global subscriber, later calls return `Ok(())`.
///
/// # Examples
///
/// ```
/// use vixel::config::LoggingConfig;
/// use vixel::logging::init_subscriber;
///
/// init_subscriber(&LoggingConfig::default()).expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let result = match config.format {
        LogFormat::Json => Registry::default()
            .with(filter)
            .with(fmt::layer().json().with_current_span(false))
            .try_init(),
        LogFormat::Pretty => Registry::default()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init(),
    };

    // A global subscriber already exists (tests, embedding applications)
    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }

    Ok(())
}
