//! Boot: logging init, config load, registry construction.

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::NormalizerConfig;
use crate::parser::Registry;

/// Initialise the tracing / logging subsystem.
///
/// Logs go to stderr; stdout carries results.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lognorm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load and validate config, then build the parser registry.
///
/// Returns `(Registry, NormalizerConfig)` on success.
pub fn boot() -> Result<(Registry, NormalizerConfig), Box<dyn std::error::Error>> {
    info!("Starting lognorm v{}", env!("CARGO_PKG_VERSION"));

    let config = NormalizerConfig::load()?;
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;
    info!(
        "Loaded configuration: max_record_size={}, event_time_fallback={}, default_log_type={}",
        config.max_record_size, config.event_time_fallback, config.default_log_type
    );

    let registry = Registry::from_config(&config)?;
    info!("Registered log types: {}", registry.log_types().join(", "));

    Ok((registry, config))
}
