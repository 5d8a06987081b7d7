//! tracing bootstrap for embedding applications

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber described by `cfg`.
///
/// `RUST_LOG` overrides the configured level. Returns an error if a global
/// subscriber is already installed.
pub fn init_tracing(cfg: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .map_err(|e| anyhow::anyhow!("invalid log level '{}': {e}", cfg.level))?;

    match cfg.format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()?,
        _ => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()?,
    }
    Ok(())
}
