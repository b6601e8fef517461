//! Tracing subscriber initialization.
//!
//! Installs a [`tracing_subscriber`] registry with an [`EnvFilter`] and a
//! `fmt` layer in the configured [`LogFormat`].

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use crate::config::{LogFormat, TelemetryConfig};

/// Build the filter: `RUST_LOG` if set, else the configured level.
///
/// An unparseable level falls back to `info`.
fn env_filter(level: &str) -> (EnvFilter, Option<String>) {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return (filter, None);
    }
    match EnvFilter::try_new(level) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new("info"), Some(e.to_string())),
    }
}

/// Initialize the global tracing subscriber.
///
/// Fails only if a global subscriber is already installed.
pub fn init(config: &TelemetryConfig) -> Result<(), TryInitError> {
    let (filter, invalid) = env_filter(&config.level);
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init()?,
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()?,
    }

    if let Some(error) = invalid {
        tracing::warn!(level = %config.level, %error, "invalid log level, using info");
    }
    Ok(())
}
