use serde::Deserialize;

/// Log output configuration.
///
/// `RUST_LOG` takes precedence over `level` when set.
///
/// ```toml
/// [telemetry]
/// level = "info,vitrine_blob_postgres=debug"
/// format = "json"
/// ```
#[derive(Debug, Deserialize)]
pub struct TelemetryConfig {
    /// Default filter directive.
    #[serde(default = "default_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human-friendly output.
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

fn default_level() -> String {
    "info".to_owned()
}
