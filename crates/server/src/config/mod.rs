mod images;
mod migration;
mod server;
mod storage;
mod telemetry;


pub use images::*;
pub use migration::*;
pub use server::*;
pub use storage::*;
pub use telemetry::*;

use std::path::Path;

use serde::Deserialize;

use crate::error::ServerError;

/// Environment variable overriding `[storage] url`.
pub const DATABASE_URL_ENV: &str = "VITRINE_DATABASE_URL";

/// Top-level configuration for the Vitrine server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct VitrineConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Blob store and catalog backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Image serving configuration.
    #[serde(default)]
    pub images: ImagesConfig,
    /// Legacy image migration configuration.
    #[serde(default)]
    pub migration: MigrationSection,
    /// Log output configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl VitrineConfig {
    /// Load configuration from a TOML file, or use defaults if the file does
    /// not exist. Environment overrides are applied afterwards.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let path = path.as_ref();
        let mut config: Self = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)
                .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?
        } else {
            toml::from_str("").map_err(|e| ServerError::Config(e.to_string()))?
        };

        if let Ok(url) = std::env::var(DATABASE_URL_ENV)
            && !url.trim().is_empty()
        {
            config.storage.url = Some(url);
        }
        Ok(config)
    }
}
