use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use vitrine_blob::BlobStore;
use vitrine_blob_http::{HttpBlobConfig, HttpBlobStore};
use vitrine_blob_memory::MemoryBlobStore;
use vitrine_blob_postgres::{Database, PostgresBlobConfig};
use vitrine_catalog::{MemoryCatalog, PostgresCatalog, PostgresCatalogConfig, ProductCatalog};

use crate::config::StorageConfig;
use crate::error::ServerError;

/// The blob store and product catalog the server runs on.
pub struct Storage {
    pub blobs: Arc<dyn BlobStore>,
    pub catalog: Arc<dyn ProductCatalog>,
    database: Option<Database>,
}

impl Storage {
    /// In-memory storage.
    pub fn memory() -> Self {
        Self {
            blobs: Arc::new(MemoryBlobStore::new()),
            catalog: Arc::new(MemoryCatalog::new()),
            database: None,
        }
    }

    /// Stop health monitoring and close the database pool, if any.
    pub async fn close(self) {
        if let Some(db) = self.database {
            db.close().await;
        }
    }
}

/// Blob store settings for the `PostgreSQL` backend.
pub fn postgres_blob_config(config: &StorageConfig) -> Result<PostgresBlobConfig, ServerError> {
    let url = config.url.as_deref().ok_or_else(|| {
        ServerError::Config(
            "postgres storage requires [storage] url or VITRINE_DATABASE_URL".into(),
        )
    })?;

    let mut pg = PostgresBlobConfig::new(url)
        .with_table_prefix(&config.table_prefix)
        .with_connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .with_chunk_size(config.chunk_size_bytes);
    pg.pool_size = config.pool_size;
    pg.schema.clone_from(&config.schema);
    pg.health_check_interval = Duration::from_secs(config.health_check_interval_seconds.max(1));
    pg.ssl_mode.clone_from(&config.ssl_mode);
    pg.ssl_root_cert.clone_from(&config.ssl_root_cert);
    Ok(pg)
}

/// Product table settings.
pub fn catalog_config(config: &StorageConfig) -> PostgresCatalogConfig {
    PostgresCatalogConfig {
        schema: config.schema.clone(),
        table: config.products_table.clone(),
    }
}

/// Create the storage backends from configuration.
///
/// The database is connected lazily: the server starts even if it is down,
/// and the blob store answers `NotReady` until the health monitor reaches
/// it.
pub fn create_storage(config: &StorageConfig) -> Result<Storage, ServerError> {
    let storage = match config.backend.as_str() {
        "memory" => Storage::memory(),
        "postgres" => {
            let db = connect(config)?;
            let blobs: Arc<dyn BlobStore> = Arc::new(db.blob_store());
            let catalog = postgres_catalog(&db, config);
            Storage {
                blobs,
                catalog,
                database: Some(db),
            }
        }
        "http" => {
            let base_url = config.http.base_url.as_deref().ok_or_else(|| {
                ServerError::Config("http storage requires [storage.http] base_url".into())
            })?;
            let mut http = HttpBlobConfig::new(base_url);
            if let Some(ref key) = config.http.api_key {
                http = http.with_api_key(key);
            }
            if let Some(secs) = config.http.timeout_seconds {
                http = http.with_timeout(Duration::from_secs(secs));
            }
            let blobs: Arc<dyn BlobStore> = Arc::new(HttpBlobStore::new(http)?);

            if config.url.is_some() {
                let db = connect(config)?;
                let catalog = postgres_catalog(&db, config);
                Storage {
                    blobs,
                    catalog,
                    database: Some(db),
                }
            } else {
                warn!("no [storage] url set, product catalog is in memory");
                Storage {
                    blobs,
                    catalog: Arc::new(MemoryCatalog::new()),
                    database: None,
                }
            }
        }
        other => {
            return Err(ServerError::Config(format!(
                "unknown storage backend: {other}"
            )));
        }
    };

    info!(backend = %config.backend, "storage initialized");
    Ok(storage)
}

fn connect(config: &StorageConfig) -> Result<Database, ServerError> {
    let db = Database::connect_lazy(postgres_blob_config(config)?)
        .map_err(|e| ServerError::Config(e.to_string()))?;
    db.start_health_monitor();
    Ok(db)
}

/// Postgres catalog whose table is created once the database is reachable.
fn postgres_catalog(db: &Database, config: &StorageConfig) -> Arc<dyn ProductCatalog> {
    let catalog = Arc::new(PostgresCatalog::new(db.pool().clone(), catalog_config(config)));

    let mut connection = db.subscribe();
    let pending = Arc::clone(&catalog);
    tokio::spawn(async move {
        if connection.wait_for(Option::is_some).await.is_ok()
            && let Err(e) = pending.run_migrations().await
        {
            warn!(error = %e, "failed to prepare product table");
        }
    });

    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend() {
        let storage = create_storage(&StorageConfig::default()).unwrap();
        assert!(storage.blobs.is_ready());
        storage.close().await;
    }

    #[test]
    fn postgres_requires_url() {
        let config = StorageConfig {
            backend: "postgres".into(),
            ..StorageConfig::default()
        };
        assert!(matches!(
            create_storage(&config),
            Err(ServerError::Config(_))
        ));
    }

    #[tokio::test]
    async fn postgres_starts_unbound() {
        let config = StorageConfig {
            backend: "postgres".into(),
            url: Some("postgres://127.0.0.1:1/vitrine".into()),
            ..StorageConfig::default()
        };
        let storage = create_storage(&config).unwrap();
        assert!(!storage.blobs.is_ready());
        storage.close().await;
    }

    #[test]
    fn http_requires_base_url() {
        let config = StorageConfig {
            backend: "http".into(),
            ..StorageConfig::default()
        };
        assert!(matches!(
            create_storage(&config),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn unknown_backend() {
        let config = StorageConfig {
            backend: "s3".into(),
            ..StorageConfig::default()
        };
        let err = create_storage(&config).err().unwrap();
        assert!(err.to_string().contains("unknown storage backend"));
    }

    #[test]
    fn postgres_config_mapping() {
        let config = StorageConfig {
            url: Some("postgres://db/shop".into()),
            schema: "shop".into(),
            table_prefix: "img_".into(),
            connect_timeout_seconds: 3,
            chunk_size_bytes: 1024,
            ..StorageConfig::default()
        };
        let pg = postgres_blob_config(&config).unwrap();
        assert_eq!(pg.url, "postgres://db/shop");
        assert_eq!(pg.schema, "shop");
        assert_eq!(pg.table_prefix, "img_");
        assert_eq!(pg.connect_timeout, Duration::from_secs(3));
        assert_eq!(pg.chunk_size, 1024);
    }
}
