use tracing::info;
use vitrine_blob_postgres::{Database, PostgresBlobConfig};
use vitrine_catalog::{CatalogError, PostgresCatalog, PostgresCatalogConfig};

use crate::error::MigrationError;
use crate::job::{ImageMigration, MigrationOptions};
use crate::report::MigrationReport;

/// Everything a standalone migration run needs.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub database: PostgresBlobConfig,
    pub catalog: PostgresCatalogConfig,
    pub options: MigrationOptions,
}

/// Connect, migrate and disconnect.
///
/// The connection attempt is bounded by `database.connect_timeout`; failing
/// to connect aborts the run before any product is touched. The pool is
/// closed on every path once connected.
pub async fn run_with_database(config: MigrationConfig) -> Result<MigrationReport, MigrationError> {
    let db = Database::connect(config.database).await?;
    info!("connected to database, starting image migration");

    let result = migrate(&db, config.catalog, config.options).await;
    db.close().await;
    result
}

async fn migrate(
    db: &Database,
    catalog: PostgresCatalogConfig,
    options: MigrationOptions,
) -> Result<MigrationReport, MigrationError> {
    let store = db.blob_store();
    let catalog = PostgresCatalog::new(db.pool().clone(), catalog);
    catalog
        .run_migrations()
        .await
        .map_err(|e| MigrationError::Enumerate(CatalogError::from(e)))?;

    ImageMigration::new(&store, &catalog, options).run().await
}
