use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};
use vitrine_blob::{BlobId, BlobStore, ImageUpload};
use vitrine_catalog::{Product, ProductCatalog, ProductImage};

use crate::error::{MigrationError, MigrationItemError};
use crate::report::{ItemFailure, MigrationReport};

/// Source label recorded on migrated blobs.
pub const MIGRATED_FROM: &str = "local";

/// Knobs for a migration run.
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    /// Directory the legacy image names are relative to.
    pub uploads_dir: PathBuf,
    /// Report what would be migrated without writing anything.
    pub dry_run: bool,
    /// Delete each legacy file once its product points at the new blob.
    pub remove_source: bool,
}

impl MigrationOptions {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            dry_run: false,
            remove_source: false,
        }
    }
}

/// What happened to one product.
enum Outcome {
    Migrated(Option<BlobId>),
    AlreadyStored,
    External,
    Missing,
}

/// Batch job moving legacy on-disk images into a [`BlobStore`].
pub struct ImageMigration<'a> {
    blobs: &'a dyn BlobStore,
    catalog: &'a dyn ProductCatalog,
    options: MigrationOptions,
}

impl<'a> ImageMigration<'a> {
    pub fn new(
        blobs: &'a dyn BlobStore,
        catalog: &'a dyn ProductCatalog,
        options: MigrationOptions,
    ) -> Self {
        Self {
            blobs,
            catalog,
            options,
        }
    }

    /// Migrate every product, one at a time.
    ///
    /// Only a failure to enumerate products aborts the run; everything that
    /// goes wrong for a single product lands in the report.
    #[instrument(
        skip(self),
        fields(
            uploads_dir = %self.options.uploads_dir.display(),
            dry_run = self.options.dry_run
        )
    )]
    pub async fn run(&self) -> Result<MigrationReport, MigrationError> {
        let products = self
            .catalog
            .products_with_images()
            .await
            .map_err(MigrationError::Enumerate)?;
        info!(count = products.len(), "found products with images");

        let mut report = MigrationReport {
            dry_run: self.options.dry_run,
            ..MigrationReport::default()
        };

        for product in products {
            report.scanned += 1;
            match self.migrate_product(&product).await {
                Ok(Outcome::Migrated(id)) => {
                    report.migrated += 1;
                    match id {
                        Some(id) => {
                            info!(product_id = %product.id, blob_id = %id, "migrated image");
                        }
                        None => info!(
                            product_id = %product.id,
                            image = %product.image,
                            "would migrate image"
                        ),
                    }
                }
                Ok(Outcome::AlreadyStored) => {
                    report.already_stored += 1;
                    debug!(product_id = %product.id, "image already stored, skipping");
                }
                Ok(Outcome::External) => {
                    report.external += 1;
                    debug!(product_id = %product.id, "image is an external url, skipping");
                }
                Ok(Outcome::Missing) => {
                    report.missing += 1;
                    warn!(
                        product_id = %product.id,
                        image = %product.image,
                        "legacy file not found, skipping"
                    );
                }
                Err(error) => {
                    warn!(
                        product_id = %product.id,
                        image = %product.image,
                        %error,
                        "failed to migrate image"
                    );
                    report.failures.push(ItemFailure {
                        product_id: product.id.clone(),
                        image: product.image.as_stored_value().unwrap_or_default(),
                        error,
                    });
                }
            }
        }

        info!(
            scanned = report.scanned,
            migrated = report.migrated,
            already_stored = report.already_stored,
            external = report.external,
            missing = report.missing,
            failed = report.failed(),
            "image migration finished"
        );
        Ok(report)
    }

    async fn migrate_product(&self, product: &Product) -> Result<Outcome, MigrationItemError> {
        let legacy = match &product.image {
            ProductImage::Stored(_) => return Ok(Outcome::AlreadyStored),
            ProductImage::External(_) => return Ok(Outcome::External),
            ProductImage::None => return Ok(Outcome::Missing),
            ProductImage::Legacy(path) => path,
        };

        let path = resolve_legacy_path(&self.options.uploads_dir, legacy)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => Bytes::from(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Outcome::Missing),
            Err(source) => return Err(MigrationItemError::Read { path, source }),
        };

        let upload = ImageUpload::migrated(legacy, data, MIGRATED_FROM)
            .map_err(vitrine_blob::BlobError::from)?;
        if self.options.dry_run {
            return Ok(Outcome::Migrated(None));
        }

        let metadata = self.blobs.put(upload).await?;
        if let Err(e) = self
            .catalog
            .set_image(&product.id, ProductImage::Stored(metadata.id))
            .await
        {
            if let Err(cleanup) = self.blobs.delete(&metadata.id).await {
                warn!(blob_id = %metadata.id, error = %cleanup, "failed to remove orphaned blob");
            }
            return Err(e.into());
        }

        if self.options.remove_source
            && let Err(e) = tokio::fs::remove_file(&path).await
        {
            warn!(path = %path.display(), error = %e, "failed to remove migrated legacy file");
        }

        Ok(Outcome::Migrated(Some(metadata.id)))
    }
}

/// Resolve a legacy image reference under the uploads directory.
///
/// References must be relative and stay inside the directory.
fn resolve_legacy_path(uploads_dir: &Path, legacy: &str) -> Result<PathBuf, MigrationItemError> {
    let relative = Path::new(legacy);
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe || relative.as_os_str().is_empty() {
        return Err(MigrationItemError::UnsafePath(legacy.to_owned()));
    }
    Ok(uploads_dir.join(relative))
}
