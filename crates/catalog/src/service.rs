use std::sync::Arc;

use tracing::{info, instrument, warn};
use vitrine_blob::{BlobId, BlobMetadata, BlobStore, DeleteOutcome, ImageUpload};

use crate::catalog::{ProductCatalog, ProductId};
use crate::error::CatalogError;
use crate::image::{ProductImage, public_url};

/// Replace and remove product images, keeping the blob store and the catalog
/// in step.
#[derive(Clone)]
pub struct ProductImages {
    blobs: Arc<dyn BlobStore>,
    catalog: Arc<dyn ProductCatalog>,
}

impl ProductImages {
    pub fn new(blobs: Arc<dyn BlobStore>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { blobs, catalog }
    }

    /// Store a new image and point the product at it.
    ///
    /// Validation and readiness errors from the store reach the caller and
    /// leave the product untouched. If the product does not exist, the new
    /// blob is removed again. The previous stored blob is deleted on a best
    /// effort basis: a failure there is logged and does not fail the call.
    #[instrument(skip(self, upload), fields(product_id = %product_id))]
    pub async fn replace_image(
        &self,
        product_id: &ProductId,
        upload: ImageUpload,
    ) -> Result<BlobMetadata, CatalogError> {
        let metadata = self.blobs.put(upload).await?;

        let previous = match self
            .catalog
            .set_image(product_id, ProductImage::Stored(metadata.id))
            .await
        {
            Ok(previous) => previous,
            Err(e) => {
                self.discard(metadata.id).await;
                return Err(e);
            }
        };

        if let Some(old) = previous.blob_id().filter(|old| *old != metadata.id) {
            self.discard(old).await;
        }

        info!(blob_id = %metadata.id, "product image replaced");
        Ok(metadata)
    }

    /// Clear the product's image and delete the blob it pointed to.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_image(&self, product_id: &ProductId) -> Result<(), CatalogError> {
        let previous = self
            .catalog
            .set_image(product_id, ProductImage::None)
            .await?;
        if let Some(old) = previous.blob_id() {
            self.discard(old).await;
        }
        Ok(())
    }

    /// Public URL of a product's current image.
    pub async fn image_url(
        &self,
        product_id: &ProductId,
        base_url: &str,
    ) -> Result<String, CatalogError> {
        let product = self
            .catalog
            .get(product_id)
            .await?
            .ok_or_else(|| CatalogError::ProductNotFound(product_id.clone()))?;
        Ok(public_url(&product.image, base_url))
    }

    async fn discard(&self, id: BlobId) {
        match self.blobs.delete(&id).await {
            Ok(DeleteOutcome::Deleted) => {}
            Ok(DeleteOutcome::AlreadyAbsent) => {
                warn!(blob_id = %id, "image to delete was already gone");
            }
            Err(e) => warn!(blob_id = %id, error = %e, "failed to delete image"),
        }
    }
}
