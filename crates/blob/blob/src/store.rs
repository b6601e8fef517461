use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;

use crate::error::BlobError;
use crate::types::{BlobDownload, BlobId, BlobMetadata, DeleteOutcome};
use crate::upload::ImageUpload;

/// Pluggable blob storage backend for product images.
///
/// Implementors provide the actual storage mechanism (database chunks, a
/// hosted object API, memory). Uploads are validated when the
/// [`ImageUpload`] is built, so `put` never sees an invalid payload.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store an upload and return its metadata.
    ///
    /// The store assigns a unique id, the timestamp-prefixed stored filename
    /// and the `SHA-256` checksum.
    async fn put(&self, upload: ImageUpload) -> Result<BlobMetadata, BlobError>;

    /// Retrieve only the metadata for a blob (no payload transfer).
    ///
    /// Returns [`BlobError::NotFound`] if the blob does not exist.
    async fn info(&self, id: &BlobId) -> Result<BlobMetadata, BlobError>;

    /// Open a blob for streaming.
    ///
    /// Returns [`BlobError::NotFound`] if the blob does not exist. The payload
    /// is read lazily as the returned stream is polled.
    async fn open(&self, id: &BlobId) -> Result<BlobDownload, BlobError>;

    /// Delete a blob by id.
    async fn delete(&self, id: &BlobId) -> Result<DeleteOutcome, BlobError>;

    /// List stored blobs, newest first.
    async fn list(&self, limit: Option<u32>) -> Result<Vec<BlobMetadata>, BlobError>;

    /// Whether the store is currently able to serve operations.
    fn is_ready(&self) -> bool {
        true
    }

    /// Read a whole blob into memory.
    ///
    /// Only meant for small payloads and tests; the serving path streams.
    async fn read_to_bytes(&self, id: &BlobId) -> Result<(BlobMetadata, Bytes), BlobError> {
        let download = self.open(id).await?;
        let capacity = usize::try_from(download.metadata.size_bytes).unwrap_or_default();
        let buf = download
            .body
            .try_fold(BytesMut::with_capacity(capacity), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await?;
        Ok((download.metadata, buf.freeze()))
    }
}
