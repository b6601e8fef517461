use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use futures::StreamExt;
use tracing::debug;

use vitrine_blob::{
    BlobDownload, BlobError, BlobId, BlobMetadata, BlobStore, DEFAULT_CHUNK_SIZE, DeleteOutcome,
    ImageUpload, split_chunks,
};

/// A single stored blob: metadata plus its payload already split into chunks.
#[derive(Debug, Clone)]
struct Entry {
    metadata: BlobMetadata,
    chunks: Arc<[Bytes]>,
}

/// In-memory [`BlobStore`] backed by a [`DashMap`].
///
/// Payloads are kept as shared chunk slices so that downloads stream chunk
/// by chunk exactly like the database backend does.
#[derive(Debug)]
pub struct MemoryBlobStore {
    data: DashMap<BlobId, Entry>,
    chunk_size: usize,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self {
            data: DashMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl MemoryBlobStore {
    /// Create a new, empty in-memory blob store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom chunk size for downloads.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, upload: ImageUpload) -> Result<BlobMetadata, BlobError> {
        let id = BlobId::generate();
        let metadata = upload.describe(id, Utc::now());
        let chunks: Arc<[Bytes]> = split_chunks(upload.data(), self.chunk_size).into();

        debug!(blob_id = %id, size = metadata.size_bytes, "stored blob in memory");
        self.data.insert(
            id,
            Entry {
                metadata: metadata.clone(),
                chunks,
            },
        );
        Ok(metadata)
    }

    async fn info(&self, id: &BlobId) -> Result<BlobMetadata, BlobError> {
        self.data
            .get(id)
            .map(|entry| entry.metadata.clone())
            .ok_or_else(|| BlobError::NotFound(id.to_string()))
    }

    async fn open(&self, id: &BlobId) -> Result<BlobDownload, BlobError> {
        // Clone out of the map so no shard guard is held while streaming.
        let entry = self
            .data
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| BlobError::NotFound(id.to_string()))?;

        let chunks = entry.chunks;
        let body = futures::stream::iter(0..chunks.len())
            .map(move |i| Ok::<_, BlobError>(chunks[i].clone()))
            .boxed();

        Ok(BlobDownload {
            metadata: entry.metadata,
            body,
        })
    }

    async fn delete(&self, id: &BlobId) -> Result<DeleteOutcome, BlobError> {
        Ok(match self.data.remove(id) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::AlreadyAbsent,
        })
    }

    async fn list(&self, limit: Option<u32>) -> Result<Vec<BlobMetadata>, BlobError> {
        let mut all: Vec<BlobMetadata> = self
            .data
            .iter()
            .map(|entry| entry.metadata.clone())
            .collect();
        all.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            all.truncate(limit as usize);
        }
        Ok(all)
    }
}
