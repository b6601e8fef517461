use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};
use futures::StreamExt;
use sqlx::PgPool;
use tokio::sync::watch;
use tracing::{debug, instrument};
use uuid::Uuid;

use vitrine_blob::{
    BlobDownload, BlobError, BlobId, BlobMetadata, BlobOrigin, BlobStore, DeleteOutcome,
    ImageUpload, chunk_count, split_chunks,
};

use crate::config::PostgresBlobConfig;
use crate::connection::ConnectionState;

const FILE_COLUMNS: &str = "id, filename, original_name, content_type, size_bytes, chunk_size, \
                            checksum_sha256, origin, origin_source, uploaded_at";

type FileRow = (
    Uuid,
    String,
    String,
    String,
    i64,
    i32,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
);

fn upstream(e: sqlx::Error) -> BlobError {
    BlobError::Upstream(e.to_string())
}

/// Split a database row into metadata and the chunk size it was written with.
fn decode_row(row: FileRow) -> (BlobMetadata, usize) {
    let (
        id,
        filename,
        original_name,
        content_type,
        size_bytes,
        chunk_size,
        checksum_sha256,
        origin,
        origin_source,
        uploaded_at,
    ) = row;
    let metadata = BlobMetadata {
        id: BlobId::from(id),
        filename,
        original_name,
        content_type,
        size_bytes: u64::try_from(size_bytes).unwrap_or_default(),
        checksum_sha256,
        uploaded_at,
        origin: BlobOrigin::from_parts(&origin, origin_source),
    };
    (metadata, usize::try_from(chunk_size).unwrap_or(1).max(1))
}

/// PostgreSQL-backed implementation of [`BlobStore`].
///
/// Payloads are split into `BYTEA` chunk rows. Downloads fetch one chunk per
/// poll, so a request never holds more than one chunk in memory, and dropping
/// the stream mid-way cancels the in-flight query and returns its connection
/// to the pool.
///
/// The store does not own a connection. It follows a
/// [`ConnectionState`] channel and answers [`BlobError::NotReady`] whenever
/// that channel holds `None`.
pub struct PostgresBlobStore {
    connection: watch::Receiver<ConnectionState>,
    config: Arc<PostgresBlobConfig>,
}

impl PostgresBlobStore {
    /// Create a store that follows the given connection state.
    pub fn new(connection: watch::Receiver<ConnectionState>, config: PostgresBlobConfig) -> Self {
        Self {
            connection,
            config: Arc::new(config),
        }
    }

    /// Wait until the store is bound to a live connection.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::NotReady`] if no connection shows up in time or
    /// the connection owner went away.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<(), BlobError> {
        let mut rx = self.connection.clone();
        tokio::time::timeout(timeout, rx.wait_for(Option::is_some))
            .await
            .map_err(|_| BlobError::NotReady)?
            .map_err(|_| BlobError::NotReady)?;
        Ok(())
    }

    fn pool(&self) -> Result<PgPool, BlobError> {
        self.connection.borrow().clone().ok_or(BlobError::NotReady)
    }

    async fn fetch_file(
        &self,
        pool: &PgPool,
        id: &BlobId,
    ) -> Result<(BlobMetadata, usize), BlobError> {
        let table = self.config.files_table();
        let query = format!("SELECT {FILE_COLUMNS} FROM {table} WHERE id = $1");

        let row: Option<FileRow> = sqlx::query_as(&query)
            .bind(id.as_uuid())
            .fetch_optional(pool)
            .await
            .map_err(upstream)?;

        row.map(decode_row)
            .ok_or_else(|| BlobError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl BlobStore for PostgresBlobStore {
    #[instrument(
        skip(self, upload),
        fields(original_name = %upload.original_name(), size = upload.size_bytes())
    )]
    async fn put(&self, upload: ImageUpload) -> Result<BlobMetadata, BlobError> {
        let pool = self.pool()?;
        let id = BlobId::generate();
        // Postgres keeps microseconds; truncate so the returned metadata
        // matches what a later read reports.
        let metadata = upload.describe(id, Utc::now().trunc_subsecs(6));
        let chunk_size = self.config.chunk_size;
        let files_table = self.config.files_table();
        let chunks_table = self.config.chunks_table();

        let insert_file = format!(
            "INSERT INTO {files_table} ({FILE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        );
        let insert_chunk =
            format!("INSERT INTO {chunks_table} (file_id, n, data) VALUES ($1, $2, $3)");

        // A dropped or failed transaction rolls back, so a partial upload is
        // never visible.
        let mut tx = pool.begin().await.map_err(upstream)?;

        sqlx::query(&insert_file)
            .bind(id.as_uuid())
            .bind(&metadata.filename)
            .bind(&metadata.original_name)
            .bind(&metadata.content_type)
            .bind(i64::try_from(metadata.size_bytes).unwrap_or(i64::MAX))
            .bind(i32::try_from(chunk_size).unwrap_or(i32::MAX))
            .bind(&metadata.checksum_sha256)
            .bind(metadata.origin.label())
            .bind(metadata.origin.source())
            .bind(metadata.uploaded_at)
            .execute(&mut *tx)
            .await
            .map_err(upstream)?;

        for (n, chunk) in split_chunks(upload.data(), chunk_size).iter().enumerate() {
            sqlx::query(&insert_chunk)
                .bind(id.as_uuid())
                .bind(i32::try_from(n).unwrap_or(i32::MAX))
                .bind(chunk.as_ref())
                .execute(&mut *tx)
                .await
                .map_err(upstream)?;
        }

        tx.commit().await.map_err(upstream)?;

        debug!(blob_id = %id, filename = %metadata.filename, "stored blob");
        Ok(metadata)
    }

    async fn info(&self, id: &BlobId) -> Result<BlobMetadata, BlobError> {
        let pool = self.pool()?;
        self.fetch_file(&pool, id).await.map(|(metadata, _)| metadata)
    }

    #[instrument(skip(self), fields(blob_id = %id))]
    async fn open(&self, id: &BlobId) -> Result<BlobDownload, BlobError> {
        let pool = self.pool()?;
        let (metadata, chunk_size) = self.fetch_file(&pool, id).await?;

        let total = chunk_count(metadata.size_bytes, chunk_size);
        let file_id = id.as_uuid();
        let query = format!(
            "SELECT data FROM {} WHERE file_id = $1 AND n = $2",
            self.config.chunks_table()
        );

        let body = futures::stream::try_unfold(0u64, move |n| {
            let pool = pool.clone();
            let query = query.clone();
            async move {
                if n >= total {
                    return Ok(None);
                }
                let row: Option<(Vec<u8>,)> = sqlx::query_as(&query)
                    .bind(file_id)
                    .bind(i32::try_from(n).unwrap_or(i32::MAX))
                    .fetch_optional(&pool)
                    .await
                    .map_err(upstream)?;
                let (data,) = row.ok_or_else(|| {
                    BlobError::Upstream(format!("blob {file_id} is missing chunk {n}"))
                })?;
                Ok(Some((Bytes::from(data), n + 1)))
            }
        })
        .boxed();

        Ok(BlobDownload { metadata, body })
    }

    #[instrument(skip(self), fields(blob_id = %id))]
    async fn delete(&self, id: &BlobId) -> Result<DeleteOutcome, BlobError> {
        let pool = self.pool()?;
        let query = format!("DELETE FROM {} WHERE id = $1", self.config.files_table());

        let result = sqlx::query(&query)
            .bind(id.as_uuid())
            .execute(&pool)
            .await
            .map_err(upstream)?;

        Ok(if result.rows_affected() > 0 {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::AlreadyAbsent
        })
    }

    async fn list(&self, limit: Option<u32>) -> Result<Vec<BlobMetadata>, BlobError> {
        let pool = self.pool()?;
        let query = format!(
            "SELECT {FILE_COLUMNS} FROM {} ORDER BY uploaded_at DESC, id DESC LIMIT $1",
            self.config.files_table()
        );

        let rows: Vec<FileRow> = sqlx::query_as(&query)
            .bind(limit.map(i64::from))
            .fetch_all(&pool)
            .await
            .map_err(upstream)?;

        Ok(rows.into_iter().map(|row| decode_row(row).0).collect())
    }

    fn is_ready(&self) -> bool {
        self.connection.borrow().is_some()
    }
}
