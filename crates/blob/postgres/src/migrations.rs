use sqlx::PgPool;

use crate::config::PostgresBlobConfig;

/// Run database migrations, creating required tables if they do not exist.
///
/// One row per blob lives in the files table; the payload is split across
/// rows of the chunks table, removed together with the file row.
///
/// # Errors
///
/// Returns a [`sqlx::Error`] if any DDL statement fails.
pub async fn run_migrations(pool: &PgPool, config: &PostgresBlobConfig) -> Result<(), sqlx::Error> {
    let files_table = config.files_table();
    let chunks_table = config.chunks_table();

    let create_files = format!(
        "CREATE TABLE IF NOT EXISTS {files_table} (
            id UUID PRIMARY KEY,
            filename TEXT NOT NULL,
            original_name TEXT NOT NULL,
            content_type TEXT NOT NULL,
            size_bytes BIGINT NOT NULL,
            chunk_size INTEGER NOT NULL,
            checksum_sha256 TEXT NOT NULL,
            origin TEXT NOT NULL,
            origin_source TEXT,
            uploaded_at TIMESTAMPTZ NOT NULL
        )"
    );

    let create_chunks = format!(
        "CREATE TABLE IF NOT EXISTS {chunks_table} (
            file_id UUID NOT NULL REFERENCES {files_table} (id) ON DELETE CASCADE,
            n INTEGER NOT NULL,
            data BYTEA NOT NULL,
            PRIMARY KEY (file_id, n)
        )"
    );

    let create_uploaded_at_idx = format!(
        "CREATE INDEX IF NOT EXISTS {}files_uploaded_at_idx ON {files_table} (uploaded_at DESC)",
        config.table_prefix
    );

    sqlx::query(&create_files).execute(pool).await?;
    sqlx::query(&create_chunks).execute(pool).await?;
    sqlx::query(&create_uploaded_at_idx).execute(pool).await?;

    Ok(())
}
