use std::path::PathBuf;

use thiserror::Error;
use vitrine_blob::BlobError;
use vitrine_blob_postgres::DatabaseError;
use vitrine_catalog::CatalogError;

/// Failure migrating a single product. Recorded in the report; the batch
/// carries on.
#[derive(Debug, Error)]
pub enum MigrationItemError {
    /// The legacy reference points outside the uploads directory.
    #[error("unsafe legacy path: {0}")]
    UnsafePath(String),

    /// The legacy file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blob store rejected or failed the upload.
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// The product could not be repointed at the new blob.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Failure that aborts the whole run.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The database could not be reached or prepared.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Products could not be enumerated.
    #[error("failed to enumerate products: {0}")]
    Enumerate(#[source] CatalogError),
}
