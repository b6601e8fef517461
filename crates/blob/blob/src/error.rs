use thiserror::Error;

/// Reasons an image upload is rejected before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The upload carried no bytes.
    #[error("upload is empty")]
    Empty,

    /// The upload exceeds the maximum allowed size.
    #[error("upload too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge {
        /// Actual size.
        size: u64,
        /// Maximum allowed size.
        limit: u64,
    },

    /// The original filename's extension is not an allowed image type.
    #[error("only image files are allowed, got extension {0:?}")]
    DisallowedExtension(String),

    /// The declared MIME type is not an allowed image type.
    #[error("only image files are allowed, got content type {0:?}")]
    DisallowedContentType(String),
}

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The upload failed validation. Nothing was persisted.
    #[error("invalid upload: {0}")]
    Validation(#[from] ValidationError),

    /// The store is not bound to a live database connection.
    #[error("blob store is not ready: no database connection")]
    NotReady,

    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The backend failed while reading or writing data.
    #[error("blob storage I/O error: {0}")]
    Upstream(String),
}

impl BlobError {
    /// Returns `true` for errors that mean "no such blob" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
