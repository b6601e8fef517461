pub mod chunk;
pub mod error;
pub mod store;
pub mod testing;
pub mod types;
pub mod upload;

pub use chunk::{DEFAULT_CHUNK_SIZE, chunk_count, split_chunks};
pub use error::{BlobError, ValidationError};
pub use store::BlobStore;
pub use types::{BlobDownload, BlobId, BlobMetadata, BlobOrigin, BlobStream, DeleteOutcome};
pub use upload::{
    ALLOWED_IMAGE_TYPES, DEFAULT_CONTENT_TYPE, ImageUpload, MAX_UPLOAD_BYTES, mime_for_extension,
};
