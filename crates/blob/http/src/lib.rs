//! Blob store backed by an externally hosted object API.
//!
//! [`HttpBlobStore`] maps the [`BlobStore`](vitrine_blob::BlobStore) contract
//! onto plain REST calls so images can live behind a CDN-fronted object
//! service instead of the database.

mod config;
mod store;

pub use config::HttpBlobConfig;
pub use store::{HttpBlobStore, METADATA_HEADER};
