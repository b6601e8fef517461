use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BlobError;

/// Opaque, globally unique blob identifier.
///
/// Backed by a UUID v7: the leading 48 bits are a millisecond timestamp and
/// the rest is random, so ids generated concurrently (even for the same
/// filename) never collide and sort roughly by upload time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(Uuid);

impl BlobId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse an id from its string form. Returns `None` for anything that is
    /// not a well-formed id.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::try_parse(raw.trim()).ok().map(Self)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for BlobId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.as_hyphenated(), f)
    }
}

impl FromStr for BlobId {
    type Err = BlobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| BlobError::NotFound(s.to_owned()))
    }
}

/// Where a blob came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlobOrigin {
    /// Uploaded through the live API.
    Upload,
    /// Copied in by the legacy image migration.
    Migrated {
        /// Storage scheme the blob was migrated from (e.g. `"local"`).
        source: String,
    },
}

impl BlobOrigin {
    /// Short label used for persistence and logging.
    pub fn label(&self) -> &str {
        match self {
            Self::Upload => "upload",
            Self::Migrated { .. } => "migrated",
        }
    }

    /// Rebuild an origin from its persisted label and optional source.
    pub fn from_parts(label: &str, source: Option<String>) -> Self {
        match label {
            "migrated" => Self::Migrated {
                source: source.unwrap_or_else(|| "unknown".to_owned()),
            },
            _ => Self::Upload,
        }
    }

    /// The migration source, if any.
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Upload => None,
            Self::Migrated { source } => Some(source),
        }
    }
}

/// Metadata for a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    /// Unique blob identifier.
    pub id: BlobId,
    /// Stored filename: the original name prefixed with the upload time in
    /// milliseconds (`"1700000000000_photo.png"`).
    pub filename: String,
    /// Filename as supplied by the uploader.
    pub original_name: String,
    /// MIME content type (e.g. `"image/png"`).
    pub content_type: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// `SHA-256` hex digest of the blob content.
    pub checksum_sha256: String,
    /// When the blob was written.
    pub uploaded_at: DateTime<Utc>,
    /// Provenance of the blob.
    pub origin: BlobOrigin,
}

/// A stream of payload chunks.
///
/// The stream owns whatever backend handle it reads from; dropping it
/// releases that handle.
pub type BlobStream = BoxStream<'static, Result<Bytes, BlobError>>;

/// Metadata plus a lazily-read payload.
pub struct BlobDownload {
    /// Blob metadata.
    pub metadata: BlobMetadata,
    /// The payload, chunk by chunk.
    pub body: BlobStream,
}

impl fmt::Debug for BlobDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobDownload")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Outcome of a delete. Deleting a missing blob is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The blob existed and was removed.
    Deleted,
    /// There was nothing to remove.
    AlreadyAbsent,
}
