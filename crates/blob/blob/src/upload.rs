use bytes::Bytes;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;
use crate::types::{BlobId, BlobMetadata, BlobOrigin};

/// Largest accepted upload: 5 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Image types accepted both as filename extensions and as MIME subtypes.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];

/// Content type assumed when none is known.
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Map a file extension (with or without the leading dot, any case) to a MIME
/// type. Unknown extensions map to [`DEFAULT_CONTENT_TYPE`].
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Lowercased extension of `name`, without the dot.
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Build the stored filename: upload time in milliseconds, an underscore,
/// then the original name.
pub fn stored_filename(original_name: &str, at: DateTime<Utc>) -> String {
    format!("{}_{original_name}", at.timestamp_millis())
}

/// Hex-encoded `SHA-256` of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Last path segment of an uploader-supplied filename.
fn base_name(raw: &str) -> &str {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    if name.is_empty() { "upload" } else { name }
}

fn is_allowed(kind: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&kind)
}

fn check_content_type(content_type: &str) -> Result<String, ValidationError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.strip_prefix("image/") {
        Some(subtype) if is_allowed(subtype) => Ok(essence),
        _ => Err(ValidationError::DisallowedContentType(
            content_type.to_owned(),
        )),
    }
}

/// A validated image upload.
///
/// Holding an `ImageUpload` proves the payload is non-empty. Uploads built
/// with [`ImageUpload::new`] are also within [`MAX_UPLOAD_BYTES`] and declared
/// as an allowed image type by both their filename extension and their MIME
/// type. Migrated files only carry the non-empty guarantee.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    original_name: String,
    content_type: String,
    data: Bytes,
    origin: BlobOrigin,
}

impl ImageUpload {
    /// Validate an upload coming from the live API.
    pub fn new(
        original_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<Self, ValidationError> {
        if data.is_empty() {
            return Err(ValidationError::Empty);
        }
        let size = data.len() as u64;
        if size > MAX_UPLOAD_BYTES {
            return Err(ValidationError::TooLarge {
                size,
                limit: MAX_UPLOAD_BYTES,
            });
        }

        let original_name = base_name(original_name);
        match extension_of(original_name) {
            Some(ext) if is_allowed(&ext) => {}
            other => {
                return Err(ValidationError::DisallowedExtension(
                    other.unwrap_or_default(),
                ));
            }
        }
        let content_type = check_content_type(content_type)?;

        Ok(Self {
            original_name: original_name.to_owned(),
            content_type,
            data,
            origin: BlobOrigin::Upload,
        })
    }

    /// Wrap a file being migrated from legacy storage.
    ///
    /// Legacy files were accepted long ago, so only emptiness is checked. The
    /// MIME type is inferred from the extension, with unknown or missing
    /// extensions stored as [`DEFAULT_CONTENT_TYPE`].
    pub fn migrated(
        original_name: &str,
        data: Bytes,
        source: &str,
    ) -> Result<Self, ValidationError> {
        if data.is_empty() {
            return Err(ValidationError::Empty);
        }
        let original_name = base_name(original_name);
        let content_type = extension_of(original_name)
            .map_or(DEFAULT_CONTENT_TYPE, |ext| mime_for_extension(&ext));
        Ok(Self {
            original_name: original_name.to_owned(),
            content_type: content_type.to_owned(),
            data,
            origin: BlobOrigin::Migrated {
                source: source.to_owned(),
            },
        })
    }

    /// Override the recorded provenance.
    #[must_use]
    pub fn with_origin(mut self, origin: BlobOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Filename as supplied by the uploader (path components stripped).
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Normalized MIME type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Recorded provenance.
    pub fn origin(&self) -> &BlobOrigin {
        &self.origin
    }

    /// Payload size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    /// Build the metadata a backend persists for this upload.
    pub fn describe(&self, id: BlobId, uploaded_at: DateTime<Utc>) -> BlobMetadata {
        BlobMetadata {
            id,
            filename: stored_filename(&self.original_name, uploaded_at),
            original_name: self.original_name.clone(),
            content_type: self.content_type.clone(),
            size_bytes: self.size_bytes(),
            checksum_sha256: sha256_hex(&self.data),
            uploaded_at,
            origin: self.origin.clone(),
        }
    }
}
