use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use vitrine_blob::BlobMetadata;

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status indicator.
    #[schema(example = "ok")]
    pub status: String,
    /// Whether the blob store is bound to a live backend.
    #[schema(example = true)]
    pub storage_ready: bool,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message.
    #[schema(example = "only image files are allowed, got extension \"txt\"")]
    pub error: String,
}

/// A stored image.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImageResponse {
    /// Blob id.
    #[schema(example = "01890f3c-6a1e-7cc2-9a3e-5c1d2b7f9e10")]
    pub id: String,
    /// Public URL serving the image.
    #[schema(example = "http://localhost:8080/images/01890f3c-6a1e-7cc2-9a3e-5c1d2b7f9e10")]
    pub url: String,
    /// Stored filename.
    #[schema(example = "1700000000000_monitor.png")]
    pub filename: String,
    /// Filename as uploaded.
    #[schema(example = "monitor.png")]
    pub original_name: String,
    /// MIME type.
    #[schema(example = "image/png")]
    pub content_type: String,
    /// Size in bytes.
    #[schema(example = 48213)]
    pub size_bytes: u64,
    /// `SHA-256` hex digest of the content.
    pub checksum_sha256: String,
    /// Upload time.
    pub uploaded_at: DateTime<Utc>,
}

impl ImageResponse {
    pub fn new(metadata: BlobMetadata, base_url: &str) -> Self {
        Self {
            id: metadata.id.to_string(),
            url: format!("{base_url}/images/{}", metadata.id),
            filename: metadata.filename,
            original_name: metadata.original_name,
            content_type: metadata.content_type,
            size_bytes: metadata.size_bytes,
            checksum_sha256: metadata.checksum_sha256,
            uploaded_at: metadata.uploaded_at,
        }
    }
}

/// A product's current image link.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductImageUrlResponse {
    /// Product id.
    #[schema(example = "p-42")]
    pub product_id: String,
    /// URL clients should load.
    #[schema(example = "http://localhost:8080/images/placeholder")]
    pub image_url: String,
}

/// Result of replacing a product image.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReplaceImageResponse {
    /// Product id.
    pub product_id: String,
    /// URL of the new image.
    pub image_url: String,
    /// The stored image.
    pub image: ImageResponse,
}

/// Placeholder query parameters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PlaceholderParams {
    /// Width in pixels (default 300).
    pub w: Option<String>,
    /// Height in pixels (default 300).
    pub h: Option<String>,
    /// Background color as six hex digits (default `f0f0f0`).
    pub color: Option<String>,
}

/// Multipart upload body, for documentation only.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    /// The image file (`jpeg`, `jpg`, `png`, `gif` or `webp`, at most 5 MiB).
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}
