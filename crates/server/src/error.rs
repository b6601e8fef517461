use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use vitrine_blob::BlobError;
use vitrine_catalog::CatalogError;

/// Errors that can occur when running the Vitrine server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The request was malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The multipart body could not be read.
    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    /// A blob store error surfaced through the API.
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// A catalog error surfaced through the API.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn blob_status(err: &BlobError) -> StatusCode {
    match err {
        BlobError::Validation(_) => StatusCode::BAD_REQUEST,
        BlobError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        BlobError::NotFound(_) => StatusCode::NOT_FOUND,
        BlobError::Upstream(_) => StatusCode::BAD_GATEWAY,
    }
}

impl ServerError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Multipart(e) => e.status(),
            Self::Blob(e) | Self::Catalog(CatalogError::Blob(e)) => blob_status(e),
            Self::Catalog(CatalogError::ProductNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Catalog(CatalogError::Storage(_)) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, status = status.as_u16(), "request failed");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
