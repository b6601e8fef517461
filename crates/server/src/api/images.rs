use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::{StreamExt, TryStreamExt};
use tracing::{debug, warn};
use vitrine_blob::{BlobError, BlobId, DEFAULT_CONTENT_TYPE};

use super::AppState;
use super::schemas::PlaceholderParams;
use crate::placeholder::PlaceholderSpec;

/// Id segment that selects the generated placeholder.
pub const PLACEHOLDER_ID: &str = "placeholder";

/// `GET /images/{id}` -- serve a stored image, or a generated placeholder.
///
/// Missing or unreadable images never produce an error status: the client is
/// redirected to the placeholder instead.
#[utoipa::path(
    get,
    path = "/images/{id}",
    tag = "Images",
    summary = "Serve an image",
    description = "Streams a stored image with long-lived cache headers. `placeholder` returns a generated SVG. Unknown ids redirect to the placeholder.",
    params(
        ("id" = String, Path, description = "Blob id or `placeholder`"),
        PlaceholderParams
    ),
    responses(
        (status = 200, description = "Image content"),
        (status = 304, description = "Client copy is current"),
        (status = 302, description = "Image not available, redirect to placeholder")
    )
)]
pub async fn serve_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PlaceholderParams>,
    headers: HeaderMap,
) -> Response {
    if id == PLACEHOLDER_ID {
        return placeholder(&state, &params);
    }

    match stored_image(&state, &id, &headers).await {
        Ok(response) => response,
        Err(e) => {
            match &e {
                BlobError::NotFound(_) => debug!(image_id = %id, "image not found"),
                other => warn!(image_id = %id, error = %other, "image unavailable"),
            }
            redirect_to_placeholder(&state)
        }
    }
}

fn placeholder(state: &AppState, params: &PlaceholderParams) -> Response {
    let spec = PlaceholderSpec::from_query(
        params.w.as_deref(),
        params.h.as_deref(),
        params.color.as_deref(),
        state.images.max_placeholder_dimension,
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/svg+xml".to_owned()),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", state.images.placeholder_max_age_seconds),
            ),
        ],
        spec.render(),
    )
        .into_response()
}

fn redirect_to_placeholder(state: &AppState) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, state.images.placeholder_path.clone())],
    )
        .into_response()
}

/// Whether an `If-None-Match` header matches the given entity tag.
fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .any(|tag| tag == "*" || tag.trim_start_matches("W/") == etag)
}

/// Resolve a stored image into a streaming response.
///
/// The first chunk is read before the response is built, so a failure that
/// happens right away still ends in a redirect. Later failures abort the
/// body stream.
async fn stored_image(
    state: &AppState,
    raw_id: &str,
    headers: &HeaderMap,
) -> Result<Response, BlobError> {
    let id = BlobId::parse(raw_id).ok_or_else(|| BlobError::NotFound(raw_id.to_owned()))?;
    let etag = format!("\"{id}\"");
    let cache_control = format!("public, max-age={}", state.images.image_max_age_seconds);

    let metadata = state.blobs.info(&id).await?;
    if etag_matches(headers, &etag) {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [(header::ETAG, etag), (header::CACHE_CONTROL, cache_control)],
        )
            .into_response());
    }

    let mut download = state.blobs.open(&id).await?;
    let first = download.body.try_next().await?;
    let body = futures::stream::iter(first.map(Ok)).chain(download.body);

    let content_type = if metadata.content_type.is_empty() {
        DEFAULT_CONTENT_TYPE.to_owned()
    } else {
        metadata.content_type
    };

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, metadata.size_bytes.to_string()),
            (header::CACHE_CONTROL, cache_control),
            (header::ETAG, etag),
        ],
        Body::from_stream(body),
    )
        .into_response())
}
