use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use tracing::info;
use vitrine_blob::ImageUpload;

use super::AppState;
use super::schemas::{ErrorResponse, ImageResponse, ImageUploadForm};
use crate::error::ServerError;

/// Name of the multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Pull the `image` field out of a multipart body and validate it.
///
/// Other fields are skipped. The body is buffered: uploads are capped well
/// below what the router's body limit lets through.
pub(crate) async fn read_image_field(
    multipart: &mut Multipart,
) -> Result<ImageUpload, ServerError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_owned();
        let content_type = field.content_type().unwrap_or_default().to_owned();
        let data = field.bytes().await?;
        let upload = ImageUpload::new(&file_name, &content_type, data)
            .map_err(vitrine_blob::BlobError::from)?;
        return Ok(upload);
    }
    Err(ServerError::BadRequest(format!(
        "missing multipart field \"{IMAGE_FIELD}\""
    )))
}

/// `POST /images` -- store an uploaded image.
#[utoipa::path(
    post,
    path = "/images",
    tag = "Images",
    summary = "Upload an image",
    description = "Validates and stores a `jpeg`, `jpg`, `png`, `gif` or `webp` image of at most 5 MiB.",
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image stored", body = ImageResponse),
        (status = 400, description = "Invalid upload", body = ErrorResponse),
        (status = 503, description = "Storage not ready", body = ErrorResponse),
        (status = 502, description = "Storage backend failed", body = ErrorResponse)
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ServerError> {
    let upload = read_image_field(&mut multipart).await?;
    let metadata = state.blobs.put(upload).await?;
    info!(blob_id = %metadata.id, size_bytes = metadata.size_bytes, "image uploaded");

    let body = ImageResponse::new(metadata, &state.base_url);
    let location = format!("/images/{}", body.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(body),
    ))
}
