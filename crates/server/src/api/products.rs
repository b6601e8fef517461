use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use vitrine_catalog::ProductId;

use super::AppState;
use super::schemas::{
    ErrorResponse, ImageResponse, ImageUploadForm, ProductImageUrlResponse, ReplaceImageResponse,
};
use super::uploads::read_image_field;
use crate::error::ServerError;

/// `PUT /products/{id}/image` -- replace a product's image.
#[utoipa::path(
    put,
    path = "/products/{id}/image",
    tag = "Products",
    summary = "Replace product image",
    description = "Stores the uploaded image, points the product at it and deletes the previous stored image.",
    params(("id" = String, Path, description = "Product id")),
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image replaced", body = ReplaceImageResponse),
        (status = 400, description = "Invalid upload", body = ErrorResponse),
        (status = 404, description = "Unknown product", body = ErrorResponse),
        (status = 503, description = "Storage not ready", body = ErrorResponse)
    )
)]
pub async fn replace_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ServerError> {
    let product_id = ProductId::new(id);
    let upload = read_image_field(&mut multipart).await?;
    let metadata = state.products.replace_image(&product_id, upload).await?;

    let image = ImageResponse::new(metadata, &state.base_url);
    Ok(Json(ReplaceImageResponse {
        product_id: product_id.to_string(),
        image_url: image.url.clone(),
        image,
    }))
}

/// `DELETE /products/{id}/image` -- clear a product's image.
#[utoipa::path(
    delete,
    path = "/products/{id}/image",
    tag = "Products",
    summary = "Remove product image",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 204, description = "Image removed"),
        (status = 404, description = "Unknown product", body = ErrorResponse)
    )
)]
pub async fn remove_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.products.remove_image(&ProductId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /products/{id}/image-url` -- the URL clients should load for a product.
#[utoipa::path(
    get,
    path = "/products/{id}/image-url",
    tag = "Products",
    summary = "Product image URL",
    description = "Stored images resolve to `/images/{id}`, external links are returned as is, anything else points at the placeholder.",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Current image URL", body = ProductImageUrlResponse),
        (status = 404, description = "Unknown product", body = ErrorResponse)
    )
)]
pub async fn image_url(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let product_id = ProductId::new(id);
    let image_url = state.products.image_url(&product_id, &state.base_url).await?;
    Ok(Json(ProductImageUrlResponse {
        product_id: product_id.to_string(),
        image_url,
    }))
}
