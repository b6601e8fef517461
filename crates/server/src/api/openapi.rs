#![allow(clippy::needless_for_each)]

use super::schemas::{
    ErrorResponse, HealthResponse, ImageResponse, ImageUploadForm, ProductImageUrlResponse,
    ReplaceImageResponse,
};

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "Vitrine Image API",
        version = "0.1.0",
        description = "Store, serve and link product images.",
        license(name = "Apache-2.0")
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Images", description = "Image upload and serving"),
        (name = "Products", description = "Product image management")
    ),
    paths(
        super::health::health,
        super::images::serve_image,
        super::uploads::upload_image,
        super::products::replace_image,
        super::products::remove_image,
        super::products::image_url,
    ),
    components(schemas(
        HealthResponse,
        ErrorResponse,
        ImageResponse,
        ImageUploadForm,
        ProductImageUrlResponse,
        ReplaceImageResponse,
    ))
)]
pub struct ApiDoc;
