pub mod health;
pub mod images;
pub mod openapi;
pub mod products;
pub mod schemas;
pub mod uploads;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use vitrine_blob::{BlobStore, MAX_UPLOAD_BYTES};
use vitrine_catalog::ProductImages;

use crate::config::ImagesConfig;
use crate::storage_factory::Storage;

use self::openapi::ApiDoc;

/// Room left for multipart framing on top of the largest accepted image.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Blob store serving and receiving image bytes.
    pub blobs: Arc<dyn BlobStore>,
    /// Product image operations over the same store.
    pub products: ProductImages,
    /// Image serving settings.
    pub images: Arc<ImagesConfig>,
    /// Public base URL used when building image links (no trailing slash).
    pub base_url: Arc<str>,
}

impl AppState {
    pub fn new(storage: &Storage, images: ImagesConfig, base_url: &str) -> Self {
        Self {
            blobs: Arc::clone(&storage.blobs),
            products: ProductImages::new(Arc::clone(&storage.blobs), Arc::clone(&storage.catalog)),
            images: Arc::new(images),
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }
}

/// Build the Axum router with all API routes, middleware, and Swagger UI.
pub fn router(state: AppState) -> Router {
    // Large enough that oversized images reach validation and get a
    // descriptive 400 instead of a bare 413.
    let upload_limit = usize::try_from(MAX_UPLOAD_BYTES)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let uploads = Router::new()
        .route("/images", post(uploads::upload_image))
        .route(
            "/products/{id}/image",
            put(products::replace_image).delete(products::remove_image),
        )
        .layer(DefaultBodyLimit::max(upload_limit));

    Router::new()
        .route("/health", get(health::health))
        .route("/images/{id}", get(images::serve_image))
        .route("/products/{id}/image-url", get(products::image_url))
        .merge(uploads)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
