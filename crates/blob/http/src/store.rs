use async_trait::async_trait;
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, instrument};

use vitrine_blob::{
    BlobDownload, BlobError, BlobId, BlobMetadata, BlobStore, DeleteOutcome, ImageUpload,
};

use crate::config::HttpBlobConfig;

/// Response and request header carrying the JSON-encoded [`BlobMetadata`].
pub const METADATA_HEADER: &str = "x-vitrine-metadata";

/// [`BlobStore`] that delegates to a hosted object API.
///
/// | Operation | Request |
/// |-----------|---------|
/// | `put` | `PUT {base}/{id}` with the payload and the metadata header |
/// | `info` | `HEAD {base}/{id}` |
/// | `open` | `GET {base}/{id}`, body streamed |
/// | `delete` | `DELETE {base}/{id}`, `404` means already absent |
/// | `list` | `GET {base}?limit=n`, JSON array of metadata |
pub struct HttpBlobStore {
    config: HttpBlobConfig,
    client: Client,
}

impl HttpBlobStore {
    /// Create a store with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Upstream`] if the HTTP client cannot be built.
    pub fn new(config: HttpBlobConfig) -> Result<Self, BlobError> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| BlobError::Upstream(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Create a store sharing an existing HTTP client.
    pub fn with_client(config: HttpBlobConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.config.api_key {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn transport(e: reqwest::Error) -> BlobError {
    BlobError::Upstream(e.to_string())
}

async fn unexpected(response: Response) -> BlobError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    BlobError::Upstream(format!("HTTP {status}: {body}"))
}

fn encode_metadata(metadata: &BlobMetadata) -> Result<HeaderValue, BlobError> {
    let json = serde_json::to_vec(metadata)
        .map_err(|e| BlobError::Upstream(format!("failed to encode metadata: {e}")))?;
    // UTF-8 in names goes out as opaque header bytes.
    HeaderValue::from_bytes(&json)
        .map_err(|e| BlobError::Upstream(format!("metadata is not a valid header: {e}")))
}

fn decode_metadata(headers: &HeaderMap, id: &BlobId) -> Result<BlobMetadata, BlobError> {
    let raw = headers.get(METADATA_HEADER).ok_or_else(|| {
        BlobError::Upstream(format!("response for {id} is missing {METADATA_HEADER}"))
    })?;
    serde_json::from_slice(raw.as_bytes())
        .map_err(|e| BlobError::Upstream(format!("malformed metadata for {id}: {e}")))
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    #[instrument(
        skip(self, upload),
        fields(original_name = %upload.original_name(), size = upload.size_bytes())
    )]
    async fn put(&self, upload: ImageUpload) -> Result<BlobMetadata, BlobError> {
        let id = BlobId::generate();
        let metadata = upload.describe(id, Utc::now());
        let url = self.config.blob_url(id);

        let response = self
            .request(Method::PUT, &url)
            .timeout(self.config.timeout)
            .header(CONTENT_TYPE, &metadata.content_type)
            .header(METADATA_HEADER, encode_metadata(&metadata)?)
            .body(upload.data().clone())
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(unexpected(response).await);
        }

        debug!(blob_id = %id, %url, "stored blob");
        Ok(metadata)
    }

    async fn info(&self, id: &BlobId) -> Result<BlobMetadata, BlobError> {
        let response = self
            .request(Method::HEAD, &self.config.blob_url(id))
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(BlobError::NotFound(id.to_string())),
            status if status.is_success() => decode_metadata(response.headers(), id),
            _ => Err(unexpected(response).await),
        }
    }

    #[instrument(skip(self), fields(blob_id = %id))]
    async fn open(&self, id: &BlobId) -> Result<BlobDownload, BlobError> {
        let response = self
            .request(Method::GET, &self.config.blob_url(id))
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(BlobError::NotFound(id.to_string())),
            status if status.is_success() => {
                let metadata = decode_metadata(response.headers(), id)?;
                let body = response.bytes_stream().map_err(transport).boxed();
                Ok(BlobDownload { metadata, body })
            }
            _ => Err(unexpected(response).await),
        }
    }

    #[instrument(skip(self), fields(blob_id = %id))]
    async fn delete(&self, id: &BlobId) -> Result<DeleteOutcome, BlobError> {
        let response = self
            .request(Method::DELETE, &self.config.blob_url(id))
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::AlreadyAbsent),
            status if status.is_success() => Ok(DeleteOutcome::Deleted),
            _ => Err(unexpected(response).await),
        }
    }

    async fn list(&self, limit: Option<u32>) -> Result<Vec<BlobMetadata>, BlobError> {
        let mut request = self
            .request(Method::GET, &self.config.base_url)
            .timeout(self.config.timeout);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }

        let response = request.send().await.map_err(transport)?;
        if !response.status().is_success() {
            return Err(unexpected(response).await);
        }
        response.json().await.map_err(transport)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::Router;
    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus, header};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::get;
    use bytes::Bytes;
    use dashmap::DashMap;

    use super::*;
    use crate::config::HttpBlobConfig;

    #[derive(Clone, Default)]
    struct MockObjectApi {
        objects: Arc<DashMap<String, (Vec<u8>, Bytes)>>,
        token: Option<String>,
        fail_with: Option<u16>,
    }

    impl MockObjectApi {
        fn check(&self, headers: &AxumHeaders) -> Option<AxumResponse> {
            if let Some(code) = self.fail_with {
                let status = AxumStatus::from_u16(code).unwrap();
                return Some((status, "mock failure").into_response());
            }
            if let Some(token) = &self.token {
                let expected = format!("Bearer {token}");
                let given = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok());
                if given != Some(expected.as_str()) {
                    return Some(AxumStatus::UNAUTHORIZED.into_response());
                }
            }
            None
        }
    }

    async fn put_object(
        State(api): State<MockObjectApi>,
        Path(id): Path<String>,
        headers: AxumHeaders,
        body: Bytes,
    ) -> AxumResponse {
        if let Some(rejection) = api.check(&headers) {
            return rejection;
        }
        let Some(meta) = headers.get(METADATA_HEADER) else {
            return AxumStatus::BAD_REQUEST.into_response();
        };
        api.objects.insert(id, (meta.as_bytes().to_vec(), body));
        AxumStatus::CREATED.into_response()
    }

    async fn get_object(
        State(api): State<MockObjectApi>,
        Path(id): Path<String>,
        headers: AxumHeaders,
    ) -> AxumResponse {
        if let Some(rejection) = api.check(&headers) {
            return rejection;
        }
        match api.objects.get(&id) {
            Some(entry) => {
                let (meta, body) = entry.value();
                let meta = axum::http::HeaderValue::from_bytes(meta).unwrap();
                ([(METADATA_HEADER, meta)], body.clone()).into_response()
            }
            None => AxumStatus::NOT_FOUND.into_response(),
        }
    }

    async fn delete_object(
        State(api): State<MockObjectApi>,
        Path(id): Path<String>,
        headers: AxumHeaders,
    ) -> AxumResponse {
        if let Some(rejection) = api.check(&headers) {
            return rejection;
        }
        if api.objects.remove(&id).is_some() {
            AxumStatus::NO_CONTENT.into_response()
        } else {
            AxumStatus::NOT_FOUND.into_response()
        }
    }

    async fn list_objects(
        State(api): State<MockObjectApi>,
        Query(params): Query<HashMap<String, usize>>,
        headers: AxumHeaders,
    ) -> AxumResponse {
        if let Some(rejection) = api.check(&headers) {
            return rejection;
        }
        let mut all: Vec<BlobMetadata> = api
            .objects
            .iter()
            .map(|entry| serde_json::from_slice(&entry.value().0).unwrap())
            .collect();
        all.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(b.id.cmp(&a.id)));
        if let Some(limit) = params.get("limit") {
            all.truncate(*limit);
        }
        axum::Json(all).into_response()
    }

    /// Start an in-process object API and return its collection URL.
    async fn start(api: MockObjectApi) -> String {
        let app = Router::new()
            .route("/blobs", get(list_objects))
            .route(
                "/blobs/{id}",
                get(get_object).put(put_object).delete(delete_object),
            )
            .with_state(api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://127.0.0.1:{port}/blobs")
    }

    fn jpeg(name: &str) -> ImageUpload {
        ImageUpload::new(name, "image/jpeg", Bytes::from_static(b"\xff\xd8\xff")).unwrap()
    }

    #[tokio::test]
    async fn conformance() {
        let base = start(MockObjectApi::default()).await;
        let store = HttpBlobStore::new(HttpBlobConfig::new(base)).unwrap();
        vitrine_blob::testing::run_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn non_ascii_names_survive_the_metadata_header() {
        let base = start(MockObjectApi::default()).await;
        let store = HttpBlobStore::new(HttpBlobConfig::new(base)).unwrap();

        let meta = store.put(jpeg("café crème.jpg")).await.unwrap();
        let info = store.info(&meta.id).await.unwrap();
        assert_eq!(info.original_name, "café crème.jpg");
        assert_eq!(info, meta);
    }

    #[tokio::test]
    async fn sends_bearer_token() {
        let api = MockObjectApi {
            token: Some("test-token".into()),
            ..MockObjectApi::default()
        };
        let base = start(api).await;

        let authorized =
            HttpBlobStore::new(HttpBlobConfig::new(&base).with_api_key("test-token")).unwrap();
        let meta = authorized.put(jpeg("a.jpg")).await.unwrap();
        assert_eq!(authorized.info(&meta.id).await.unwrap().id, meta.id);

        let anonymous = HttpBlobStore::new(HttpBlobConfig::new(&base)).unwrap();
        let err = anonymous.info(&meta.id).await.unwrap_err();
        assert!(matches!(err, BlobError::Upstream(_)));
    }

    #[tokio::test]
    async fn server_errors_map_to_upstream() {
        let api = MockObjectApi {
            fail_with: Some(500),
            ..MockObjectApi::default()
        };
        let base = start(api).await;
        let store = HttpBlobStore::new(HttpBlobConfig::new(base)).unwrap();

        let err = store.put(jpeg("a.jpg")).await.unwrap_err();
        match err {
            BlobError::Upstream(msg) => assert!(msg.contains("500")),
            other => panic!("expected upstream error, got {other:?}"),
        }
        let id = BlobId::generate();
        assert!(matches!(
            store.delete(&id).await,
            Err(BlobError::Upstream(_))
        ));
        assert!(matches!(store.open(&id).await, Err(BlobError::Upstream(_))));
    }

    #[tokio::test]
    async fn unreachable_api_maps_to_upstream() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let store =
            HttpBlobStore::new(HttpBlobConfig::new(format!("http://127.0.0.1:{port}/blobs")))
                .unwrap();
        let err = store.info(&BlobId::generate()).await.unwrap_err();
        assert!(matches!(err, BlobError::Upstream(_)));
    }
}
