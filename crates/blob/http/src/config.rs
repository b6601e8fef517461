use std::time::Duration;

/// Configuration for the hosted object API backend.
#[derive(Clone)]
pub struct HttpBlobConfig {
    /// Collection URL; blobs live at `{base_url}/{id}`.
    pub base_url: String,

    /// Bearer token sent with every request, if any.
    pub api_key: Option<String>,

    /// Per-request timeout for metadata calls and uploads.
    ///
    /// Downloads are not bounded by this timeout once the response headers
    /// have arrived.
    pub timeout: Duration,
}

impl HttpBlobConfig {
    /// Create a configuration targeting the given collection URL.
    ///
    /// Defaults to no authentication and a 30-second timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn blob_url(&self, id: impl std::fmt::Display) -> String {
        format!("{}/{id}", self.base_url)
    }
}

impl std::fmt::Debug for HttpBlobConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBlobConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped() {
        let config = HttpBlobConfig::new("https://cdn.example.com/blobs/");
        assert_eq!(config.base_url, "https://cdn.example.com/blobs");
        assert_eq!(config.blob_url("abc"), "https://cdn.example.com/blobs/abc");
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = HttpBlobConfig::new("https://cdn.example.com").with_api_key("s3cret");
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("s3cret"));
    }
}
