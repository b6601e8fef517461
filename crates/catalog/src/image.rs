use std::fmt;

use vitrine_blob::BlobId;

/// What a product's image column refers to.
///
/// The raw column is a nullable string; [`ProductImage::parse`] decides once
/// what it means so that read sites never sniff strings again.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProductImage {
    /// No image.
    #[default]
    None,
    /// Absolute `http://` or `https://` URL hosted elsewhere.
    External(String),
    /// Blob in the image store.
    Stored(BlobId),
    /// File name under the legacy uploads directory, not yet migrated.
    Legacy(String),
}

impl ProductImage {
    /// Resolve a raw column value.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::None;
        };
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Self::External(raw.to_owned());
        }
        match BlobId::parse(raw) {
            Some(id) => Self::Stored(id),
            None => Self::Legacy(raw.to_owned()),
        }
    }

    /// The value to persist in the image column.
    pub fn as_stored_value(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::External(url) => Some(url.clone()),
            Self::Stored(id) => Some(id.to_string()),
            Self::Legacy(path) => Some(path.clone()),
        }
    }

    /// The blob id, when the image lives in the store.
    pub fn blob_id(&self) -> Option<BlobId> {
        match self {
            Self::Stored(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for ProductImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::External(url) => write!(f, "external:{url}"),
            Self::Stored(id) => write!(f, "stored:{id}"),
            Self::Legacy(path) => write!(f, "legacy:{path}"),
        }
    }
}

/// Public URL a client should load for an image.
///
/// External URLs are returned as-is. Stored blobs resolve to the serving
/// endpoint; anything else resolves to the placeholder.
pub fn public_url(image: &ProductImage, base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    match image {
        ProductImage::External(url) => url.clone(),
        ProductImage::Stored(id) => format!("{base}/images/{id}"),
        ProductImage::None | ProductImage::Legacy(_) => format!("{base}/images/placeholder"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_empty_values_as_none() {
        assert_eq!(ProductImage::parse(None), ProductImage::None);
        assert_eq!(ProductImage::parse(Some("")), ProductImage::None);
        assert_eq!(ProductImage::parse(Some("   ")), ProductImage::None);
    }

    #[test]
    fn parses_external_urls() {
        assert_eq!(
            ProductImage::parse(Some("https://cdn.example.com/a.png")),
            ProductImage::External("https://cdn.example.com/a.png".into())
        );
        assert_eq!(
            ProductImage::parse(Some("http://example.com/b.jpg")),
            ProductImage::External("http://example.com/b.jpg".into())
        );
    }

    #[test]
    fn parses_blob_ids_and_legacy_names() {
        let id = BlobId::generate();
        assert_eq!(
            ProductImage::parse(Some(&id.to_string())),
            ProductImage::Stored(id)
        );
        assert_eq!(
            ProductImage::parse(Some("1699999999_photo.jpg")),
            ProductImage::Legacy("1699999999_photo.jpg".into())
        );
    }

    #[test]
    fn stored_value_round_trips() {
        let id = BlobId::generate();
        for image in [
            ProductImage::None,
            ProductImage::External("https://x.test/i.png".into()),
            ProductImage::Stored(id),
            ProductImage::Legacy("old.png".into()),
        ] {
            let raw = image.as_stored_value();
            assert_eq!(ProductImage::parse(raw.as_deref()), image);
        }
    }

    #[test]
    fn public_urls() {
        let id = BlobId::generate();
        let base = "https://shop.example.com/";
        assert_eq!(
            public_url(&ProductImage::Stored(id), base),
            format!("https://shop.example.com/images/{id}")
        );
        assert_eq!(
            public_url(&ProductImage::External("https://cdn.test/a.png".into()), base),
            "https://cdn.test/a.png"
        );
        assert_eq!(
            public_url(&ProductImage::None, base),
            "https://shop.example.com/images/placeholder"
        );
        assert_eq!(
            public_url(&ProductImage::Legacy("a.png".into()), ""),
            "/images/placeholder"
        );
    }
}
