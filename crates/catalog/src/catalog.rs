use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::image::ProductImage;

/// Identifier of a product in the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The slice of a product this crate cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub image: ProductImage,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, image: ProductImage) -> Self {
        Self {
            id: ProductId::new(id),
            name: name.into(),
            image,
        }
    }
}

/// Access to product image references.
///
/// The product service owns the rest of the product record; implementations
/// only read and write the image column.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// All products whose image column is set, in id order.
    async fn products_with_images(&self) -> Result<Vec<Product>, CatalogError>;

    /// Look up a product.
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, CatalogError>;

    /// Set a product's image and return the previous one.
    ///
    /// Returns [`CatalogError::ProductNotFound`] when the product does not
    /// exist.
    async fn set_image(
        &self,
        id: &ProductId,
        image: ProductImage,
    ) -> Result<ProductImage, CatalogError>;

    /// Insert or replace a product.
    async fn upsert(&self, product: Product) -> Result<(), CatalogError>;
}
