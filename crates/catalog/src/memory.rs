use async_trait::async_trait;
use dashmap::DashMap;

use crate::catalog::{Product, ProductCatalog, ProductId};
use crate::error::CatalogError;
use crate::image::ProductImage;

/// In-memory [`ProductCatalog`] for tests and the memory backend.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: DashMap<ProductId, Product>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog holding the given products.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let catalog = Self::new();
        for product in products {
            catalog.products.insert(product.id.clone(), product);
        }
        catalog
    }
}

#[async_trait]
impl ProductCatalog for MemoryCatalog {
    async fn products_with_images(&self) -> Result<Vec<Product>, CatalogError> {
        let mut products: Vec<Product> = self
            .products
            .iter()
            .filter(|entry| !entry.image.is_none())
            .map(|entry| entry.value().clone())
            .collect();
        products.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(products)
    }

    async fn get(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.get(id).map(|entry| entry.value().clone()))
    }

    async fn set_image(
        &self,
        id: &ProductId,
        image: ProductImage,
    ) -> Result<ProductImage, CatalogError> {
        let mut entry = self
            .products
            .get_mut(id)
            .ok_or_else(|| CatalogError::ProductNotFound(id.clone()))?;
        Ok(std::mem::replace(&mut entry.image, image))
    }

    async fn upsert(&self, product: Product) -> Result<(), CatalogError> {
        self.products.insert(product.id.clone(), product);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use vitrine_blob::BlobId;

    use super::*;

    #[tokio::test]
    async fn lists_only_products_with_images() {
        let catalog = MemoryCatalog::with_products([
            Product::new("b", "Printer", ProductImage::Legacy("b.png".into())),
            Product::new("a", "Monitor", ProductImage::Stored(BlobId::generate())),
            Product::new("c", "Cable", ProductImage::None),
        ]);

        let products = catalog.products_with_images().await.unwrap();
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn set_image_returns_previous() {
        let catalog = MemoryCatalog::with_products([Product::new(
            "p",
            "Laptop",
            ProductImage::Legacy("old.jpg".into()),
        )]);
        let id = BlobId::generate();

        let previous = catalog
            .set_image(&ProductId::new("p"), ProductImage::Stored(id))
            .await
            .unwrap();
        assert_eq!(previous, ProductImage::Legacy("old.jpg".into()));

        let product = catalog.get(&ProductId::new("p")).await.unwrap().unwrap();
        assert_eq!(product.image, ProductImage::Stored(id));
    }

    #[tokio::test]
    async fn set_image_on_unknown_product_fails() {
        let catalog = MemoryCatalog::new();
        let err = catalog
            .set_image(&ProductId::new("ghost"), ProductImage::None)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::ProductNotFound(id) if id.as_str() == "ghost"));
    }
}
