use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::catalog::{Product, ProductCatalog, ProductId};
use crate::error::CatalogError;
use crate::image::ProductImage;

/// Where the product table lives.
#[derive(Debug, Clone)]
pub struct PostgresCatalogConfig {
    /// Database schema (e.g. `"public"`).
    pub schema: String,
    /// Product table name.
    pub table: String,
}

impl Default for PostgresCatalogConfig {
    fn default() -> Self {
        Self {
            schema: String::from("public"),
            table: String::from("products"),
        }
    }
}

impl PostgresCatalogConfig {
    fn products_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

/// PostgreSQL-backed [`ProductCatalog`] reading and writing the nullable
/// `image` column of the product table.
pub struct PostgresCatalog {
    pool: PgPool,
    config: PostgresCatalogConfig,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool, config: PostgresCatalogConfig) -> Self {
        Self { pool, config }
    }

    /// Create the product table if it does not exist yet.
    ///
    /// The product service normally owns this table; the statement only adds
    /// the columns this crate touches.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        let table = self.config.products_table();
        let create = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                image TEXT
            )"
        );
        sqlx::query(&create).execute(&self.pool).await?;
        Ok(())
    }
}

fn decode((id, name, image): (String, String, Option<String>)) -> Product {
    Product {
        id: ProductId::new(id),
        name,
        image: ProductImage::parse(image.as_deref()),
    }
}

#[async_trait]
impl ProductCatalog for PostgresCatalog {
    async fn products_with_images(&self) -> Result<Vec<Product>, CatalogError> {
        let query = format!(
            "SELECT id, name, image FROM {} \
             WHERE image IS NOT NULL AND btrim(image) <> '' ORDER BY id",
            self.config.products_table()
        );
        let rows: Vec<(String, String, Option<String>)> =
            sqlx::query_as(&query).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(decode).collect())
    }

    async fn get(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        let query = format!(
            "SELECT id, name, image FROM {} WHERE id = $1",
            self.config.products_table()
        );
        let row: Option<(String, String, Option<String>)> = sqlx::query_as(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(decode))
    }

    async fn set_image(
        &self,
        id: &ProductId,
        image: ProductImage,
    ) -> Result<ProductImage, CatalogError> {
        let table = self.config.products_table();
        let select = format!("SELECT image FROM {table} WHERE id = $1 FOR UPDATE");
        let update = format!("UPDATE {table} SET image = $2 WHERE id = $1");

        let mut tx = self.pool.begin().await?;

        let previous: Option<(Option<String>,)> = sqlx::query_as(&select)
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let Some((previous,)) = previous else {
            return Err(CatalogError::ProductNotFound(id.clone()));
        };

        sqlx::query(&update)
            .bind(id.as_str())
            .bind(image.as_stored_value())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!(product_id = %id, %image, "product image updated");
        Ok(ProductImage::parse(previous.as_deref()))
    }

    async fn upsert(&self, product: Product) -> Result<(), CatalogError> {
        let query = format!(
            "INSERT INTO {} (id, name, image) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, image = EXCLUDED.image",
            self.config.products_table()
        );
        sqlx::query(&query)
            .bind(product.id.as_str())
            .bind(&product.name)
            .bind(product.image.as_stored_value())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_name() {
        let config = PostgresCatalogConfig::default();
        assert_eq!(config.products_table(), "public.products");

        let config = PostgresCatalogConfig {
            schema: "shop".into(),
            table: "items".into(),
        };
        assert_eq!(config.products_table(), "shop.items");
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use vitrine_blob::BlobId;
    use vitrine_blob_postgres::{Database, PostgresBlobConfig};

    use super::*;

    async fn catalog() -> (Database, PostgresCatalog) {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost:5432/vitrine_test".to_string());
        let db = Database::connect(PostgresBlobConfig::new(url))
            .await
            .expect("database should connect");
        let config = PostgresCatalogConfig {
            table: format!("test_{}_products", uuid::Uuid::new_v4().simple()),
            ..PostgresCatalogConfig::default()
        };
        let catalog = PostgresCatalog::new(db.pool().clone(), config);
        catalog.run_migrations().await.expect("migrations should run");
        (db, catalog)
    }

    #[tokio::test]
    async fn image_column_round_trip() {
        let (db, catalog) = catalog().await;
        catalog
            .upsert(Product::new("p1", "Monitor", ProductImage::Legacy("m.png".into())))
            .await
            .unwrap();
        catalog
            .upsert(Product::new("p2", "Mouse", ProductImage::None))
            .await
            .unwrap();

        let with_images = catalog.products_with_images().await.unwrap();
        assert_eq!(with_images.len(), 1);
        assert_eq!(with_images[0].id.as_str(), "p1");

        let id = BlobId::generate();
        let previous = catalog
            .set_image(&ProductId::new("p1"), ProductImage::Stored(id))
            .await
            .unwrap();
        assert_eq!(previous, ProductImage::Legacy("m.png".into()));
        let product = catalog.get(&ProductId::new("p1")).await.unwrap().unwrap();
        assert_eq!(product.image, ProductImage::Stored(id));

        let err = catalog
            .set_image(&ProductId::new("missing"), ProductImage::None)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::ProductNotFound(_)));

        db.close().await;
    }
}
