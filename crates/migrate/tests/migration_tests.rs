use std::sync::Arc;

use async_trait::async_trait;
use vitrine_blob::{BlobId, BlobOrigin, BlobStore, MAX_UPLOAD_BYTES};
use vitrine_blob_memory::MemoryBlobStore;
use vitrine_catalog::{
    CatalogError, MemoryCatalog, Product, ProductCatalog, ProductId, ProductImage,
};
use vitrine_migrate::{ImageMigration, MigrationError, MigrationItemError, MigrationOptions};

const JPEG: &[u8] = b"\xff\xd8\xff\xe0fake-jpeg";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-png";

fn legacy(id: &str, file: &str) -> Product {
    Product::new(id, format!("product {id}"), ProductImage::Legacy(file.into()))
}

async fn image_of(catalog: &MemoryCatalog, id: &str) -> ProductImage {
    catalog
        .get(&ProductId::new(id))
        .await
        .unwrap()
        .expect("product exists")
        .image
}

#[tokio::test]
async fn migrates_legacy_files_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("1699_monitor.jpg"), JPEG).unwrap();
    std::fs::write(dir.path().join("printer.PNG"), PNG).unwrap();

    let stored = BlobId::generate();
    let catalog = MemoryCatalog::with_products([
        legacy("p1", "1699_monitor.jpg"),
        legacy("p2", "printer.PNG"),
        Product::new("p3", "stored", ProductImage::Stored(stored)),
        Product::new("p4", "cdn", ProductImage::External("https://cdn.test/x.png".into())),
        Product::new("p5", "none", ProductImage::None),
    ]);
    let blobs = MemoryBlobStore::new();

    let report = ImageMigration::new(&blobs, &catalog, MigrationOptions::new(dir.path()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.scanned, 4);
    assert_eq!(report.migrated, 2);
    assert_eq!(report.already_stored, 1);
    assert_eq!(report.external, 1);
    assert!(report.is_clean());
    assert_eq!(blobs.len(), 2);

    let ProductImage::Stored(id) = image_of(&catalog, "p1").await else {
        panic!("p1 should reference a blob");
    };
    let (meta, data) = blobs.read_to_bytes(&id).await.unwrap();
    assert_eq!(data.as_ref(), JPEG);
    assert_eq!(meta.content_type, "image/jpeg");
    assert_eq!(meta.original_name, "1699_monitor.jpg");
    assert_eq!(
        meta.origin,
        BlobOrigin::Migrated {
            source: "local".into()
        }
    );

    let ProductImage::Stored(id) = image_of(&catalog, "p2").await else {
        panic!("p2 should reference a blob");
    };
    assert_eq!(blobs.info(&id).await.unwrap().content_type, "image/png");
    assert_eq!(image_of(&catalog, "p3").await, ProductImage::Stored(stored));

    // Files stay on disk unless removal was requested.
    assert!(dir.path().join("1699_monitor.jpg").exists());

    let second = ImageMigration::new(&blobs, &catalog, MigrationOptions::new(dir.path()))
        .run()
        .await
        .unwrap();
    assert_eq!(second.migrated, 0);
    assert_eq!(second.already_stored, 3);
    assert_eq!(blobs.len(), 2);
}

#[tokio::test]
async fn missing_files_are_skipped_and_bad_items_do_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ok.webp"), b"RIFF----WEBP").unwrap();
    std::fs::write(dir.path().join("empty.gif"), b"").unwrap();

    let catalog = MemoryCatalog::with_products([
        legacy("a", "gone.jpg"),
        legacy("c", "../outside.png"),
        legacy("d", "empty.gif"),
        legacy("e", "ok.webp"),
    ]);
    let blobs = MemoryBlobStore::new();

    let report = ImageMigration::new(&blobs, &catalog, MigrationOptions::new(dir.path()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.scanned, 4);
    assert_eq!(report.missing, 1);
    assert_eq!(report.migrated, 1);
    assert_eq!(report.failed(), 2);

    let failed: Vec<&str> = report
        .failures
        .iter()
        .map(|f| f.product_id.as_str())
        .collect();
    assert_eq!(failed, ["c", "d"]);
    assert!(matches!(
        report.failures[0].error,
        MigrationItemError::UnsafePath(_)
    ));

    assert_eq!(image_of(&catalog, "a").await, ProductImage::Legacy("gone.jpg".into()));
    assert!(matches!(image_of(&catalog, "e").await, ProductImage::Stored(_)));
    assert_eq!(blobs.len(), 1);
}

#[tokio::test]
async fn legacy_files_bypass_upload_restrictions() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("legacy.bmp"), b"BM-fake-bitmap").unwrap();
    std::fs::write(dir.path().join("noext"), JPEG).unwrap();
    let huge = vec![0xff_u8; usize::try_from(MAX_UPLOAD_BYTES).unwrap() + 1];
    std::fs::write(dir.path().join("huge.png"), &huge).unwrap();

    let catalog = MemoryCatalog::with_products([
        legacy("a", "legacy.bmp"),
        legacy("b", "noext"),
        legacy("c", "huge.png"),
    ]);
    let blobs = MemoryBlobStore::new();

    let report = ImageMigration::new(&blobs, &catalog, MigrationOptions::new(dir.path()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.migrated, 3);
    assert!(report.is_clean());

    for (product, content_type, size) in [
        ("a", "image/jpeg", 14),
        ("b", "image/jpeg", JPEG.len()),
        ("c", "image/png", huge.len()),
    ] {
        let ProductImage::Stored(id) = image_of(&catalog, product).await else {
            panic!("{product} should reference a blob");
        };
        let meta = blobs.info(&id).await.unwrap();
        assert_eq!(meta.content_type, content_type, "{product}");
        assert_eq!(meta.size_bytes, u64::try_from(size).unwrap(), "{product}");
    }
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.jpg"), JPEG).unwrap();

    let catalog = MemoryCatalog::with_products([legacy("p1", "a.jpg")]);
    let blobs = MemoryBlobStore::new();
    let options = MigrationOptions {
        dry_run: true,
        remove_source: true,
        ..MigrationOptions::new(dir.path())
    };

    let report = ImageMigration::new(&blobs, &catalog, options)
        .run()
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.migrated, 1);
    assert!(blobs.is_empty());
    assert_eq!(image_of(&catalog, "p1").await, ProductImage::Legacy("a.jpg".into()));
    assert!(dir.path().join("a.jpg").exists());
}

#[tokio::test]
async fn remove_source_deletes_migrated_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.jpg"), JPEG).unwrap();

    let catalog = MemoryCatalog::with_products([legacy("p1", "a.jpg")]);
    let blobs = MemoryBlobStore::new();
    let options = MigrationOptions {
        remove_source: true,
        ..MigrationOptions::new(dir.path())
    };

    let report = ImageMigration::new(&blobs, &catalog, options)
        .run()
        .await
        .unwrap();

    assert_eq!(report.migrated, 1);
    assert!(!dir.path().join("a.jpg").exists());
}

/// Catalog whose writes always fail.
struct ReadOnlyCatalog(MemoryCatalog);

#[async_trait]
impl ProductCatalog for ReadOnlyCatalog {
    async fn products_with_images(&self) -> Result<Vec<Product>, CatalogError> {
        self.0.products_with_images().await
    }
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        self.0.get(id).await
    }
    async fn set_image(
        &self,
        _id: &ProductId,
        _image: ProductImage,
    ) -> Result<ProductImage, CatalogError> {
        Err(CatalogError::Storage("read-only".into()))
    }
    async fn upsert(&self, _product: Product) -> Result<(), CatalogError> {
        Err(CatalogError::Storage("read-only".into()))
    }
}

#[tokio::test]
async fn failed_product_update_removes_the_new_blob() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.jpg"), JPEG).unwrap();

    let catalog = ReadOnlyCatalog(MemoryCatalog::with_products([legacy("p1", "a.jpg")]));
    let blobs = Arc::new(MemoryBlobStore::new());

    let report = ImageMigration::new(blobs.as_ref(), &catalog, MigrationOptions::new(dir.path()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.failures[0].error,
        MigrationItemError::Catalog(CatalogError::Storage(_))
    ));
    assert!(blobs.is_empty());
    assert!(dir.path().join("a.jpg").exists());
}

/// Catalog that cannot even list products.
struct BrokenCatalog;

#[async_trait]
impl ProductCatalog for BrokenCatalog {
    async fn products_with_images(&self) -> Result<Vec<Product>, CatalogError> {
        Err(CatalogError::Storage("connection reset".into()))
    }
    async fn get(&self, _id: &ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(None)
    }
    async fn set_image(
        &self,
        id: &ProductId,
        _image: ProductImage,
    ) -> Result<ProductImage, CatalogError> {
        Err(CatalogError::ProductNotFound(id.clone()))
    }
    async fn upsert(&self, _product: Product) -> Result<(), CatalogError> {
        Ok(())
    }
}

#[tokio::test]
async fn enumeration_failure_aborts_the_run() {
    let blobs = MemoryBlobStore::new();
    let err = ImageMigration::new(&blobs, &BrokenCatalog, MigrationOptions::new("/tmp"))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::Enumerate(_)));
}

#[tokio::test]
async fn unbound_store_is_an_item_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.jpg"), JPEG).unwrap();

    struct Unbound;

    #[async_trait]
    impl BlobStore for Unbound {
        async fn put(
            &self,
            _upload: vitrine_blob::ImageUpload,
        ) -> Result<vitrine_blob::BlobMetadata, vitrine_blob::BlobError> {
            Err(vitrine_blob::BlobError::NotReady)
        }
        async fn info(
            &self,
            id: &BlobId,
        ) -> Result<vitrine_blob::BlobMetadata, vitrine_blob::BlobError> {
            Err(vitrine_blob::BlobError::NotFound(id.to_string()))
        }
        async fn open(
            &self,
            id: &BlobId,
        ) -> Result<vitrine_blob::BlobDownload, vitrine_blob::BlobError> {
            Err(vitrine_blob::BlobError::NotFound(id.to_string()))
        }
        async fn delete(
            &self,
            _id: &BlobId,
        ) -> Result<vitrine_blob::DeleteOutcome, vitrine_blob::BlobError> {
            Err(vitrine_blob::BlobError::NotReady)
        }
        async fn list(
            &self,
            _limit: Option<u32>,
        ) -> Result<Vec<vitrine_blob::BlobMetadata>, vitrine_blob::BlobError> {
            Err(vitrine_blob::BlobError::NotReady)
        }
        fn is_ready(&self) -> bool {
            false
        }
    }

    let catalog = MemoryCatalog::with_products([legacy("p1", "a.jpg")]);
    let report = ImageMigration::new(&Unbound, &catalog, MigrationOptions::new(dir.path()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.failures[0].error,
        MigrationItemError::Blob(vitrine_blob::BlobError::NotReady)
    ));
    assert_eq!(image_of(&catalog, "p1").await, ProductImage::Legacy("a.jpg".into()));
}
