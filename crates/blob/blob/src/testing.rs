use std::collections::HashSet;

use bytes::Bytes;
use futures::future::join_all;

use crate::error::{BlobError, ValidationError};
use crate::store::BlobStore;
use crate::types::{BlobId, DeleteOutcome};
use crate::upload::{ImageUpload, MAX_UPLOAD_BYTES};

fn sample_payload(len: usize, seed: u8) -> Bytes {
    Bytes::from(
        (0..len)
            .map(|i| seed.wrapping_add(u8::try_from(i % 251).unwrap_or_default()))
            .collect::<Vec<_>>(),
    )
}

fn png_upload(name: &str, len: usize, seed: u8) -> ImageUpload {
    ImageUpload::new(name, "image/png", sample_payload(len, seed)).expect("valid upload")
}

/// Run the full blob store conformance test suite.
///
/// Call this from your backend's test module with a fresh, ready store.
///
/// # Errors
///
/// Returns an error if the backend fails an operation outright; behavioural
/// mismatches panic with a descriptive assertion.
pub async fn run_store_conformance_tests(store: &dyn BlobStore) -> Result<(), BlobError> {
    test_put_then_read_round_trip(store).await?;
    test_info_matches_put(store).await?;
    test_missing_blob_is_not_found(store).await?;
    test_delete_is_idempotent(store).await?;
    test_same_filename_never_overwrites(store).await?;
    test_rejected_upload_is_not_persisted(store).await?;
    test_concurrent_puts_yield_distinct_ids(store).await?;
    Ok(())
}

async fn test_put_then_read_round_trip(store: &dyn BlobStore) -> Result<(), BlobError> {
    let payload = sample_payload(700 * 1024, 3);
    let upload = ImageUpload::new("round-trip.jpg", "image/jpeg", payload.clone())
        .expect("valid upload");
    let meta = store.put(upload).await?;

    let (read_meta, bytes) = store.read_to_bytes(&meta.id).await?;
    assert_eq!(bytes, payload, "payload should round-trip byte for byte");
    assert_eq!(read_meta.content_type, "image/jpeg");
    assert_eq!(read_meta.size_bytes, payload.len() as u64);
    Ok(())
}

async fn test_info_matches_put(store: &dyn BlobStore) -> Result<(), BlobError> {
    let meta = store.put(png_upload("info.png", 2048, 9)).await?;
    let info = store.info(&meta.id).await?;
    assert_eq!(info.id, meta.id);
    assert_eq!(info.original_name, "info.png");
    assert_eq!(info.filename, meta.filename);
    assert!(
        info.filename.ends_with("_info.png"),
        "stored filename should carry a timestamp prefix"
    );
    assert_eq!(info.size_bytes, 2048);
    assert_eq!(info.checksum_sha256, meta.checksum_sha256);
    Ok(())
}

async fn test_missing_blob_is_not_found(store: &dyn BlobStore) -> Result<(), BlobError> {
    let missing = BlobId::generate();
    let err = store
        .info(&missing)
        .await
        .expect_err("info on a missing blob should fail");
    assert!(err.is_not_found(), "expected NotFound, got {err}");

    let err = store
        .open(&missing)
        .await
        .expect_err("open on a missing blob should fail");
    assert!(err.is_not_found(), "expected NotFound, got {err}");
    Ok(())
}

async fn test_delete_is_idempotent(store: &dyn BlobStore) -> Result<(), BlobError> {
    let meta = store.put(png_upload("delete-me.png", 128, 1)).await?;

    let first = store.delete(&meta.id).await?;
    assert_eq!(first, DeleteOutcome::Deleted);

    let second = store.delete(&meta.id).await?;
    assert_eq!(
        second,
        DeleteOutcome::AlreadyAbsent,
        "second delete should report the blob as already gone"
    );

    let err = store
        .open(&meta.id)
        .await
        .expect_err("deleted blob should be gone");
    assert!(err.is_not_found());
    Ok(())
}

async fn test_same_filename_never_overwrites(store: &dyn BlobStore) -> Result<(), BlobError> {
    let first = store.put(png_upload("same.png", 64, 10)).await?;
    let second = store.put(png_upload("same.png", 64, 20)).await?;
    assert_ne!(first.id, second.id);

    let (_, a) = store.read_to_bytes(&first.id).await?;
    let (_, b) = store.read_to_bytes(&second.id).await?;
    assert_eq!(a, sample_payload(64, 10));
    assert_eq!(b, sample_payload(64, 20));
    Ok(())
}

async fn test_rejected_upload_is_not_persisted(store: &dyn BlobStore) -> Result<(), BlobError> {
    let marker = format!("rejected-{}.png", BlobId::generate());
    let oversized = sample_payload(usize::try_from(MAX_UPLOAD_BYTES).unwrap_or(usize::MAX) + 1, 0);
    let err = ImageUpload::new(&marker, "image/png", oversized)
        .expect_err("oversized upload should be rejected");
    assert!(matches!(err, ValidationError::TooLarge { .. }));

    let listed = store.list(None).await?;
    assert!(
        listed.iter().all(|m| m.original_name != marker),
        "rejected upload must not appear in the store"
    );
    Ok(())
}

async fn test_concurrent_puts_yield_distinct_ids(store: &dyn BlobStore) -> Result<(), BlobError> {
    let uploads = (0..100u8).map(|i| store.put(png_upload(&format!("concurrent-{i}.png"), 32, i)));
    let results = join_all(uploads).await;

    let mut ids = HashSet::new();
    for result in results {
        ids.insert(result?.id);
    }
    assert_eq!(ids.len(), 100, "every concurrent put should get its own id");

    for id in &ids {
        store.info(id).await?;
    }
    Ok(())
}
