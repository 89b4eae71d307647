// Object key and URL handling, and the in-memory store as seen by callers

use bytes::Bytes;
use vixel::config::StorageConfig;
use vixel::storage::*;

#[test]
fn test_generated_keys_are_unique_and_prefixed() {
    let a = generate_object_key("image");
    let b = generate_object_key("image");
    assert_ne!(a, b);
    assert!(a.starts_with("image-"));
    assert!(!a.contains('/'));
}

#[test]
fn test_url_round_trip_through_base() {
    let base = "http://localhost:9000/images";
    let url = object_url(base, "image-abc-1");
    assert_eq!(url, "http://localhost:9000/images/image-abc-1");
    assert_eq!(object_key_from_url(base, &url).unwrap(), "image-abc-1");
}

#[test]
fn test_foreign_urls_rejected() {
    let base = "http://localhost:9000/images";
    for url in [
        "http://localhost:9000/other/image-1",
        "https://localhost:9000/images/image-1",
        "http://localhost:9000/images/",
        "http://localhost:9000/imagesX/image-1",
    ] {
        assert!(
            matches!(object_key_from_url(base, url), Err(StorageError::ForeignUrl(_))),
            "{} should be rejected",
            url
        );
    }
}

#[tokio::test]
async fn test_build_object_store_memory() {
    let store = build_object_store(&StorageConfig::memory("images"))
        .await
        .expect("memory store should build");

    let url = store
        .store(Bytes::from_static(b"abc"), "image/png")
        .await
        .unwrap();
    assert!(url.starts_with("memory://images/image-"));
    assert_eq!(store.fetch(&url, 16).await.unwrap(), Bytes::from_static(b"abc"));

    store.delete(&url).await.unwrap();
    assert!(matches!(
        store.fetch(&url, 16).await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_memory_store_enforces_fetch_cap() {
    let store = MemoryObjectStore::new("images");
    let url = store
        .store(Bytes::from(vec![0u8; 64]), "image/jpeg")
        .await
        .unwrap();
    assert!(matches!(
        store.fetch(&url, 63).await,
        Err(StorageError::TooLarge { size: 64, limit: 63, .. })
    ));
    assert_eq!(store.fetch(&url, 64).await.unwrap().len(), 64);
}
