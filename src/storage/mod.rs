// Object storage
//
// Images live as opaque objects in one bucket and are addressed by public
// URL (`<scheme>://<endpoint>/<bucket>/<key>`). The `ObjectStore` trait is
// the seam between the services and the backend: S3-compatible storage in
// production, an in-memory map in tests and local runs.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::config::StorageConfig;

pub mod memory;
pub mod s3;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("URL '{0}' does not belong to the configured bucket")]
    ForeignUrl(String),

    #[error("Object '{key}' is {size} bytes, exceeding the {limit} byte limit")]
    TooLarge { key: String, size: u64, limit: usize },

    #[error("Storage {operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Blob storage for encoded images
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download the object behind `url`, refusing objects over `max_bytes`
    async fn fetch(&self, url: &str, max_bytes: usize) -> Result<Bytes, StorageError>;

    /// Upload `data` under a freshly generated key and return its public URL
    ///
    /// The bucket (with a public-read policy) is created on first use.
    async fn store(&self, data: Bytes, content_type: &str) -> Result<String, StorageError>;

    /// Remove the object behind `url`
    async fn delete(&self, url: &str) -> Result<(), StorageError>;
}

/// Build the store selected by `config` (`memory://` or an S3 endpoint)
pub async fn build_object_store(
    config: &StorageConfig,
) -> Result<Arc<dyn ObjectStore>, StorageError> {
    if config.is_memory() {
        tracing::warn!(
            bucket = %config.bucket,
            "Using in-memory object store; objects are lost on restart"
        );
        return Ok(Arc::new(
            MemoryObjectStore::new(&config.bucket).with_key_prefix(&config.key_prefix),
        ));
    }
    Ok(Arc::new(S3ObjectStore::connect(config).await?))
}

/// `<prefix>-<uuid v4>-<unix nanos>`
pub fn generate_object_key(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}-{}-{}", prefix, Uuid::new_v4(), nanos)
}

pub fn object_url(base_url: &str, key: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), key)
}

/// Recover the object key from a URL produced by `object_url`
pub fn object_key_from_url(base_url: &str, url: &str) -> Result<String, StorageError> {
    let base = base_url.trim_end_matches('/');
    url.strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StorageError::ForeignUrl(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:9000/images";

    #[test]
    fn test_generated_keys_are_prefixed_and_unique() {
        let a = generate_object_key("image");
        let b = generate_object_key("image");
        assert!(a.starts_with("image-"));
        assert_ne!(a, b);
        // prefix, five uuid groups, nanos
        assert_eq!(a.split('-').count(), 7);
    }

    #[test]
    fn test_url_round_trip() {
        let url = object_url(BASE, "image-abc-1");
        assert_eq!(url, "http://localhost:9000/images/image-abc-1");
        assert_eq!(object_key_from_url(BASE, &url).unwrap(), "image-abc-1");
        assert_eq!(
            object_key_from_url("http://localhost:9000/images/", &url).unwrap(),
            "image-abc-1"
        );
    }

    #[test]
    fn test_foreign_urls_rejected() {
        for url in [
            "http://localhost:9000/other/image-1",
            "http://localhost:9000/images",
            "http://localhost:9000/images/",
            "http://localhost:9000/imagesX/image-1",
            "https://localhost:9000/images/image-1",
            "",
        ] {
            assert!(
                matches!(object_key_from_url(BASE, url), Err(StorageError::ForeignUrl(_))),
                "{} should be foreign",
                url
            );
        }
    }

    #[tokio::test]
    async fn test_build_memory_store() {
        let store = build_object_store(&StorageConfig::memory("images"))
            .await
            .unwrap();
        let url = store
            .store(Bytes::from_static(b"abc"), "image/png")
            .await
            .unwrap();
        assert!(url.starts_with("memory://images/image-"));
    }
}
