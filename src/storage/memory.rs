//! In-memory object store (HashMap storage) for tests and local runs

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{generate_object_key, object_key_from_url, object_url, ObjectStore, StorageError};
use crate::constants::DEFAULT_KEY_PREFIX;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// Object store keeping every object in process memory
///
/// Clones share the same objects, counters and failure switches.
#[derive(Clone)]
pub struct MemoryObjectStore {
    base_url: String,
    key_prefix: String,
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    fetches: Arc<AtomicUsize>,
    stores: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
    /// Simulate backend failures if true
    fail_fetch: Arc<RwLock<bool>>,
    fail_store: Arc<RwLock<bool>>,
    fail_delete: Arc<RwLock<bool>>,
}

impl MemoryObjectStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            base_url: format!("memory://{}", bucket),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            objects: Arc::new(RwLock::new(HashMap::new())),
            fetches: Arc::new(AtomicUsize::new(0)),
            stores: Arc::new(AtomicUsize::new(0)),
            deletes: Arc::new(AtomicUsize::new(0)),
            fail_fetch: Arc::new(RwLock::new(false)),
            fail_store: Arc::new(RwLock::new(false)),
            fail_delete: Arc::new(RwLock::new(false)),
        }
    }

    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = prefix.to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_fail_fetch(&self, enabled: bool) {
        *self.fail_fetch.write() = enabled;
    }

    pub fn set_fail_store(&self, enabled: bool) {
        *self.fail_store.write() = enabled;
    }

    pub fn set_fail_delete(&self, enabled: bool) {
        *self.fail_delete.write() = enabled;
    }

    /// Number of fetch calls, including failed ones
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Total calls of any kind
    pub fn call_count(&self) -> usize {
        self.fetch_count() + self.store_count() + self.delete_count()
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    pub fn contains(&self, url: &str) -> bool {
        object_key_from_url(&self.base_url, url)
            .map(|key| self.objects.read().contains_key(&key))
            .unwrap_or(false)
    }

    /// Stored bytes and content type, bypassing counters
    pub fn get(&self, url: &str) -> Option<(Bytes, String)> {
        let key = object_key_from_url(&self.base_url, url).ok()?;
        self.objects
            .read()
            .get(&key)
            .map(|o| (o.data.clone(), o.content_type.clone()))
    }

    pub fn clear(&self) {
        self.objects.write().clear();
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn fetch(&self, url: &str, max_bytes: usize) -> Result<Bytes, StorageError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if *self.fail_fetch.read() {
            return Err(StorageError::Backend("Simulated fetch failure".to_string()));
        }

        let key = object_key_from_url(&self.base_url, url)?;
        let data = self
            .objects
            .read()
            .get(&key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.clone()))?;

        if data.len() > max_bytes {
            return Err(StorageError::TooLarge {
                key,
                size: data.len() as u64,
                limit: max_bytes,
            });
        }
        Ok(data)
    }

    async fn store(&self, data: Bytes, content_type: &str) -> Result<String, StorageError> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        if *self.fail_store.read() {
            return Err(StorageError::Backend("Simulated store failure".to_string()));
        }

        let key = generate_object_key(&self.key_prefix);
        let url = object_url(&self.base_url, &key);
        self.objects.write().insert(
            key,
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(url)
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if *self.fail_delete.read() {
            return Err(StorageError::Backend("Simulated delete failure".to_string()));
        }

        let key = object_key_from_url(&self.base_url, url)?;
        // Deleting a missing object succeeds, as with S3
        self.objects.write().remove(&key);
        Ok(())
    }
}
