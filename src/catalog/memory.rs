//! In-memory catalog with monotonically increasing ids

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{Catalog, CatalogError, ImageId, ImageRecord, NewImage, UserId};

#[derive(Clone, Default)]
pub struct MemoryCatalog {
    records: Arc<RwLock<BTreeMap<ImageId, ImageRecord>>>,
    last_id: Arc<AtomicU64>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, CatalogError> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn insert(&self, image: NewImage) -> Result<ImageRecord, CatalogError> {
        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = ImageRecord {
            id,
            url: image.url,
            alt_text: image.alt_text,
            owner_id: image.owner_id,
        };
        self.records.write().insert(id, record.clone());
        Ok(record)
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<ImageRecord>, CatalogError> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|r| r.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn update_url(&self, id: ImageId, url: &str) -> Result<ImageRecord, CatalogError> {
        let mut records = self.records.write();
        let record = records.get_mut(&id).ok_or(CatalogError::NotFound(id))?;
        record.url = url.to_string();
        Ok(record.clone())
    }

    async fn delete(&self, id: ImageId) -> Result<ImageRecord, CatalogError> {
        self.records
            .write()
            .remove(&id)
            .ok_or(CatalogError::NotFound(id))
    }
}
