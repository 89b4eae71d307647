// Image catalog
//
// Metadata for every image: id, current object URL, alt text and owner.
// The catalog is the source of truth for which stored object an image id
// currently points at; transforms swap the URL once the new object exists.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;

pub use memory::MemoryCatalog;

pub type ImageId = u64;
pub type UserId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ImageId,
    pub url: String,
    pub alt_text: Option<String>,
    #[serde(rename = "user_id")]
    pub owner_id: UserId,
}

/// Fields of a record before the catalog assigns an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub url: String,
    pub alt_text: Option<String>,
    pub owner_id: UserId,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Image {0} not found")]
    NotFound(ImageId),

    #[error("Catalog backend error: {0}")]
    Backend(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Catalog: Send + Sync {
    /// `Ok(None)` when no image has this id
    async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, CatalogError>;

    async fn insert(&self, image: NewImage) -> Result<ImageRecord, CatalogError>;

    /// All images owned by `owner`, in id order
    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<ImageRecord>, CatalogError>;

    /// Point `id` at a new object URL
    async fn update_url(&self, id: ImageId, url: &str) -> Result<ImageRecord, CatalogError>;

    /// Remove and return the record
    async fn delete(&self, id: ImageId) -> Result<ImageRecord, CatalogError>;
}
