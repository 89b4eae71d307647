//! Image service
//!
//! Owner-scoped operations over the catalog and the object store. Every
//! operation that names an image checks that the caller owns it before
//! touching storage.

use std::sync::Arc;

use bytes::Bytes;
use image::ImageFormat;

use crate::catalog::{Catalog, ImageId, ImageRecord, NewImage, UserId};
use crate::config::ImageLimitsConfig;
use crate::error::ServiceError;
use crate::storage::ObjectStore;
use crate::transform::{self, TransformationRequest, TransformationSpec};

use super::transform::{TransformOrchestrator, TransformOutcome};

pub struct ImageService {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn ObjectStore>,
    orchestrator: TransformOrchestrator,
    limits: ImageLimitsConfig,
}

impl ImageService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn ObjectStore>,
        limits: ImageLimitsConfig,
    ) -> Self {
        let orchestrator = TransformOrchestrator::new(
            catalog.clone(),
            store.clone(),
            limits.pipeline_options(),
            limits.max_source_bytes,
        );
        Self {
            catalog,
            store,
            orchestrator,
            limits,
        }
    }

    pub fn limits(&self) -> &ImageLimitsConfig {
        &self.limits
    }

    /// Store an uploaded JPEG or PNG and register it for `owner`
    pub async fn upload(
        &self,
        owner: UserId,
        data: Bytes,
        alt_text: Option<String>,
    ) -> Result<ImageRecord, ServiceError> {
        if data.is_empty() {
            return Err(ServiceError::Validation("image body is empty".to_string()));
        }
        if data.len() > self.limits.max_upload_bytes {
            return Err(ServiceError::PayloadTooLarge(format!(
                "upload is {} bytes, limit is {}",
                data.len(),
                self.limits.max_upload_bytes
            )));
        }

        let (format, width, height) = transform::probe(&data)
            .map_err(|_| ServiceError::Validation("body is not a decodable image".to_string()))?;
        let content_type = match format {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            other => {
                return Err(ServiceError::Validation(format!(
                    "only JPEG and PNG uploads are accepted, got {:?}",
                    other
                )))
            }
        };
        if width as u64 * height as u64 > self.limits.max_source_pixels {
            return Err(ServiceError::Validation(format!(
                "image is {}x{}, exceeding the {} pixel limit",
                width, height, self.limits.max_source_pixels
            )));
        }

        let alt_text = alt_text.filter(|t| !t.trim().is_empty());
        let url = self.store.store(data, content_type).await?;
        let record = self
            .catalog
            .insert(NewImage {
                url,
                alt_text,
                owner_id: owner,
            })
            .await?;

        tracing::info!(
            image_id = record.id,
            owner_id = owner,
            url = %record.url,
            width,
            height,
            "Image uploaded"
        );
        Ok(record)
    }

    pub async fn get(&self, caller: UserId, id: ImageId) -> Result<ImageRecord, ServiceError> {
        self.owned(caller, id).await
    }

    /// Images of `owner`; callers may only list their own
    pub async fn list(
        &self,
        caller: UserId,
        owner: UserId,
    ) -> Result<Vec<ImageRecord>, ServiceError> {
        if caller != owner {
            return Err(ServiceError::Unauthorized(
                "cannot list another user's images".to_string(),
            ));
        }
        Ok(self.catalog.list_by_owner(owner).await?)
    }

    /// Remove the record, then the stored object
    pub async fn delete(&self, caller: UserId, id: ImageId) -> Result<(), ServiceError> {
        let _guard = self.orchestrator.lock(id).await;
        self.owned(caller, id).await?;

        let record = self.catalog.delete(id).await?;
        if let Err(e) = self.store.delete(&record.url).await {
            tracing::error!(image_id = id, url = %record.url, error = %e, "Failed to delete stored object");
            return Err(e.into());
        }

        tracing::info!(image_id = id, owner_id = caller, "Image deleted");
        Ok(())
    }

    /// Validate `request`, transform the image and repoint the catalog
    ///
    /// The request is fully validated before any storage call, so malformed
    /// parameters and unsupported formats never cause a fetch or a write.
    pub async fn transform(
        &self,
        caller: UserId,
        id: ImageId,
        request: TransformationRequest,
    ) -> Result<TransformOutcome, ServiceError> {
        let spec = TransformationSpec::try_from(request)?;
        tracing::debug!(image_id = id, stages = ?spec.stage_names(), "Transform requested");

        let _guard = self.orchestrator.lock(id).await;
        let outcome = self.orchestrator.transform(caller, id, spec).await?;
        self.catalog.update_url(id, &outcome.new_url).await?;
        Ok(outcome)
    }

    async fn owned(&self, caller: UserId, id: ImageId) -> Result<ImageRecord, ServiceError> {
        let record = self
            .catalog
            .get(id)
            .await?
            .ok_or(ServiceError::NotFound(id))?;
        if record.owner_id != caller {
            return Err(ServiceError::Unauthorized(format!(
                "image {} belongs to another user",
                id
            )));
        }
        Ok(record)
    }
}
