//! Transform orchestration
//!
//! Resolves an image, fetches its bytes, runs the pipeline, stores the
//! result as a new object and deletes the old one, in that order. The new
//! object always exists before the old one is removed. Nothing is rolled
//! back: a failed delete leaves both objects and reports a storage error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::catalog::{Catalog, ImageId, UserId};
use crate::error::ServiceError;
use crate::metrics::Metrics;
use crate::storage::ObjectStore;
use crate::transform::{self, OutputFormat, PipelineOptions, TransformationSpec};

/// Result of a successful transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutcome {
    pub image_id: ImageId,
    pub previous_url: String,
    pub new_url: String,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

pub struct TransformOrchestrator {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn ObjectStore>,
    options: PipelineOptions,
    max_source_bytes: usize,
    locks: parking_lot::Mutex<HashMap<ImageId, Arc<AsyncMutex<()>>>>,
}

impl TransformOrchestrator {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn ObjectStore>,
        options: PipelineOptions,
        max_source_bytes: usize,
    ) -> Self {
        Self {
            catalog,
            store,
            options,
            max_source_bytes,
            locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Exclusive access to one image for a whole read-transform-update cycle
    ///
    /// Different images never contend.
    pub async fn lock(&self, image_id: ImageId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            // Drop entries nobody is holding or waiting on
            locks.retain(|id, l| *id == image_id || Arc::strong_count(l) > 1);
            locks
                .entry(image_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of images with a live lock entry
    pub fn tracked_locks(&self) -> usize {
        self.locks.lock().len()
    }

    /// Transform `image_id` on behalf of `caller` and return the new object URL
    ///
    /// Does not touch the catalog beyond the lookup; callers update the URL,
    /// normally while holding `lock(image_id)`.
    pub async fn transform(
        &self,
        caller: UserId,
        image_id: ImageId,
        spec: TransformationSpec,
    ) -> Result<TransformOutcome, ServiceError> {
        let result = self.run(caller, image_id, spec).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        Metrics::global().record_transform(outcome);
        result
    }

    async fn run(
        &self,
        caller: UserId,
        image_id: ImageId,
        spec: TransformationSpec,
    ) -> Result<TransformOutcome, ServiceError> {
        let started = Instant::now();

        let image = self
            .catalog
            .get(image_id)
            .await?
            .ok_or(ServiceError::NotFound(image_id))?;

        if image.owner_id != caller {
            tracing::warn!(image_id, owner_id = image.owner_id, caller, "Transform denied");
            return Err(ServiceError::Unauthorized(format!(
                "image {} belongs to another user",
                image_id
            )));
        }

        let source = self.store.fetch(&image.url, self.max_source_bytes).await?;
        tracing::debug!(image_id, url = %image.url, size = source.len(), "Fetched source image");

        let output = run_pipeline(source, spec, self.options).await?;

        let new_url = self
            .store
            .store(Bytes::from(output.data), output.content_type)
            .await?;

        if let Err(e) = self.store.delete(&image.url).await {
            tracing::error!(
                image_id,
                old_url = %image.url,
                new_url = %new_url,
                error = %e,
                "Failed to delete previous object; new object left orphaned"
            );
            return Err(e.into());
        }

        tracing::info!(
            image_id,
            owner_id = caller,
            new_url = %new_url,
            format = %output.format,
            width = output.width,
            height = output.height,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Image transformed"
        );

        Ok(TransformOutcome {
            image_id,
            previous_url: image.url,
            new_url,
            format: output.format,
            width: output.width,
            height: output.height,
        })
    }
}

/// CPU-bound; kept off the async workers
async fn run_pipeline(
    source: Bytes,
    spec: TransformationSpec,
    options: PipelineOptions,
) -> Result<transform::TransformedImage, ServiceError> {
    tokio::task::spawn_blocking(move || transform::apply(&source, &spec, &options))
        .await
        .map_err(|e| ServiceError::Internal(format!("pipeline task failed: {}", e)))?
        .map_err(ServiceError::from)
}
