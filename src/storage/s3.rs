//! S3-compatible object store (AWS S3, MinIO, LocalStack).
//!
//! Uses path-style addressing with static credentials so object URLs stay
//! `<scheme>://<endpoint>/<bucket>/<key>`. Each SDK call is bounded by the
//! configured storage timeout.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

use super::{generate_object_key, object_key_from_url, object_url, ObjectStore, StorageError};
use crate::config::StorageConfig;
use crate::constants::DEFAULT_S3_REGION;
use crate::metrics::Metrics;

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    region: String,
    base_url: String,
    key_prefix: String,
    timeout: Duration,
    /// Set once the bucket and its public-read policy are known to exist
    bucket_ready: OnceCell<()>,
}

impl std::fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("bucket", &self.bucket)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Anonymous read access to every object in `bucket`
pub fn public_read_policy(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": "*",
            "Action": ["s3:GetObject"],
            "Resource": [format!("arn:aws:s3:::{}/*", bucket)]
        }]
    })
    .to_string()
}

fn backend_error<E>(context: &str, err: E) -> StorageError
where
    E: std::error::Error,
{
    StorageError::Backend(format!("{}: {}", context, DisplayErrorContext(&err)))
}

impl S3ObjectStore {
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        if config.bucket.is_empty() {
            return Err(StorageError::Backend(
                "S3 bucket name cannot be empty".to_string(),
            ));
        }

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .endpoint_url(config.endpoint_url())
            .region(aws_config::Region::new(config.region.clone()))
            .credentials_provider(aws_credential_types::Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "vixel-static",
            ))
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        tracing::info!(
            endpoint = %config.endpoint_url(),
            bucket = %config.bucket,
            "S3 object store configured"
        );

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            base_url: config.base_url(),
            key_prefix: config.key_prefix.clone(),
            timeout: config.operation_timeout(),
            bucket_ready: OnceCell::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn timed<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout {
                operation,
                secs: self.timeout.as_secs(),
            }),
        };
        Metrics::global().record_storage(operation, result.is_ok(), started);
        result
    }

    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        self.bucket_ready
            .get_or_try_init(|| async {
                self.timed("provision", self.provision_bucket()).await
            })
            .await
            .map(|_| ())
    }

    async fn provision_bucket(&self) -> Result<(), StorageError> {
        let exists = self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok();

        if !exists {
            let mut request = self.client.create_bucket().bucket(&self.bucket);
            if self.region != DEFAULT_S3_REGION {
                request = request.create_bucket_configuration(
                    CreateBucketConfiguration::builder()
                        .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                        .build(),
                );
            }
            if let Err(e) = request.send().await {
                // Another instance may have created it in the meantime
                let now_exists = self
                    .client
                    .head_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .is_ok();
                if !now_exists {
                    return Err(backend_error("create bucket", e));
                }
            } else {
                tracing::info!(bucket = %self.bucket, "Created bucket");
            }
        }

        self.client
            .put_bucket_policy()
            .bucket(&self.bucket)
            .policy(public_read_policy(&self.bucket))
            .send()
            .await
            .map_err(|e| backend_error("put bucket policy", e))?;

        tracing::debug!(bucket = %self.bucket, "Bucket ready with public-read policy");
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn fetch(&self, url: &str, max_bytes: usize) -> Result<Bytes, StorageError> {
        let key = object_key_from_url(&self.base_url, url)?;

        self.timed("fetch", async {
            let response = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| {
                    if e.as_service_error().map(|se| se.is_no_such_key()) == Some(true) {
                        StorageError::NotFound(key.clone())
                    } else {
                        backend_error("get object", e)
                    }
                })?;

            if let Some(size) = response.content_length() {
                if size > max_bytes as i64 {
                    return Err(StorageError::TooLarge {
                        key: key.clone(),
                        size: size as u64,
                        limit: max_bytes,
                    });
                }
            }

            let data = response
                .body
                .collect()
                .await
                .map_err(|e| backend_error("read object body", e))?
                .into_bytes();

            // Content-Length may be absent or wrong
            if data.len() > max_bytes {
                return Err(StorageError::TooLarge {
                    key: key.clone(),
                    size: data.len() as u64,
                    limit: max_bytes,
                });
            }
            Ok(data)
        })
        .await
    }

    async fn store(&self, data: Bytes, content_type: &str) -> Result<String, StorageError> {
        self.ensure_bucket().await?;

        let key = generate_object_key(&self.key_prefix);
        let size = data.len();

        self.timed("store", async {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .content_type(content_type)
                .body(ByteStream::from(data))
                .send()
                .await
                .map_err(|e| backend_error("put object", e))
        })
        .await?;

        let url = object_url(&self.base_url, &key);
        tracing::debug!(url = %url, size, content_type, "Stored object");
        Ok(url)
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let key = object_key_from_url(&self.base_url, url)?;

        self.timed("delete", async {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| backend_error("delete object", e))
        })
        .await?;

        tracing::debug!(url = %url, "Deleted object");
        Ok(())
    }
}
