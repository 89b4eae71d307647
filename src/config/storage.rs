//! Object storage configuration.
//!
//! Describes the single S3-compatible bucket every image lives in. Public
//! object URLs are built as `<scheme>://<endpoint>/<bucket>/<key>`, where
//! the scheme follows `use_ssl`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_KEY_PREFIX, DEFAULT_S3_REGION, DEFAULT_S3_TIMEOUT_SECS, MEMORY_ENDPOINT,
};

fn default_region() -> String {
    DEFAULT_S3_REGION.to_string()
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_s3_timeout() -> u64 {
    DEFAULT_S3_TIMEOUT_SECS
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Host (and optional port) of the S3-compatible endpoint, without scheme.
    /// `memory://` selects the in-process store.
    pub endpoint: String,
    #[serde(default = "default_region")]
    pub region: String,
    pub bucket: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub use_ssl: bool,
    /// Prefix of generated object keys (`<prefix>-<uuid>-<nanos>`)
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Per-operation timeout in seconds (default: 20)
    #[serde(default = "default_s3_timeout")]
    pub timeout: u64,
}

// Credentials stay out of logs.
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("use_ssl", &self.use_ssl)
            .field("key_prefix", &self.key_prefix)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl StorageConfig {
    pub fn scheme(&self) -> &'static str {
        if self.use_ssl {
            "https"
        } else {
            "http"
        }
    }

    /// Endpoint URL handed to the S3 SDK, e.g. `http://minio:9000`.
    pub fn endpoint_url(&self) -> String {
        format!("{}://{}", self.scheme(), self.endpoint.trim_end_matches('/'))
    }

    /// Prefix shared by every public object URL in the bucket.
    pub fn base_url(&self) -> String {
        format!("{}/{}", self.endpoint_url(), self.bucket)
    }

    pub fn is_memory(&self) -> bool {
        self.endpoint == MEMORY_ENDPOINT
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Config for the in-process store, used by tests and local runs.
    pub fn memory(bucket: impl Into<String>) -> Self {
        Self {
            endpoint: MEMORY_ENDPOINT.to_string(),
            region: default_region(),
            bucket: bucket.into(),
            access_key: String::new(),
            secret_key: String::new(),
            use_ssl: false,
            key_prefix: default_key_prefix(),
            timeout: default_s3_timeout(),
        }
    }
}
