// Error types module

use thiserror::Error;

use crate::auth::AuthError;
use crate::catalog::{CatalogError, ImageId};
use crate::storage::StorageError;
use crate::transform::ImageError;

/// Request-level error returned by the services
///
/// Every module error folds into one of these categories, which decide the
/// HTTP status and whether any side effect may have happened.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or out-of-range input, detected before any write
    #[error("{0}")]
    Validation(String),

    /// Output format with no encoder
    #[error("{0}")]
    UnsupportedFormat(String),

    /// Missing/invalid credentials, or the caller does not own the image
    #[error("{0}")]
    Unauthorized(String),

    #[error("image {0} not found")]
    NotFound(ImageId),

    /// Upload or stored source over its size cap
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Source bytes are not a decodable image
    #[error("{0}")]
    Decode(String),

    #[error("{0}")]
    Encode(String),

    /// Object store I/O failure (fetch, store, delete, timeout)
    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn to_http_status(&self) -> u16 {
        match self {
            ServiceError::Validation(_) | ServiceError::UnsupportedFormat(_) => 400,
            ServiceError::Unauthorized(_) => 401,
            ServiceError::NotFound(_) => 404,
            ServiceError::PayloadTooLarge(_) => 413,
            ServiceError::Decode(_)
            | ServiceError::Encode(_)
            | ServiceError::Storage(_)
            | ServiceError::Internal(_) => 500,
        }
    }

    /// Short label used in the JSON error body and metrics
    pub fn label(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "invalid request body",
            ServiceError::UnsupportedFormat(_) => "unsupported format",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::NotFound(_) => "not found",
            ServiceError::PayloadTooLarge(_) => "payload too large",
            ServiceError::Decode(_)
            | ServiceError::Encode(_)
            | ServiceError::Storage(_)
            | ServiceError::Internal(_) => "internal server error",
        }
    }

    /// Metric outcome label
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::UnsupportedFormat(_) => "unsupported_format",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::PayloadTooLarge(_) => "too_large",
            ServiceError::Decode(_) => "decode",
            ServiceError::Encode(_) => "encode",
            ServiceError::Storage(_) => "storage",
            ServiceError::Internal(_) => "internal",
        }
    }
}

impl From<ImageError> for ServiceError {
    fn from(err: ImageError) -> Self {
        let message = err.to_string();
        match err {
            ImageError::UnsupportedFormat { .. } => ServiceError::UnsupportedFormat(message),
            ImageError::InvalidParameter { .. } | ImageError::ImageBombDetected { .. } => {
                ServiceError::Validation(message)
            }
            ImageError::DecodeFailed { .. } => ServiceError::Decode(message),
            ImageError::EncodeFailed { .. } => ServiceError::Encode(message),
            ImageError::ResizeFailed { .. } | ImageError::RenderFailed { .. } => {
                ServiceError::Internal(message)
            }
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TooLarge { .. } => ServiceError::PayloadTooLarge(err.to_string()),
            _ => ServiceError::Storage(err.to_string()),
        }
    }
}

impl From<CatalogError> for ServiceError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => ServiceError::NotFound(id),
            CatalogError::Backend(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        ServiceError::Unauthorized(err.to_string())
    }
}
