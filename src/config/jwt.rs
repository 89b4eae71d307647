//! JWT configuration types for token validation.
//!
//! Tokens are issued elsewhere; this service only validates them. A single
//! shared HMAC secret is supported with one of `HS256`, `HS384` or `HS512`.

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_JWT_ALGORITHM;

fn default_algorithm() -> String {
    DEFAULT_JWT_ALGORITHM.to_string()
}

/// JWT validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Shared HMAC secret. Must be non-empty (checked by `Config::validate`).
    pub secret: String,
    /// Signing algorithm. Supported values: `HS256`, `HS384`, `HS512`.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

impl JwtConfig {
    /// Resolve the configured algorithm name.
    pub fn algorithm(&self) -> Option<Algorithm> {
        match self.algorithm.to_ascii_uppercase().as_str() {
            "HS256" => Some(Algorithm::HS256),
            "HS384" => Some(Algorithm::HS384),
            "HS512" => Some(Algorithm::HS512),
            _ => None,
        }
    }
}
