// Authentication module
//
// Every API route needs `Authorization: Bearer <jwt>`. Tokens are HMAC
// signed with the configured secret and must carry `exp`; the caller's user
// id is the `sub` claim, which issuers send either as a JSON number or as a
// numeric string.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::catalog::UserId;
use crate::config::JwtConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization header with Bearer token is required")]
    MissingToken,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has no subject")]
    MissingSubject,

    #[error("Token subject '{0}' is not a user id")]
    InvalidSubject(String),

    #[error("Unsupported JWT algorithm '{0}'")]
    UnsupportedAlgorithm(String),
}

/// `sub` as issued: numeric or textual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subject {
    Id(u64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Option<Subject>,
    pub exp: Option<u64>,
    pub iat: Option<u64>,
    pub nbf: Option<u64>,
    pub iss: Option<String>,
    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        match self.sub.as_ref().ok_or(AuthError::MissingSubject)? {
            Subject::Id(id) => Ok(*id),
            Subject::Float(f) if *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64 => {
                Ok(*f as u64)
            }
            Subject::Float(f) => Err(AuthError::InvalidSubject(f.to_string())),
            Subject::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| AuthError::InvalidSubject(s.clone())),
        }
    }
}

// Helper function to get header value with case-insensitive matching
fn get_header_case_insensitive<'a>(
    headers: &'a HashMap<String, String>,
    header_name: &str,
) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(header_name))
        .map(|(_, value)| value.as_str())
}

pub fn extract_bearer_token(headers: &HashMap<String, String>) -> Option<String> {
    let value = get_header_case_insensitive(headers, "Authorization")?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

pub fn validate_jwt(token: &str, config: &JwtConfig) -> Result<Claims, AuthError> {
    let algorithm = config
        .algorithm()
        .ok_or_else(|| AuthError::UnsupportedAlgorithm(config.algorithm.clone()))?;

    let mut validation = Validation::new(algorithm);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::InvalidToken(e.to_string()),
    })?;

    Ok(token_data.claims)
}

/// Extract, validate and resolve the caller's user id
pub fn authenticate(
    headers: &HashMap<String, String>,
    config: &JwtConfig,
) -> Result<UserId, AuthError> {
    let token = extract_bearer_token(headers).ok_or(AuthError::MissingToken)?;
    let claims = validate_jwt(&token, config)?;
    let user_id = claims.user_id()?;
    tracing::trace!(user_id, "Authenticated request");
    Ok(user_id)
}
