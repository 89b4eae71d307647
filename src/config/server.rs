//! Server configuration types.
//!
//! Address and port bindings plus the two request-level bounds the API
//! enforces: the overall request deadline and the maximum body size.
//!
//! Default values are sourced from `crate::constants`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{DEFAULT_MAX_BODY_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS};

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Deadline for a whole request in seconds (default: 30)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Maximum request body size in bytes (default: 10 MB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults_applied() {
        let yaml = r#"
address: "0.0.0.0"
port: 8080
"#;
        let server: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(server.request_timeout, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(server.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert_eq!(server.listen_addr(), "0.0.0.0:8080");
        assert_eq!(server.request_deadline(), Duration::from_secs(30));
    }
}
