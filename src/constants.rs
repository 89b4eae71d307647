// Constants module - centralized default values for configuration
//
// Every default used by the config layer lives here so the YAML defaults,
// the `Default` impls and the tests agree on a single value.

// =============================================================================
// Server defaults
// =============================================================================

/// Default request timeout in seconds (wraps the whole request, storage included)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default maximum request body size (10 MB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Route prefix shared by every authenticated endpoint
pub const API_PREFIX: &str = "/api/v1";

// =============================================================================
// Storage defaults
// =============================================================================

/// Default S3 operation timeout in seconds
pub const DEFAULT_S3_TIMEOUT_SECS: u64 = 20;

/// Default region for S3-compatible stores that ignore it (MinIO)
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Default prefix for generated object keys
pub const DEFAULT_KEY_PREFIX: &str = "image";

/// Endpoint value selecting the in-process object store
pub const MEMORY_ENDPOINT: &str = "memory://";

// =============================================================================
// Image limits
// =============================================================================

/// Maximum accepted upload size (5 MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Maximum size of a stored object fetched back for transformation (20 MB)
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 20 * 1024 * 1024;

/// Maximum decoded pixel count (40 megapixels)
pub const DEFAULT_MAX_SOURCE_PIXELS: u64 = 40_000_000;

/// Default JPEG quality for pipeline output
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Default watermark font size in pixels
pub const DEFAULT_WATERMARK_FONT_SIZE: f32 = 24.0;

// =============================================================================
// JWT defaults
// =============================================================================

/// Default signing algorithm for access tokens
pub const DEFAULT_JWT_ALGORITHM: &str = "HS256";
