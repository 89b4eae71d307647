// Configuration loading tests

use std::io::Write;
use vixel::config::*;

const FULL: &str = r#"
server:
  address: "0.0.0.0"
  port: 9090
  request_timeout: 15
  max_body_size: 8388608
storage:
  endpoint: "minio:9000"
  region: "eu-west-1"
  bucket: "photos"
  access_key: "minio"
  secret_key: "minio123"
  use_ssl: true
  key_prefix: "photo"
  timeout: 5
jwt:
  secret: "s3cr3t"
  algorithm: "HS384"
limits:
  max_upload_bytes: 1048576
  max_source_bytes: 2097152
  max_source_pixels: 1000000
  jpeg_quality: 90
  watermark_font_size: 18.5
logging:
  level: "debug"
  format: "pretty"
"#;

#[test]
fn test_full_config_round_trips_every_section() {
    let config = Config::from_yaml_with_env(FULL).expect("Failed to parse config");
    config.validate().expect("Config should be valid");

    assert_eq!(config.server.listen_addr(), "0.0.0.0:9090");
    assert_eq!(config.server.request_deadline().as_secs(), 15);
    assert_eq!(config.storage.base_url(), "https://minio:9000/photos");
    assert_eq!(config.storage.region, "eu-west-1");
    assert_eq!(config.storage.operation_timeout().as_secs(), 5);
    assert_eq!(config.jwt.algorithm(), Some(jsonwebtoken::Algorithm::HS384));
    assert_eq!(config.logging.format, LogFormat::Pretty);

    let options = config.limits.pipeline_options();
    assert_eq!(options.jpeg_quality, 90);
    assert_eq!(options.max_pixels, 1_000_000);
    assert_eq!(options.watermark_font_size, 18.5);
}

#[test]
fn test_from_file_reads_yaml() {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(FULL.as_bytes()).unwrap();

    let config = Config::from_file(file.path()).expect("Failed to load config file");
    assert_eq!(config.storage.bucket, "photos");
}

#[test]
fn test_from_file_missing_path_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read(_)));
}

#[test]
fn test_missing_required_section_fails() {
    let yaml = r#"
server:
  address: "127.0.0.1"
  port: 8080
jwt:
  secret: "x"
"#;
    assert!(matches!(
        Config::from_yaml_with_env(yaml),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_unknown_algorithm_fails_validation() {
    let yaml = FULL.replace("HS384", "RS256");
    let config = Config::from_yaml_with_env(&yaml).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("jwt.algorithm"));
}

#[test]
fn test_storage_debug_hides_credentials() {
    let config = Config::from_yaml_with_env(FULL).unwrap();
    let printed = format!("{:?}", config.storage);
    assert!(printed.contains("photos"));
    assert!(!printed.contains("minio123"));
}
