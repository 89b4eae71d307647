//! S3 object store against LocalStack
//!
//! These tests use testcontainers to run LocalStack in Docker.
//!
//! Run with:
//!   cargo test --test integration_tests s3_localstack -- --ignored --nocapture

use bytes::Bytes;
use std::io::Cursor;
use std::sync::Arc;
use testcontainers::{clients::Cli, RunnableImage};
use testcontainers_modules::localstack::LocalStack;
use vixel::catalog::{Catalog, MemoryCatalog};
use vixel::config::{ImageLimitsConfig, StorageConfig};
use vixel::service::ImageService;
use vixel::storage::{ObjectStore, S3ObjectStore, StorageError};
use vixel::transform::TransformationRequest;

fn localstack_config(port: u16, bucket: &str) -> StorageConfig {
    StorageConfig {
        endpoint: format!("127.0.0.1:{}", port),
        bucket: bucket.to_string(),
        access_key: "test".to_string(),
        secret_key: "test".to_string(),
        ..StorageConfig::memory(bucket)
    }
}

fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([0, 128, 255]));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Jpeg).unwrap();
    buffer.into_inner()
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_store_fetch_delete_round_trip() {
    let docker = Cli::default();
    let container =
        docker.run(RunnableImage::from(LocalStack::default()).with_env_var(("SERVICES", "s3")));
    let port = container.get_host_port_ipv4(4566);

    let config = localstack_config(port, "vixel-roundtrip");
    let store = S3ObjectStore::connect(&config)
        .await
        .expect("Failed to build S3 client");

    // Bucket does not exist yet; the first store creates it
    let url = store
        .store(Bytes::from(create_test_jpeg(10, 10)), "image/jpeg")
        .await
        .expect("Failed to store object");
    assert!(url.starts_with(&format!("http://127.0.0.1:{}/vixel-roundtrip/image-", port)));

    let data = store.fetch(&url, 1024 * 1024).await.expect("Failed to fetch");
    assert_eq!(image::guess_format(&data).unwrap(), image::ImageFormat::Jpeg);

    assert!(matches!(
        store.fetch(&url, 8).await,
        Err(StorageError::TooLarge { .. })
    ));

    store.delete(&url).await.expect("Failed to delete");
    assert!(matches!(
        store.fetch(&url, 1024 * 1024).await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_stored_objects_are_publicly_readable() {
    let docker = Cli::default();
    let container =
        docker.run(RunnableImage::from(LocalStack::default()).with_env_var(("SERVICES", "s3")));
    let port = container.get_host_port_ipv4(4566);

    let config = localstack_config(port, "vixel-public");
    let store = S3ObjectStore::connect(&config).await.unwrap();
    store
        .store(Bytes::from_static(b"x"), "image/png")
        .await
        .unwrap();

    let sdk = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .endpoint_url(config.endpoint_url())
        .region(aws_config::Region::new("us-east-1"))
        .credentials_provider(aws_credential_types::Credentials::new(
            "test", "test", None, None, "test",
        ))
        .load()
        .await;
    let client = aws_sdk_s3::Client::from_conf(
        aws_sdk_s3::config::Builder::from(&sdk)
            .force_path_style(true)
            .build(),
    );
    let policy = client
        .get_bucket_policy()
        .bucket("vixel-public")
        .send()
        .await
        .expect("Bucket policy should exist");
    let policy = policy.policy().unwrap_or_default();
    assert!(policy.contains("s3:GetObject"));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_transform_against_real_bucket() {
    let docker = Cli::default();
    let container =
        docker.run(RunnableImage::from(LocalStack::default()).with_env_var(("SERVICES", "s3")));
    let port = container.get_host_port_ipv4(4566);

    let config = localstack_config(port, "vixel-transform");
    let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::connect(&config).await.unwrap());
    let catalog = MemoryCatalog::new();
    let service = ImageService::new(
        Arc::new(catalog.clone()),
        store.clone(),
        ImageLimitsConfig::default(),
    );

    let record = service
        .upload(1, Bytes::from(create_test_jpeg(100, 100)), None)
        .await
        .unwrap();
    let request =
        TransformationRequest::from_json(br#"{"resize":{"width":50,"height":50}}"#).unwrap();
    let outcome = service.transform(1, record.id, request).await.unwrap();

    let data = store.fetch(&outcome.new_url, 1024 * 1024).await.unwrap();
    let decoded = image::load_from_memory(&data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (50, 50));
    assert!(matches!(
        store.fetch(&record.url, 1024 * 1024).await,
        Err(StorageError::NotFound(_))
    ));
    assert_eq!(catalog.get(record.id).await.unwrap().unwrap().url, outcome.new_url);
}
