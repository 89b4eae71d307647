//! Upload → transform → fetch, through the HTTP handler with in-memory
//! catalog and object store. Runs without Docker.

use bytes::Bytes;
use http::Method;
use image::{ImageFormat, Rgba, RgbaImage};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vixel::api::{handle, ApiRequest, ApiState};
use vixel::catalog::{Catalog, MemoryCatalog};
use vixel::config::{ImageLimitsConfig, JwtConfig};
use vixel::service::ImageService;
use vixel::storage::{MemoryObjectStore, ObjectStore};

const SECRET: &str = "flow-secret";

struct Harness {
    state: ApiState,
    catalog: MemoryCatalog,
    store: MemoryObjectStore,
}

impl Harness {
    fn new() -> Self {
        let catalog = MemoryCatalog::new();
        let store = MemoryObjectStore::new("images");
        let images = ImageService::new(
            Arc::new(catalog.clone()),
            Arc::new(store.clone()),
            ImageLimitsConfig::default(),
        );
        let state = ApiState {
            images: Arc::new(images),
            jwt: JwtConfig {
                secret: SECRET.to_string(),
                algorithm: "HS256".to_string(),
            },
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024,
            started: Instant::now(),
        };
        Self {
            state,
            catalog,
            store,
        }
    }

    fn auth(user_id: u64) -> String {
        let claims = serde_json::json!({
            "sub": user_id.to_string(),
            "exp": chrono::Utc::now().timestamp() + 3600,
        });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("Failed to sign token");
        format!("Bearer {}", token)
    }

    async fn upload(&self, user_id: u64, body: Vec<u8>) -> (u64, String) {
        let response = handle(
            &self.state,
            ApiRequest::new(Method::POST, "/api/v1/images")
                .with_header("Authorization", &Self::auth(user_id))
                .with_body(body),
        )
        .await;
        assert_eq!(response.status, 201, "upload failed: {:?}", response.body_json());
        let body = response.body_json().unwrap();
        (
            body["id"].as_u64().unwrap(),
            body["url"].as_str().unwrap().to_string(),
        )
    }

    async fn transform(&self, user_id: u64, id: u64, json: &str) -> (u16, serde_json::Value) {
        let response = handle(
            &self.state,
            ApiRequest::new(Method::POST, &format!("/api/v1/images/{}/transform", id))
                .with_header("Authorization", &Self::auth(user_id))
                .with_body(json.to_string()),
        )
        .await;
        let body = response.body_json().unwrap_or(serde_json::Value::Null);
        (response.status, body)
    }
}

fn create_test_jpeg_100x100() -> Vec<u8> {
    let img = RgbaImage::from_fn(100, 100, |_, _| Rgba([255, 0, 0, 255]));
    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .to_rgb8()
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .unwrap();
    buffer.into_inner()
}

#[tokio::test]
async fn test_resize_produces_new_object_with_exact_bounds() {
    let harness = Harness::new();
    let (id, original_url) = harness.upload(1, create_test_jpeg_100x100()).await;

    let (status, body) = harness
        .transform(1, id, r#"{"resize":{"width":50,"height":50}}"#)
        .await;
    assert_eq!(status, 200);

    let new_url = body["new_image_url"].as_str().unwrap();
    assert_ne!(new_url, original_url);

    let data = harness.store.fetch(new_url, usize::MAX).await.unwrap();
    let decoded = image::load_from_memory(&data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (50, 50));

    // Old object retired, catalog repointed
    assert!(!harness.store.contains(&original_url));
    let record = harness.catalog.get(id).await.unwrap().unwrap();
    assert_eq!(record.url, new_url);
}

#[tokio::test]
async fn test_bmp_conversion_is_detected_as_bmp() {
    let harness = Harness::new();
    let (id, _) = harness.upload(1, create_test_jpeg_100x100()).await;

    let (status, body) = harness
        .transform(1, id, r#"{"format_conversion":{"format":"bmp"}}"#)
        .await;
    assert_eq!(status, 200);

    let new_url = body["new_image_url"].as_str().unwrap();
    let (data, content_type) = harness.store.get(new_url).unwrap();
    assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::Bmp);
    assert_eq!(content_type, "image/bmp");
}

#[tokio::test]
async fn test_unknown_image_is_404_without_storage_calls() {
    let harness = Harness::new();
    let calls = harness.store.call_count();

    let (status, body) = harness
        .transform(1, 4242, r#"{"resize":{"width":10,"height":10}}"#)
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["status"], "not found");
    assert_eq!(harness.store.call_count(), calls);
}

#[tokio::test]
async fn test_unsupported_format_stores_nothing() {
    let harness = Harness::new();
    let (id, original_url) = harness.upload(1, create_test_jpeg_100x100()).await;
    let stores = harness.store.store_count();

    let (status, body) = harness
        .transform(1, id, r#"{"format_conversion":{"format":"webp"}}"#)
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["status"], "unsupported format");
    assert_eq!(harness.store.store_count(), stores);
    assert_eq!(harness.store.object_count(), 1);
    assert_eq!(harness.catalog.get(id).await.unwrap().unwrap().url, original_url);
}

#[tokio::test]
async fn test_other_user_cannot_transform() {
    let harness = Harness::new();
    let (id, original_url) = harness.upload(1, create_test_jpeg_100x100()).await;

    let (status, _) = harness
        .transform(2, id, r#"{"flip":{"direction":"horizontal"}}"#)
        .await;
    assert_eq!(status, 401);
    assert!(harness.store.contains(&original_url));
}

#[tokio::test]
async fn test_failed_delete_leaves_both_objects() {
    let harness = Harness::new();
    let (id, original_url) = harness.upload(1, create_test_jpeg_100x100()).await;
    harness.store.set_fail_delete(true);

    let (status, body) = harness
        .transform(1, id, r#"{"rotate":{"angle":180}}"#)
        .await;
    assert_eq!(status, 500);
    assert_eq!(body["status"], "internal server error");

    // New object is orphaned, the original is still referenced
    assert_eq!(harness.store.object_count(), 2);
    assert_eq!(harness.catalog.get(id).await.unwrap().unwrap().url, original_url);
}

#[tokio::test]
async fn test_chained_transforms_each_replace_the_previous_object() {
    let harness = Harness::new();
    let (id, _) = harness.upload(1, create_test_jpeg_100x100()).await;

    for json in [
        r#"{"crop":{"x":10,"y":10,"width":90,"height":60}}"#,
        r#"{"rotate":{"angle":90}}"#,
        r#"{"filter":{"saturation":-100},"format_conversion":{"format":"png"}}"#,
    ] {
        let (status, _) = harness.transform(1, id, json).await;
        assert_eq!(status, 200, "{} failed", json);
    }

    assert_eq!(harness.store.object_count(), 1);
    let url = harness.catalog.get(id).await.unwrap().unwrap().url;
    let (data, _) = harness.store.get(&url).unwrap();
    let decoded = image::load_from_memory(&data).unwrap().to_rgba8();
    // crop 90x60, rotated to 60x90
    assert_eq!(decoded.dimensions(), (60, 90));
    // fully desaturated
    let p = decoded.get_pixel(30, 45);
    assert!((p[0] as i32 - p[1] as i32).abs() <= 1 && (p[1] as i32 - p[2] as i32).abs() <= 1);
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let harness = Harness::new();
    let response = handle(
        &harness.state,
        ApiRequest::new(Method::POST, "/api/v1/images")
            .with_header("Authorization", &Harness::auth(1))
            .with_body(Bytes::from(vec![0u8; 5 * 1024 * 1024 + 1])),
    )
    .await;
    assert_eq!(response.status, 413);
    assert_eq!(harness.store.object_count(), 0);
}
