// HTTP API
//
// Request handling is split in two: `handle` maps a fully read `ApiRequest`
// to an `ApiResponse` (routing, authentication, deadline, dispatch to the
// image service), and `server` adapts it to Pingora's HTTP application API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::Method;
use serde::Serialize;

use crate::auth;
use crate::catalog::UserId;
use crate::config::{Config, JwtConfig};
use crate::error::ServiceError;
use crate::metrics::Metrics;
use crate::service::ImageService;
use crate::transform::TransformationRequest;

pub mod responses;
pub mod routes;
pub mod server;

pub use responses::ApiResponse;
pub use routes::{match_route, Route, RouteError};
pub use server::VixelApp;

/// A request with its body already read
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    /// Lower-cased header names
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl ApiRequest {
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (uri.to_string(), None),
        };
        Self {
            method,
            path,
            query,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a query parameter, percent- and plus-decoded
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query.as_deref()?.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key != name {
                return None;
            }
            let value = value.replace('+', " ");
            Some(
                urlencoding::decode(&value)
                    .map(|v| v.into_owned())
                    .unwrap_or(value),
            )
        })
    }
}

/// Everything a request handler needs, shared across connections
pub struct ApiState {
    pub images: Arc<ImageService>,
    pub jwt: JwtConfig,
    pub request_timeout: Duration,
    pub max_body_size: usize,
    pub started: Instant,
}

impl ApiState {
    pub fn new(images: Arc<ImageService>, config: &Config) -> Self {
        Self {
            images,
            jwt: config.jwt.clone(),
            request_timeout: config.server.request_deadline(),
            max_body_size: config.server.max_body_size,
            started: Instant::now(),
        }
    }
}

#[derive(Serialize)]
struct TransformResponse<'a> {
    new_image_url: &'a str,
}

/// Route, authenticate and serve one request
pub async fn handle(state: &ApiState, request: ApiRequest) -> ApiResponse {
    let started = Instant::now();
    let method = request.method.clone();

    let route = match match_route(&request.method, &request.path) {
        Ok(route) => route,
        Err(e) => {
            let response = match e {
                RouteError::NotFound => ApiResponse::error(
                    404,
                    "not found",
                    &format!("no route for {}", request.path),
                ),
                RouteError::MethodNotAllowed { allowed } => {
                    ApiResponse::method_not_allowed(allowed)
                }
                RouteError::InvalidId(id) => ApiResponse::error(
                    400,
                    "invalid request body",
                    &format!("'{}' is not a valid id", id),
                ),
            };
            Metrics::global().record_http(method.as_str(), "unmatched", response.status, started);
            return response;
        }
    };

    let response = if route.requires_auth() {
        match tokio::time::timeout(state.request_timeout, serve(state, route, &request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                if e.to_http_status() >= 500 {
                    tracing::error!(route = route.label(), error = %e, "Request failed");
                } else {
                    tracing::debug!(route = route.label(), error = %e, "Request rejected");
                }
                ApiResponse::from_service_error(&e)
            }
            Err(_) => {
                let e = ServiceError::Storage(format!(
                    "request exceeded the {}s deadline",
                    state.request_timeout.as_secs()
                ));
                tracing::error!(route = route.label(), error = %e, "Request timed out");
                ApiResponse::from_service_error(&e)
            }
        }
    } else {
        serve_public(state, route)
    };

    Metrics::global().record_http(method.as_str(), route.label(), response.status, started);
    tracing::info!(
        method = %method,
        route = route.label(),
        status = response.status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request completed"
    );
    response
}

/// Image bytes and alt text of an upload
///
/// `multipart/form-data` bodies carry the file in an `image` field and the
/// text in an `alt_text` field. Any other body is the raw image, with the
/// text in the `alt_text` query parameter.
async fn upload_parts(request: &ApiRequest) -> Result<(Bytes, Option<String>), ServiceError> {
    let content_type = request
        .headers
        .get("content-type")
        .map(String::as_str)
        .unwrap_or_default();
    if !content_type
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
    {
        return Ok((request.body.clone(), request.query_param("alt_text")));
    }

    let invalid = |e: multer::Error| ServiceError::Validation(format!("invalid multipart form: {}", e));
    let boundary = multer::parse_boundary(content_type).map_err(invalid)?;
    let body = request.body.clone();
    let stream = futures::stream::once(async move { Ok::<Bytes, std::convert::Infallible>(body) });
    let mut form = multer::Multipart::new(stream, boundary);

    let mut image = None;
    let mut alt_text = request.query_param("alt_text");
    while let Some(field) = form.next_field().await.map_err(invalid)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => image = Some(field.bytes().await.map_err(invalid)?),
            Some("alt_text") => alt_text = Some(field.text().await.map_err(invalid)?),
            _ => {}
        }
    }

    let image = image.ok_or_else(|| {
        ServiceError::Validation("multipart form has no 'image' field".to_string())
    })?;
    Ok((image, alt_text))
}

/// Routes answered without a token or deadline
fn serve_public(state: &ApiState, route: Route) -> ApiResponse {
    match route {
        Route::Metrics => responses::handle_metrics(),
        _ => responses::handle_health(state.started),
    }
}

/// Authenticated routes; every one of them needs a caller
async fn serve(
    state: &ApiState,
    route: Route,
    request: &ApiRequest,
) -> Result<ApiResponse, ServiceError> {
    let caller: UserId = auth::authenticate(&request.headers, &state.jwt)?;
    let images = &state.images;

    match route {
        Route::UploadImage => {
            let (data, alt_text) = upload_parts(request).await?;
            let record = images.upload(caller, data, alt_text).await?;
            Ok(ApiResponse::json(201, &record))
        }
        Route::GetImage(id) => Ok(ApiResponse::json(200, &images.get(caller, id).await?)),
        Route::ListUserImages(owner) => {
            Ok(ApiResponse::json(200, &images.list(caller, owner).await?))
        }
        Route::DeleteImage(id) => {
            images.delete(caller, id).await?;
            Ok(ApiResponse::json(
                200,
                &serde_json::json!({"message": "image deleted"}),
            ))
        }
        Route::TransformImage(id) => {
            let transform = TransformationRequest::from_json(&request.body).map_err(|e| {
                ServiceError::Validation(format!("invalid transformation request: {}", e))
            })?;
            let outcome = images.transform(caller, id, transform).await?;
            Ok(ApiResponse::json(
                200,
                &TransformResponse {
                    new_image_url: &outcome.new_url,
                },
            ))
        }
        Route::Health | Route::Metrics => Err(ServiceError::Internal(format!(
            "{} is not an authenticated route",
            route.label()
        ))),
    }
}
