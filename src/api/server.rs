//! Pingora adapter
//!
//! `VixelApp` implements `ServeHttp`: it reads the request (head and body,
//! bounded by `server.max_body_size`), hands it to [`super::handle`] and
//! converts the result into an `http::Response`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use http::{header, Response, StatusCode};
use pingora_core::apps::http_app::{HttpServer, ServeHttp};
use pingora_core::protocols::http::ServerSession;
use pingora_core::services::listening::Service;

use super::{handle, ApiRequest, ApiResponse, ApiState};

pub struct VixelApp {
    state: Arc<ApiState>,
}

impl VixelApp {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }

    /// Listening service for `addr`, ready to register with a Pingora server
    pub fn service(state: Arc<ApiState>, addr: &str) -> Service<HttpServer<VixelApp>> {
        let mut service = Service::new(
            "vixel http".to_string(),
            HttpServer::new_app(VixelApp::new(state)),
        );
        service.add_tcp(addr);
        service
    }
}

/// Read the whole body, failing once it grows past `limit`
async fn read_body(session: &mut ServerSession, limit: usize) -> Result<bytes::Bytes, ApiResponse> {
    let mut body = BytesMut::new();
    loop {
        match session.read_request_body().await {
            Ok(Some(chunk)) => {
                if body.len() + chunk.len() > limit {
                    return Err(ApiResponse::error(
                        413,
                        "payload too large",
                        &format!("request body exceeds {} bytes", limit),
                    ));
                }
                body.extend_from_slice(&chunk);
            }
            Ok(None) => return Ok(body.freeze()),
            Err(e) => {
                return Err(ApiResponse::error(
                    400,
                    "invalid request body",
                    &format!("failed to read request body: {}", e),
                ))
            }
        }
    }
}

fn to_http_response(response: ApiResponse) -> Response<Vec<u8>> {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, response.content_type)
        .header(header::CONTENT_LENGTH, response.body.len());
    if let Some(allow) = response.allow {
        builder = builder.header(header::ALLOW, allow);
    }
    builder.body(response.body).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build response");
        let mut fallback = Response::new(Vec::new());
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

#[async_trait]
impl ServeHttp for VixelApp {
    async fn response(&self, http_session: &mut ServerSession) -> Response<Vec<u8>> {
        let (method, uri, headers) = {
            let req = http_session.req_header();
            let headers: HashMap<String, String> = req
                .headers
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
                })
                .collect();
            let uri = req
                .uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| "/".to_string());
            (req.method.clone(), uri, headers)
        };

        let body = match read_body(http_session, self.state.max_body_size).await {
            Ok(body) => body,
            Err(response) => {
                tracing::warn!(method = %method, uri = %uri, status = response.status, "Rejected request body");
                return to_http_response(response);
            }
        };

        let mut request = ApiRequest::new(method, &uri).with_body(body);
        request.headers = headers;

        to_http_response(handle(&self.state, request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_conversion_sets_headers() {
        let response = to_http_response(ApiResponse::method_not_allowed("POST"));
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "POST");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(
            response.headers()[header::CONTENT_LENGTH],
            response.body().len().to_string().as_str()
        );
    }

    #[test]
    fn test_unknown_status_falls_back_to_500() {
        let mut api = ApiResponse::error(200, "x", "y");
        api.status = 1000;
        assert_eq!(
            to_http_response(api).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
