//! Route table for the HTTP API.
//!
//! Matching is done on path segments; the method is checked only after a
//! path shape matched, so a known path with the wrong method is a 405 and
//! an unknown path is a 404.

use http::Method;

use crate::catalog::{ImageId, UserId};
use crate::constants::API_PREFIX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Health,
    Metrics,
    UploadImage,
    GetImage(ImageId),
    DeleteImage(ImageId),
    TransformImage(ImageId),
    ListUserImages(UserId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    NotFound,
    MethodNotAllowed { allowed: &'static str },
    /// Path shape matched but an id segment is not a number
    InvalidId(String),
}

impl Route {
    /// Low-cardinality label for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            Route::Health => "/health",
            Route::Metrics => "/metrics",
            Route::UploadImage => "/api/v1/images",
            Route::GetImage(_) | Route::DeleteImage(_) => "/api/v1/images/{id}",
            Route::TransformImage(_) => "/api/v1/images/{id}/transform",
            Route::ListUserImages(_) => "/api/v1/users/{user_id}/images",
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Health | Route::Metrics)
    }
}

fn parse_id(segment: &str) -> Result<u64, RouteError> {
    segment
        .parse()
        .map_err(|_| RouteError::InvalidId(segment.to_string()))
}

fn only(method: &Method, allowed: &'static str, route: Route) -> Result<Route, RouteError> {
    if method.as_str() == allowed {
        Ok(route)
    } else {
        Err(RouteError::MethodNotAllowed { allowed })
    }
}

pub fn match_route(method: &Method, path: &str) -> Result<Route, RouteError> {
    let path = path.trim_end_matches('/');

    match path {
        "/health" => return only(method, "GET", Route::Health),
        "/metrics" => return only(method, "GET", Route::Metrics),
        _ => {}
    }

    let rest = path
        .strip_prefix(API_PREFIX)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .ok_or(RouteError::NotFound)?;
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        ["images"] => only(method, "POST", Route::UploadImage),
        ["images", id] => {
            let id = parse_id(id)?;
            if *method == Method::GET {
                Ok(Route::GetImage(id))
            } else if *method == Method::DELETE {
                Ok(Route::DeleteImage(id))
            } else {
                Err(RouteError::MethodNotAllowed {
                    allowed: "GET, DELETE",
                })
            }
        }
        ["images", id, "transform"] => {
            let id = parse_id(id)?;
            only(method, "POST", Route::TransformImage(id))
        }
        ["users", user_id, "images"] => {
            let user_id = parse_id(user_id)?;
            only(method, "GET", Route::ListUserImages(user_id))
        }
        _ => Err(RouteError::NotFound),
    }
}
