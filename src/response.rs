//! JSON:API response envelope: media type, status and `Location`.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub const JSONAPI_MEDIA_TYPE: &str = "application/vnd.api+json";

/// A document sent as `application/vnd.api+json`.
pub struct JsonApi<T> {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Option<T>,
}

impl<T: Serialize> JsonApi<T> {
    pub fn ok(body: T) -> Self {
        JsonApi {
            status: StatusCode::OK,
            location: None,
            body: Some(body),
        }
    }

    /// 201 with `Location` pointing at the new resource.
    pub fn created(body: T, location: String) -> Self {
        JsonApi {
            status: StatusCode::CREATED,
            location: Some(location),
            body: Some(body),
        }
    }
}

impl JsonApi<()> {
    pub fn no_content() -> Self {
        JsonApi {
            status: StatusCode::NO_CONTENT,
            location: None,
            body: None,
        }
    }
}

impl<T: Serialize> IntoResponse for JsonApi<T> {
    fn into_response(self) -> Response {
        let mut resp = match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        };
        if self.status != StatusCode::NO_CONTENT {
            resp.headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSONAPI_MEDIA_TYPE));
        }
        if let Some(location) = self.location.and_then(|l| HeaderValue::from_str(&l).ok()) {
            resp.headers_mut().insert(header::LOCATION, location);
        }
        resp
    }
}
