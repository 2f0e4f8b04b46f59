//! Request body extractor enforcing JSON:API content negotiation.

use crate::error::{ApiError, AppError, ABOUT_CONTENT_NEGOTIATION};
use crate::response::JSONAPI_MEDIA_TYPE;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header,
};
use serde_json::Value;

/// Parsed JSON body of a request sent as `application/vnd.api+json`.
#[derive(Clone, Debug)]
pub struct JsonApiBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for JsonApiBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        check_content_type(content_type.as_deref())?;

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("could not read request body: {}", e)))?;
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::bad_request(format!("request body is not valid JSON: {}", e)))?;
        Ok(JsonApiBody(value))
    }
}

/// Missing or foreign media type: 400. The JSON:API media type with parameters: 415.
pub fn check_content_type(content_type: Option<&str>) -> Result<(), ApiError> {
    let Some(content_type) = content_type else {
        return Err(ApiError::bad_request(format!("Content-Type must be {}", JSONAPI_MEDIA_TYPE))
            .with_about(ABOUT_CONTENT_NEGOTIATION));
    };
    let mut parts = content_type.split(';');
    let media_type = parts.next().unwrap_or_default().trim();
    if !media_type.eq_ignore_ascii_case(JSONAPI_MEDIA_TYPE) {
        return Err(ApiError::bad_request(format!(
            "Content-Type must be {}, got {}",
            JSONAPI_MEDIA_TYPE, content_type
        ))
        .with_about(ABOUT_CONTENT_NEGOTIATION));
    }
    if parts.any(|p| !p.trim().is_empty()) {
        return Err(ApiError::unsupported_media_type(format!(
            "{} must not carry media type parameters",
            JSONAPI_MEDIA_TYPE
        )));
    }
    Ok(())
}
