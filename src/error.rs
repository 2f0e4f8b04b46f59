//! Typed errors, JSON:API error objects and HTTP mapping.

use crate::case::to_dasherized;
use crate::config::ModelSchema;
use crate::response::JSONAPI_MEDIA_TYPE;
use crate::store::StoreError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ABOUT_INCLUDES: &str = "https://jsonapi.org/format/#fetching-includes";
pub const ABOUT_PAGINATION: &str = "https://jsonapi.org/format/#fetching-pagination";
pub const ABOUT_SORTING: &str = "https://jsonapi.org/format/#fetching-sorting";
pub const ABOUT_CONTENT_NEGOTIATION: &str = "https://jsonapi.org/format/#content-negotiation-servers";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate {kind}: {name}")]
    Duplicate { kind: &'static str, name: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// One JSON:API error. Optional members stay `None` until set.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ApiError {
    #[error("bad request: {detail}")]
    BadRequest {
        detail: String,
        parameter: Option<String>,
        about: Option<String>,
    },
    #[error("unprocessable entity: {detail}")]
    UnprocessableEntity {
        title: Option<String>,
        detail: String,
        pointer: Option<String>,
    },
    #[error("forbidden: {detail}")]
    Forbidden {
        detail: String,
        pointer: Option<String>,
    },
    #[error("not found: {detail}")]
    NotFound { detail: String },
    #[error("unsupported media type: {detail}")]
    UnsupportedMediaType { detail: String, about: Option<String> },
    #[error("internal server error")]
    InternalServerError,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        ApiError::BadRequest {
            detail: detail.into(),
            parameter: None,
            about: None,
        }
    }

    /// Bad request caused by a query parameter; `parameter` ends up in `source.parameter`.
    pub fn bad_parameter(parameter: impl Into<String>, detail: impl Into<String>) -> Self {
        ApiError::BadRequest {
            detail: detail.into(),
            parameter: Some(parameter.into()),
            about: None,
        }
    }

    pub fn unprocessable(pointer: impl Into<String>, detail: impl Into<String>) -> Self {
        ApiError::UnprocessableEntity {
            title: None,
            detail: detail.into(),
            pointer: Some(pointer.into()),
        }
    }

    pub fn forbidden(pointer: impl Into<String>, detail: impl Into<String>) -> Self {
        ApiError::Forbidden {
            detail: detail.into(),
            pointer: Some(pointer.into()),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        ApiError::NotFound { detail: detail.into() }
    }

    pub fn unsupported_media_type(detail: impl Into<String>) -> Self {
        ApiError::UnsupportedMediaType {
            detail: detail.into(),
            about: Some(ABOUT_CONTENT_NEGOTIATION.to_string()),
        }
    }

    /// Set `links.about`. No-op for kinds that carry no links.
    pub fn with_about(mut self, url: impl Into<String>) -> Self {
        match &mut self {
            ApiError::BadRequest { about, .. } | ApiError::UnsupportedMediaType { about, .. } => {
                *about = Some(url.into());
            }
            _ => {}
        }
        self
    }

    /// Override the title of an UnprocessableEntity.
    pub fn with_title(mut self, new_title: impl Into<String>) -> Self {
        if let ApiError::UnprocessableEntity { title, .. } = &mut self {
            *title = Some(new_title.into());
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ApiError::BadRequest { .. } => "Bad Request",
            ApiError::UnprocessableEntity { title, .. } => title.as_deref().unwrap_or("Unprocessable Entity"),
            ApiError::Forbidden { .. } => "Forbidden",
            ApiError::NotFound { .. } => "Not Found",
            ApiError::UnsupportedMediaType { .. } => "Unsupported Media Type",
            ApiError::InternalServerError => "Internal Server Error",
        }
    }

    pub fn to_object(&self) -> ErrorObject {
        let (detail, source, about) = match self {
            ApiError::BadRequest { detail, parameter, about } => (
                Some(detail.clone()),
                parameter.as_ref().map(|p| ErrorSource::parameter(p.clone())),
                about.clone(),
            ),
            ApiError::UnprocessableEntity { detail, pointer, .. } | ApiError::Forbidden { detail, pointer } => (
                Some(detail.clone()),
                pointer.as_ref().map(|p| ErrorSource::pointer(p.clone())),
                None,
            ),
            ApiError::NotFound { detail } => (Some(detail.clone()), None, None),
            ApiError::UnsupportedMediaType { detail, about } => (Some(detail.clone()), None, about.clone()),
            ApiError::InternalServerError => (
                Some("The server encountered an unexpected condition".to_string()),
                None,
                None,
            ),
        };
        ErrorObject {
            status: self.status().as_u16(),
            title: self.title().to_string(),
            detail,
            source,
            links: about.map(|about| ErrorLinks { about }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub status: u16,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<ErrorLinks>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl ErrorSource {
    fn pointer(p: String) -> Self {
        ErrorSource { pointer: Some(p), parameter: None }
    }

    fn parameter(p: String) -> Self {
        ErrorSource { pointer: None, parameter: Some(p) }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorLinks {
    pub about: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("request rejected with {} error(s)", .0.len())]
    Api(Vec<ApiError>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        AppError::Api(vec![e])
    }
}

impl From<Vec<ApiError>> for AppError {
    fn from(errors: Vec<ApiError>) -> Self {
        AppError::Api(errors)
    }
}

impl AppError {
    /// Shared status of all errors; mixed client errors collapse to 400, anything else to 500.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Api(errors) => {
                let Some(first) = errors.first() else {
                    return StatusCode::INTERNAL_SERVER_ERROR;
                };
                let status = first.status();
                if errors.iter().all(|e| e.status() == status) {
                    status
                } else if errors.iter().all(|e| e.status().is_client_error()) {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            AppError::Config(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_document(&self) -> ErrorDocument {
        let errors = match self {
            AppError::Api(errors) if !errors.is_empty() => errors.iter().map(ApiError::to_object).collect(),
            _ => vec![ApiError::InternalServerError.to_object()],
        };
        ErrorDocument { errors }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "unhandled error");
        }
        let mut resp = (status, Json(self.to_document())).into_response();
        resp.headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSONAPI_MEDIA_TYPE));
        resp
    }
}

/// Translate classified storage failures into 422s aimed at the offending member.
/// Unrecognized failures pass through untouched and render as 500.
pub fn translate_store_error(model: &ModelSchema, err: StoreError) -> AppError {
    match err {
        StoreError::UniqueViolation { attribute } => {
            let (pointer, detail) = match attribute {
                Some(attr) => (
                    attribute_pointer(&attr),
                    format!("a {} with this {} already exists", model.name, to_dasherized(&attr)),
                ),
                None => ("/data/attributes".to_string(), format!("this {} already exists", model.name)),
            };
            ApiError::unprocessable(pointer, detail)
                .with_title("Uniqueness Violation")
                .into()
        }
        StoreError::NotNullViolation { attribute } => {
            let (pointer, detail) = match attribute {
                Some(attr) => (
                    attribute_pointer(&attr),
                    format!("{} is required for {}", to_dasherized(&attr), model.name),
                ),
                None => ("/data/attributes".to_string(), format!("a required {} attribute is missing", model.name)),
            };
            ApiError::unprocessable(pointer, detail)
                .with_title("Required Attribute Missing")
                .into()
        }
        StoreError::ForeignKeyViolation { attribute } => {
            let assoc = attribute
                .as_deref()
                .and_then(|attr| model.associations.iter().find(|a| a.kind.is_belongs_to() && a.foreign_key == attr));
            const MISSING: &str = "Related Resource Not Found";
            let (pointer, detail, title) = match (assoc, attribute) {
                (Some(a), _) => (
                    format!("/data/relationships/{}", a.segment()),
                    format!("the related {} of this {} does not exist", a.segment(), model.name),
                    MISSING,
                ),
                (None, Some(attr)) => (
                    attribute_pointer(&attr),
                    format!("{} references a resource that does not exist", to_dasherized(&attr)),
                    MISSING,
                ),
                // No key of this model involved: other rows still point at it.
                (None, None) => (
                    "/data".to_string(),
                    format!("this {} is still referenced by other resources", model.name),
                    "Resource Still Referenced",
                ),
            };
            ApiError::unprocessable(pointer, detail).with_title(title).into()
        }
        StoreError::CheckViolation { constraint } => ApiError::unprocessable(
            "/data/attributes",
            match constraint {
                Some(c) => format!("{} violates the {} check", model.name, c),
                None => format!("{} violates a check constraint", model.name),
            },
        )
        .with_title("Invalid Attribute Value")
        .into(),
        other => AppError::Store(other),
    }
}

fn attribute_pointer(attr: &str) -> String {
    format!("/data/attributes/{}", to_dasherized(attr))
}
