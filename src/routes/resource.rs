//! Resource routes. The resource type is a path parameter; handlers look the model up by type.

use super::common_routes;
use crate::handlers::resource::{create, delete, list, not_found, read, related, relationship, update};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/:type", get(list).post(create))
        .route("/:type/:id", get(read).patch(update).delete(delete))
        .route("/:type/:id/relationships/:relationship", get(relationship))
        .route("/:type/:id/:relationship", get(related))
        .with_state(state)
}

/// Complete application: common routes, resources, JSON:API 404 for anything else,
/// request tracing and a body size limit.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(resource_routes(state))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
}
