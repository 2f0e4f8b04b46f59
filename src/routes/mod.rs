//! Routers: JSON:API resources plus health, readiness and version.

mod common;
mod resource;

pub use common::common_routes;
pub use resource::{app, resource_routes, MAX_BODY_BYTES};
