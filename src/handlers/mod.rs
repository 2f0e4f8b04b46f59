//! HTTP handlers for JSON:API resources.

pub mod resource;
pub use resource::*;
