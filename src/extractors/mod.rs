//! Request extractors.

pub mod json_api;

pub use json_api::JsonApiBody;
