//! Users/posts/comments schema shared by unit tests.

use crate::config::{parse_schema, resolve, Registry, SchemaConfig};

pub const BLOG_SCHEMA: &str = include_str!("../../example_consumer/schema.json");

pub fn blog_config() -> SchemaConfig {
    parse_schema(BLOG_SCHEMA).unwrap()
}

pub fn blog_registry() -> Registry {
    resolve(&blog_config()).unwrap()
}
