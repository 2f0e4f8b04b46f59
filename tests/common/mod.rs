//! Blog app over a seeded in-memory store.
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response},
    Router,
};
use jsonapi_sdk::{app, parse_schema, resolve, AppState, MemoryStore, ModelStore, Registry, JSONAPI_MEDIA_TYPE};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const BASE_URL: &str = "http://localhost:3000";

pub fn registry() -> Arc<Registry> {
    let schema = parse_schema(include_str!("../../example_consumer/schema.json")).unwrap();
    Arc::new(resolve(&schema).unwrap())
}

fn values(v: Value) -> Map<String, Value> {
    v.as_object().cloned().unwrap()
}

/// Users Ann (1), Bob (2), Cleo (3); posts "one" and "two" by Ann, "three" by Bob;
/// one comment by Bob on post 1.
pub async fn seeded_store(registry: Arc<Registry>) -> MemoryStore {
    let store = MemoryStore::new(registry.clone());
    let user = registry.model("user").unwrap();
    let post = registry.model("post").unwrap();
    let comment = registry.model("comment").unwrap();
    for (first, email) in [("Ann", "ann@example.com"), ("Bob", "bob@example.com"), ("Cleo", "cleo@example.com")] {
        store
            .insert(user, values(json!({ "firstName": first, "lastName": "Doe", "email": email })))
            .await
            .unwrap();
    }
    for (title, user_id) in [("one", 1), ("two", 1), ("three", 2)] {
        store
            .insert(post, values(json!({ "title": title, "body": "...", "userId": user_id })))
            .await
            .unwrap();
    }
    store
        .insert(comment, values(json!({ "body": "nice", "postId": 1, "userId": 2 })))
        .await
        .unwrap();
    store
}

pub async fn test_app() -> Router {
    let registry = registry();
    let store = seeded_store(registry.clone()).await;
    app(AppState::new(registry, Arc::new(store), BASE_URL))
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn send(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, JSONAPI_MEDIA_TYPE)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `source.pointer` or `source.parameter` of every error in the document.
pub fn error_sources(doc: &Value) -> Vec<String> {
    doc["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            let source = &e["source"];
            source["pointer"]
                .as_str()
                .or_else(|| source["parameter"].as_str())
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}
