//! Example consumer: the blog API served from `schema.json`.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Without `DATABASE_URL` the data lives in memory and is seeded with a few rows.

use jsonapi_sdk::{
    app, load_from_path, logging, parse_schema, resolve, AppConfig, AppState, MemoryStore, ModelStore, PgStore,
    Registry, SchemaConfig,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

const BUNDLED_SCHEMA: &str = include_str!("../schema.json");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    logging::init();

    let schema = load_schema(&config).await?;
    let registry = Arc::new(resolve(&schema)?);

    let store: Arc<dyn ModelStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("using postgres store");
            Arc::new(PgStore::connect(url, registry.clone()).await?)
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory store");
            let store = MemoryStore::new(registry.clone());
            seed(&store, &registry).await?;
            Arc::new(store)
        }
    };

    let state = AppState::new(registry, store, config.base_url.clone());
    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!("blog API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn load_schema(config: &AppConfig) -> Result<SchemaConfig, Box<dyn std::error::Error>> {
    if config.schema_path.exists() {
        Ok(load_from_path(&config.schema_path).await?)
    } else {
        tracing::info!(path = %config.schema_path.display(), "schema file not found, using bundled schema");
        Ok(parse_schema(BUNDLED_SCHEMA)?)
    }
}

fn values(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

async fn seed(store: &MemoryStore, registry: &Registry) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(user), Some(post), Some(comment)) =
        (registry.model("user"), registry.model("post"), registry.model("comment"))
    else {
        return Ok(());
    };
    let ada = store
        .insert(user, values(json!({ "firstName": "Ada", "lastName": "Lovelace", "email": "ada@example.com" })))
        .await?;
    let alan = store
        .insert(user, values(json!({ "firstName": "Alan", "lastName": "Turing", "email": "alan@example.com" })))
        .await?;
    let first = store
        .insert(
            post,
            values(json!({ "title": "Notes on the Analytical Engine", "body": "...", "userId": ada.id() })),
        )
        .await?;
    store
        .insert(post, values(json!({ "title": "Computing Machinery", "body": "...", "userId": alan.id() })))
        .await?;
    store
        .insert(
            comment,
            values(json!({ "body": "Fascinating.", "postId": first.id(), "userId": alan.id() })),
        )
        .await?;
    Ok(())
}
