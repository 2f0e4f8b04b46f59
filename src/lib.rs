//! JSON:API SDK: schema-driven REST backend speaking `application/vnd.api+json`.

pub mod case;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod logging;
pub mod query;
pub mod record;
pub mod response;
pub mod routes;
pub mod serializer;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{load_from_path, parse_schema, resolve, AppConfig, ModelSchema, Registry, SchemaConfig, TypedModel};
pub use error::{ApiError, AppError, ConfigError};
pub use query::{GetListRequest, IncludeNode, QuerySpec};
pub use record::{Record, Related};
pub use response::JSONAPI_MEDIA_TYPE;
pub use routes::{app, common_routes, resource_routes};
pub use serializer::{ResourceIdentifierObject, ResourceObject, Serializer};
pub use state::AppState;
pub use store::{MemoryStore, ModelStore, PgStore, StoreError};
