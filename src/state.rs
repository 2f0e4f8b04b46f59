//! Shared application state for all routes.

use crate::config::Registry;
use crate::serializer::Serializer;
use crate::store::ModelStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub store: Arc<dyn ModelStore>,
    /// Carries the base URL every link is built from.
    pub serializer: Arc<Serializer>,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, store: Arc<dyn ModelStore>, base_url: impl Into<String>) -> Self {
        let serializer = Arc::new(Serializer::new(base_url, registry.clone()));
        AppState {
            registry,
            store,
            serializer,
        }
    }
}
