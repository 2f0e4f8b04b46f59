//! Process-level settings, read once at startup and passed explicitly to whatever needs them.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SCHEMA_PATH: &str = "schema.json";

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Prefix of every link in responses, without trailing slash (e.g. "https://api.example.com/v1").
    pub base_url: String,
    pub listen_addr: SocketAddr,
    /// Postgres connection string; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub schema_path: PathBuf,
}

impl AppConfig {
    /// Read `BASE_URL`, `LISTEN_ADDR`, `DATABASE_URL`, `SCHEMA_PATH` (a `.env` file is honoured).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("BASE_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let listen = lookup("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.into());
        let listen_addr = listen
            .parse()
            .map_err(|e| ConfigError::Validation(format!("LISTEN_ADDR '{}': {}", listen, e)))?;
        Ok(AppConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            listen_addr,
            database_url: lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()),
            schema_path: lookup("SCHEMA_PATH")
                .unwrap_or_else(|| DEFAULT_SCHEMA_PATH.into())
                .into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_apply() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.listen_addr.port(), 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.schema_path, PathBuf::from(DEFAULT_SCHEMA_PATH));
    }

    #[test]
    fn reads_values_and_trims_base_url() {
        let vars: HashMap<&str, &str> = [
            ("BASE_URL", "https://api.example.com/v1/"),
            ("LISTEN_ADDR", "127.0.0.1:8080"),
            ("DATABASE_URL", "postgres://localhost/blog"),
        ]
        .into_iter()
        .collect();
        let config = AppConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.base_url, "https://api.example.com/v1");
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/blog"));
    }

    #[test]
    fn rejects_bad_listen_addr() {
        let err = AppConfig::from_lookup(|k| (k == "LISTEN_ADDR").then(|| "nowhere".to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
