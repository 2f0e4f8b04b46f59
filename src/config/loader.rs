//! Load schema config from JSON and resolve it into a model registry.

use crate::case::{pluralize, to_snake_case};
use crate::config::resolved::{Association, AssociationKind, AttributeInfo, ModelSchema, PkType, Registry};
use crate::config::types::*;
use crate::config::{default_association_name, default_foreign_key, validate};
use crate::error::ConfigError;
use std::path::Path;

/// Build the registry from schema config (validates first).
pub fn resolve(config: &SchemaConfig) -> Result<Registry, ConfigError> {
    validate(config)?;

    let mut models = Vec::with_capacity(config.models.len());
    for m in &config.models {
        let pk_type = match m.id_type {
            IdTypeConfig::Int => PkType::Int,
            IdTypeConfig::BigInt => PkType::BigInt,
            IdTypeConfig::Uuid => PkType::Uuid,
            IdTypeConfig::Text => PkType::Text,
        };
        let attributes = m
            .attributes
            .iter()
            .map(|a| AttributeInfo {
                name: a.name.clone(),
                column: a.column.clone().unwrap_or_else(|| to_snake_case(&a.name)),
                pg_type: a.type_.as_deref().and_then(pg_cast_type),
                nullable: a.nullable,
                unique: a.unique,
                default: a.default.clone(),
            })
            .collect();
        let associations = m
            .associations
            .iter()
            .map(|a| {
                let name = a.name.clone().unwrap_or_else(|| default_association_name(a.kind, &a.target));
                let foreign_key = a
                    .foreign_key
                    .clone()
                    .unwrap_or_else(|| default_foreign_key(a.kind, &m.name, &name));
                Association {
                    name,
                    kind: match a.kind {
                        AssociationKindConfig::BelongsTo => AssociationKind::BelongsTo,
                        AssociationKindConfig::HasMany => AssociationKind::HasMany,
                        AssociationKindConfig::HasOne => AssociationKind::HasOne,
                    },
                    target: a.target.clone(),
                    foreign_key,
                }
            })
            .collect();
        let table_name = m.table.clone().unwrap_or_else(|| pluralize(&to_snake_case(&m.name)));
        models.push(ModelSchema::new(
            m.name.clone(),
            table_name,
            pk_type,
            attributes,
            associations,
            m.validation.clone(),
        ));
    }

    tracing::debug!(models = models.len(), "schema resolved");
    Ok(Registry::new(models))
}

/// Parse a schema document.
pub fn parse_schema(json: &str) -> Result<SchemaConfig, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Read and parse a schema file.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<SchemaConfig, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_schema(&raw)
}

/// Type names that need an explicit cast when bound from JSON strings.
fn pg_cast_type(name: &str) -> Option<String> {
    let lower = name.to_lowercase();
    if lower == "timestamptz" || lower == "timestamp with time zone" {
        Some("timestamptz".into())
    } else if lower == "timestamp" || lower.starts_with("timestamp ") {
        Some("timestamp".into())
    } else if lower == "date" {
        Some("date".into())
    } else if lower.contains("uuid") {
        Some("uuid".into())
    } else if lower == "numeric" || lower.starts_with("numeric(") {
        Some("numeric".into())
    } else if name.contains('.') {
        // schema-qualified enum type
        Some(name.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::BLOG_SCHEMA;
    use crate::config::TypedModel;

    #[test]
    fn resolves_defaults() {
        let registry = resolve(&parse_schema(BLOG_SCHEMA).unwrap()).unwrap();
        let post = registry.model("post").unwrap();
        assert_eq!(post.table_name, "posts");
        assert_eq!(post.get_type(), "posts");
        assert_eq!(post.attribute_names().collect::<Vec<_>>(), vec!["id", "title", "body", "userId", "createdAt"]);
        assert_eq!(post.attribute("userId").unwrap().column, "user_id");
        assert_eq!(post.attribute("createdAt").unwrap().pg_type.as_deref(), Some("timestamptz"));

        let user = post.association("user").unwrap();
        assert_eq!(user.kind, AssociationKind::BelongsTo);
        assert_eq!(user.foreign_key, "userId");

        let comments = post.association("comments").unwrap();
        assert!(comments.is_multi());
        assert_eq!(comments.foreign_key, "postId");
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(parse_schema("{ models: "), Err(ConfigError::Load(_))));
    }

    #[tokio::test]
    async fn missing_file_is_a_load_error() {
        let err = load_from_path("/definitely/not/here/schema.json").await.unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
