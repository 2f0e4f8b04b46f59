//! Schema config validation: referential integrity and naming consistency.

use crate::case::{pluralize, to_dasherized};
use crate::config::{AssociationKindConfig, ModelConfig, SchemaConfig, ID_ATTRIBUTE};
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};

/// Relationship name used when the config leaves it out.
pub fn default_association_name(kind: AssociationKindConfig, target: &str) -> String {
    match kind {
        AssociationKindConfig::HasMany => pluralize(target),
        AssociationKindConfig::BelongsTo | AssociationKindConfig::HasOne => target.to_string(),
    }
}

/// Foreign key attribute used when the config leaves it out.
pub fn default_foreign_key(kind: AssociationKindConfig, source: &str, association_name: &str) -> String {
    match kind {
        AssociationKindConfig::BelongsTo => format!("{}Id", association_name),
        AssociationKindConfig::HasMany | AssociationKindConfig::HasOne => format!("{}Id", source),
    }
}

pub fn validate(config: &SchemaConfig) -> Result<(), ConfigError> {
    let models: HashMap<&str, &ModelConfig> = config.models.iter().map(|m| (m.name.as_str(), m)).collect();

    let mut types = HashSet::new();
    for m in &config.models {
        if m.name.is_empty() {
            return Err(ConfigError::Validation("model name must not be empty".into()));
        }
        if !types.insert(pluralize(&to_dasherized(&m.name))) {
            return Err(ConfigError::Duplicate {
                kind: "model",
                name: m.name.clone(),
            });
        }
    }

    for m in &config.models {
        let mut attributes = HashSet::new();
        for a in &m.attributes {
            if a.name == ID_ATTRIBUTE {
                return Err(ConfigError::Validation(format!(
                    "{}: '{}' is implicit and must not be declared",
                    m.name, ID_ATTRIBUTE
                )));
            }
            if !attributes.insert(a.name.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "attribute",
                    name: format!("{}.{}", m.name, a.name),
                });
            }
        }

        let mut associations = HashSet::new();
        for assoc in &m.associations {
            let target = models.get(assoc.target.as_str()).ok_or_else(|| ConfigError::MissingReference {
                kind: "model",
                id: assoc.target.clone(),
            })?;
            let name = assoc
                .name
                .clone()
                .unwrap_or_else(|| default_association_name(assoc.kind, &assoc.target));
            if attributes.contains(name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "{}: relationship '{}' clashes with an attribute",
                    m.name, name
                )));
            }
            if !associations.insert(to_dasherized(&name)) {
                return Err(ConfigError::Duplicate {
                    kind: "relationship",
                    name: format!("{}.{}", m.name, name),
                });
            }
            let foreign_key = assoc
                .foreign_key
                .clone()
                .unwrap_or_else(|| default_foreign_key(assoc.kind, &m.name, &name));
            let owner = match assoc.kind {
                AssociationKindConfig::BelongsTo => m,
                AssociationKindConfig::HasMany | AssociationKindConfig::HasOne => *target,
            };
            if !owner.attributes.iter().any(|a| a.name == foreign_key) {
                return Err(ConfigError::MissingReference {
                    kind: "foreign key attribute",
                    id: format!("{}.{}", owner.name, foreign_key),
                });
            }
        }

        for col in m.validation.keys() {
            if !attributes.contains(col.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "validated attribute",
                    id: format!("{}.{}", m.name, col),
                });
            }
        }
    }

    Ok(())
}
