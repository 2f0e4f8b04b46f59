//! Raw schema config types as read from JSON.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Whole schema file: every model exposed by the API.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdTypeConfig {
    #[default]
    Int,
    BigInt,
    Uuid,
    Text,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Internal camelCase name, singular (e.g. "user", "blogPost").
    pub name: String,
    /// Table name; defaults to the pluralized snake_case model name.
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub id_type: IdTypeConfig,
    #[serde(default)]
    pub attributes: Vec<AttributeConfig>,
    #[serde(default)]
    pub associations: Vec<AssociationConfig>,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttributeConfig {
    /// camelCase attribute name; the column is its snake_case form unless `column` is set.
    pub name: String,
    #[serde(default)]
    pub column: Option<String>,
    /// PostgreSQL type used as a cast when binding values (e.g. "timestamptz").
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default: Option<AttributeDefault>,
}

fn default_true() -> bool {
    true
}

/// Default for an omitted attribute: a literal JSON value or a SQL expression evaluated by the database.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeDefault {
    Expression { expression: String },
    Value(serde_json::Value),
}

impl AttributeDefault {
    /// Evaluate the default in process (for stores without a database behind them).
    pub fn evaluate(&self) -> serde_json::Value {
        match self {
            AttributeDefault::Value(v) => v.clone(),
            AttributeDefault::Expression { expression } => {
                let lower = expression.to_lowercase();
                if lower.starts_with("now") || lower.starts_with("current_timestamp") {
                    serde_json::Value::String(chrono::Utc::now().to_rfc3339())
                } else if lower.starts_with("gen_random_uuid") {
                    serde_json::Value::String(uuid::Uuid::new_v4().to_string())
                } else {
                    serde_json::Value::Null
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for AttributeDefault {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;
        if let serde_json::Value::Object(obj) = &v {
            if obj.len() == 1 {
                if let Some(serde_json::Value::String(expression)) = obj.get("expression") {
                    return Ok(AttributeDefault::Expression {
                        expression: expression.clone(),
                    });
                }
            }
        }
        Ok(AttributeDefault::Value(v))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKindConfig {
    BelongsTo,
    HasMany,
    HasOne,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssociationConfig {
    pub kind: AssociationKindConfig,
    /// Target model name.
    pub target: String,
    /// Relationship name; defaults to the target name (to-one) or its plural (to-many).
    #[serde(default)]
    pub name: Option<String>,
    /// Foreign key attribute: on this model for belongs_to, on the target otherwise.
    #[serde(default)]
    pub foreign_key: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}
