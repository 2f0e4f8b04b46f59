//! Resolved model schema: config validated and flattened for runtime use.

use crate::case::{pluralize, to_dasherized};
use crate::config::{AttributeDefault, ValidationRule};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Name of the synthetic primary key attribute present on every model.
pub const ID_ATTRIBUTE: &str = "id";

/// Primary key type for parsing path/body ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PkType {
    Uuid,
    BigInt,
    Int,
    Text,
}

impl PkType {
    /// Parse a path or body id into the value stored for this key type. None when it cannot be an id.
    pub fn parse_id(&self, id_str: &str) -> Option<Value> {
        match self {
            PkType::Uuid => uuid::Uuid::parse_str(id_str).ok().map(|u| Value::String(u.to_string())),
            PkType::BigInt | PkType::Int => id_str.parse::<i64>().ok().map(|n| Value::Number(n.into())),
            PkType::Text => Some(Value::String(id_str.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AttributeInfo {
    /// camelCase attribute name.
    pub name: String,
    /// snake_case column name.
    pub column: String,
    /// PostgreSQL type name for SQL casts when binding string values.
    pub pg_type: Option<String>,
    pub nullable: bool,
    pub unique: bool,
    /// Applied when a create omits the attribute.
    pub default: Option<AttributeDefault>,
}

impl AttributeInfo {
    pub fn is_id(&self) -> bool {
        self.name == ID_ATTRIBUTE
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some() || self.is_id()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssociationKind {
    BelongsTo,
    HasMany,
    HasOne,
}

impl AssociationKind {
    pub fn is_belongs_to(&self) -> bool {
        matches!(self, AssociationKind::BelongsTo)
    }
}

/// Relationship from a source model to a target model.
#[derive(Clone, Debug)]
pub struct Association {
    /// camelCase relationship name, unique per source model.
    pub name: String,
    pub kind: AssociationKind,
    /// Target model name.
    pub target: String,
    /// Foreign key attribute: on the source for belongs_to, on the target for has_many/has_one.
    pub foreign_key: String,
}

impl Association {
    pub fn is_multi(&self) -> bool {
        matches!(self.kind, AssociationKind::HasMany)
    }

    /// Public member name used in URLs and the `relationships` object.
    ///
    /// This is the dasherized association name, not the target model name. With default
    /// names they coincide (`user`, `comments`); an explicit name such as `author` pointing
    /// at `user` yields `/posts/1/author`, and two associations to the same target keep
    /// distinct URLs.
    pub fn segment(&self) -> String {
        to_dasherized(&self.name)
    }
}

/// Capability of anything that has a JSON:API resource type.
pub trait TypedModel {
    fn get_type(&self) -> &str;
}

#[derive(Clone, Debug)]
pub struct ModelSchema {
    pub name: String,
    pub table_name: String,
    pub pk_type: PkType,
    /// Declared attributes, `id` first.
    pub attributes: Vec<AttributeInfo>,
    pub associations: Vec<Association>,
    pub validation: HashMap<String, ValidationRule>,
    type_name: OnceLock<String>,
}

impl ModelSchema {
    /// Builds a model; a synthetic `id` attribute is prepended when missing.
    pub fn new(
        name: impl Into<String>,
        table_name: impl Into<String>,
        pk_type: PkType,
        mut attributes: Vec<AttributeInfo>,
        associations: Vec<Association>,
        validation: HashMap<String, ValidationRule>,
    ) -> Self {
        if !attributes.iter().any(AttributeInfo::is_id) {
            let pg_type = (pk_type == PkType::Uuid).then(|| "uuid".to_string());
            attributes.insert(
                0,
                AttributeInfo {
                    name: ID_ATTRIBUTE.to_string(),
                    column: ID_ATTRIBUTE.to_string(),
                    pg_type,
                    nullable: false,
                    unique: true,
                    default: None,
                },
            );
        }
        ModelSchema {
            name: name.into(),
            table_name: table_name.into(),
            pk_type,
            attributes,
            associations,
            validation,
            type_name: OnceLock::new(),
        }
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn association(&self, name: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.name == name)
    }

    /// Look up an association by its dasherized public name.
    pub fn association_by_segment(&self, segment: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.segment() == segment)
    }

    pub fn has_associations(&self) -> bool {
        !self.associations.is_empty()
    }
}

impl TypedModel for ModelSchema {
    /// Pluralized dasherized model name, computed once.
    fn get_type(&self) -> &str {
        self.type_name.get_or_init(|| pluralize(&to_dasherized(&self.name)))
    }
}

/// All models of the API, addressable by internal name and by resource type.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    models: Vec<ModelSchema>,
    by_name: HashMap<String, usize>,
    by_type: HashMap<String, usize>,
}

impl Registry {
    pub fn new(models: Vec<ModelSchema>) -> Self {
        let by_name = models.iter().enumerate().map(|(i, m)| (m.name.clone(), i)).collect();
        let by_type = models.iter().enumerate().map(|(i, m)| (m.get_type().to_string(), i)).collect();
        Registry { models, by_name, by_type }
    }

    pub fn models(&self) -> &[ModelSchema] {
        &self.models
    }

    pub fn model(&self, name: &str) -> Option<&ModelSchema> {
        self.by_name.get(name).map(|&i| &self.models[i])
    }

    pub fn model_by_type(&self, type_name: &str) -> Option<&ModelSchema> {
        self.by_type.get(type_name).map(|&i| &self.models[i])
    }

    pub fn target(&self, association: &Association) -> Option<&ModelSchema> {
        self.model(&association.target)
    }
}
