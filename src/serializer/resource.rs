//! Resource objects and resource identifier objects.

use crate::case::to_dasherized;
use crate::config::{Association, ModelSchema, Registry, TypedModel};
use crate::record::{id_to_string, Record};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Dasherized attribute names that look like a foreign key: `<relationship>-id`.
fn foreign_key_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([\w-]+)-id$").ok()).as_ref()
}

/// Relationship name a dasherized attribute refers to, if it looks like a foreign key.
pub fn foreign_key_relationship(dasherized: &str) -> Option<String> {
    foreign_key_pattern()?
        .captures(dasherized)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceIdentifierObject {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: String,
}

impl ResourceIdentifierObject {
    pub fn from_record(record: &Record, model: &ModelSchema) -> Self {
        ResourceIdentifierObject {
            type_: model.get_type().to_string(),
            id: record.id_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RelationshipLinks {
    #[serde(rename = "self")]
    pub self_: String,
    pub related: String,
}

impl RelationshipLinks {
    pub fn new(base_url: &str, type_: &str, id: &str, segment: &str) -> Self {
        RelationshipLinks {
            self_: format!("{}/{}/{}/relationships/{}", base_url, type_, id, segment),
            related: format!("{}/{}/{}/{}", base_url, type_, id, segment),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Relationship {
    pub links: RelationshipLinks,
    /// Outer None: no linkage known. Inner None: empty to-one linkage (`null`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Option<ResourceIdentifierObject>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: String,
    pub attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<BTreeMap<String, Relationship>>,
}

impl ResourceObject {
    pub fn from_record(record: &Record, model: &ModelSchema, registry: &Registry, base_url: &str) -> Self {
        let type_ = model.get_type().to_string();
        let id = record.id_string();

        let mut attributes = Map::new();
        // dasherized relationship name -> foreign key attribute (camelCase)
        let mut foreign_keys: Vec<(String, &str)> = Vec::new();
        for attr in model.attributes.iter().filter(|a| !a.is_id()) {
            let key = to_dasherized(&attr.name);
            if let Some(rel) = foreign_key_relationship(&key) {
                foreign_keys.push((rel, attr.name.as_str()));
                continue;
            }
            attributes.insert(key, record.get(&attr.name).cloned().unwrap_or(Value::Null));
        }

        let relationships = model.has_associations().then(|| {
            model
                .associations
                .iter()
                .map(|assoc| {
                    let segment = assoc.segment();
                    let data = linkage_attribute(assoc, &segment, &foreign_keys).map(|fk| {
                        let target_type = registry.target(assoc).map(|t| t.get_type().to_string());
                        match (record.get(fk), target_type) {
                            (Some(value), Some(type_)) if !value.is_null() => Some(ResourceIdentifierObject {
                                type_,
                                id: id_to_string(value),
                            }),
                            _ => None,
                        }
                    });
                    let links = RelationshipLinks::new(base_url, &type_, &id, &segment);
                    (segment, Relationship { links, data })
                })
                .collect()
        });

        ResourceObject {
            type_,
            id,
            attributes,
            relationships,
        }
    }
}

/// Foreign key attribute carrying the linkage of a to-one relationship. A declared
/// belongs_to key wins; otherwise fall back to the `<relationship>-id` naming heuristic.
fn linkage_attribute<'a>(assoc: &'a Association, segment: &str, foreign_keys: &[(String, &'a str)]) -> Option<&'a str> {
    if assoc.is_multi() {
        return None;
    }
    if assoc.kind.is_belongs_to() {
        if let Some((_, attr)) = foreign_keys.iter().find(|(_, attr)| *attr == assoc.foreign_key) {
            return Some(*attr);
        }
    }
    foreign_keys
        .iter()
        .find(|(rel, _)| rel == segment)
        .map(|(_, attr)| *attr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssociationKind, AttributeInfo, PkType};
    use crate::config::fixtures::blog_registry;
    use serde_json::json;
    use std::collections::HashMap;

    const BASE: &str = "http://api.test";

    fn attr(name: &str) -> AttributeInfo {
        AttributeInfo {
            name: name.to_string(),
            column: crate::case::to_snake_case(name),
            pg_type: None,
            nullable: true,
            unique: false,
            default: None,
        }
    }

    fn record(model: &str, values: Value) -> Record {
        match values {
            Value::Object(map) => Record::new(model, map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn relationship_without_foreign_key_has_only_links() {
        let foo = ModelSchema::new(
            "foo",
            "foos",
            PkType::Int,
            vec![attr("foo"), attr("barThing")],
            vec![Association {
                name: "bar".into(),
                kind: AssociationKind::HasOne,
                target: "bar".into(),
                foreign_key: "fooId".into(),
            }],
            HashMap::new(),
        );
        let bar = ModelSchema::new("bar", "bars", PkType::Int, vec![], vec![], HashMap::new());
        let registry = Registry::new(vec![foo.clone(), bar]);
        let r = record("foo", json!({ "id": 34672, "foo": "a", "barThing": "b" }));
        let v = serde_json::to_value(ResourceObject::from_record(&r, &foo, &registry, BASE)).unwrap();
        assert_eq!(
            v,
            json!({
                "type": "foos",
                "id": "34672",
                "attributes": { "foo": "a", "bar-thing": "b" },
                "relationships": {
                    "bar": { "links": {
                        "self": "http://api.test/foos/34672/relationships/bar",
                        "related": "http://api.test/foos/34672/bar"
                    } }
                }
            })
        );
    }

    #[test]
    fn foreign_key_becomes_linkage() {
        let registry = blog_registry();
        let post = registry.model("post").unwrap();
        let r = record(
            "post",
            json!({ "id": 7, "title": "t", "body": null, "userId": 3, "createdAt": "2024-01-01T00:00:00Z" }),
        );
        let obj = ResourceObject::from_record(&r, post, &registry, BASE);
        assert!(!obj.attributes.contains_key("user-id"));
        assert_eq!(obj.attributes["created-at"], json!("2024-01-01T00:00:00Z"));
        let rels = obj.relationships.unwrap();
        assert_eq!(
            rels["user"].data,
            Some(Some(ResourceIdentifierObject { type_: "users".into(), id: "3".into() }))
        );
        assert_eq!(rels["comments"].data, None);
        assert_eq!(rels["comments"].links.related, "http://api.test/posts/7/comments");
    }

    #[test]
    fn null_foreign_key_is_empty_linkage() {
        let registry = blog_registry();
        let post = registry.model("post").unwrap();
        let r = record("post", json!({ "id": 7, "title": "t", "userId": null }));
        let v = serde_json::to_value(ResourceObject::from_record(&r, post, &registry, BASE)).unwrap();
        assert_eq!(v["relationships"]["user"]["data"], Value::Null);
        assert!(v["relationships"]["user"].as_object().unwrap().contains_key("data"));
    }

    #[test]
    fn model_without_associations_has_no_relationships() {
        let tag = ModelSchema::new("tag", "tags", PkType::Text, vec![attr("label")], vec![], HashMap::new());
        let registry = Registry::new(vec![tag.clone()]);
        let v = serde_json::to_value(ResourceObject::from_record(&record("tag", json!({ "id": "x" })), &tag, &registry, BASE))
            .unwrap();
        assert_eq!(v, json!({ "type": "tags", "id": "x", "attributes": { "label": null } }));
    }

    #[test]
    fn identifier_has_type_and_id_only() {
        let registry = blog_registry();
        let user = registry.model("user").unwrap();
        let r = record("user", json!({ "id": 5, "firstName": "Ann" }));
        assert_eq!(
            serde_json::to_value(ResourceIdentifierObject::from_record(&r, user)).unwrap(),
            json!({ "type": "users", "id": "5" })
        );
    }

    #[test]
    fn foreign_key_detection() {
        assert_eq!(foreign_key_relationship("user-id").as_deref(), Some("user"));
        assert_eq!(foreign_key_relationship("blog-post-id").as_deref(), Some("blog-post"));
        assert_eq!(foreign_key_relationship("id"), None);
        assert_eq!(foreign_key_relationship("idea"), None);
    }
}
