//! A persisted row plus whatever related rows were sideloaded onto it.

use crate::config::ID_ATTRIBUTE;
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Internal model name.
    pub model: String,
    /// camelCase attribute -> value, `id` included.
    pub values: Map<String, Value>,
    /// Sideloaded relations keyed by association name, in load order.
    pub related: Vec<(String, Related)>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Related {
    One(Option<Box<Record>>),
    Many(Vec<Record>),
}

impl Related {
    pub fn records(&self) -> Vec<&Record> {
        match self {
            Related::One(Some(r)) => vec![r.as_ref()],
            Related::One(None) => Vec::new(),
            Related::Many(rs) => rs.iter().collect(),
        }
    }
}

impl Record {
    pub fn new(model: impl Into<String>, values: Map<String, Value>) -> Self {
        Record {
            model: model.into(),
            values,
            related: Vec::new(),
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.values.get(attribute)
    }

    pub fn id(&self) -> Option<&Value> {
        self.get(ID_ATTRIBUTE)
    }

    /// Stringified primary key; "undefined" when the record has none.
    pub fn id_string(&self) -> String {
        self.id().map(id_to_string).unwrap_or_else(|| "undefined".to_string())
    }

    pub fn related(&self, association: &str) -> Option<&Related> {
        self.related.iter().find(|(name, _)| name == association).map(|(_, r)| r)
    }

    /// Attach (or replace) a sideloaded relation.
    pub fn attach(&mut self, association: impl Into<String>, related: Related) {
        let association = association.into();
        match self.related.iter_mut().find(|(name, _)| *name == association) {
            Some(slot) => slot.1 = related,
            None => self.related.push((association, related)),
        }
    }
}

/// String form of an id or foreign key value, as it appears in documents.
pub fn id_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(values: Value) -> Record {
        match values {
            Value::Object(map) => Record::new("user", map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn stringifies_ids() {
        assert_eq!(record(json!({ "id": 34672 })).id_string(), "34672");
        assert_eq!(record(json!({ "id": "abc" })).id_string(), "abc");
        assert_eq!(record(json!({ "name": "x" })).id_string(), "undefined");
        assert_eq!(record(json!({ "id": null })).id_string(), "null");
    }

    #[test]
    fn attach_replaces_existing_relation() {
        let mut user = record(json!({ "id": 1 }));
        user.attach("posts", Related::Many(vec![]));
        user.attach("posts", Related::Many(vec![record(json!({ "id": 2 }))]));
        assert_eq!(user.related.len(), 1);
        assert_eq!(user.related("posts").unwrap().records().len(), 1);
        assert!(user.related("comments").is_none());
    }
}
