//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for a model.
//! Columns are selected under their camelCase attribute name so rows decode straight into records.

use crate::config::{AttributeInfo, ModelSchema, ID_ATTRIBUTE};
use crate::query::Direction;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a value and return its placeholder, cast when the column type needs it.
    fn push_param(&mut self, v: Value, attr: Option<&AttributeInfo>) -> String {
        self.params.push(v);
        let n = self.params.len();
        match attr.and_then(|a| a.pg_type.as_deref()) {
            Some(t) => format!("${}::{}", n, t),
            None => format!("${}", n),
        }
    }
}

/// SELECT list: `"column" AS "attribute"`; enums and numeric come back as text.
fn select_column_list(model: &ModelSchema) -> String {
    model
        .attributes
        .iter()
        .map(|a| {
            let col = quoted(&a.column);
            let pg_type = a.pg_type.as_deref().unwrap_or("");
            let expr = if pg_type.contains('.') || pg_type == "numeric" {
                format!("{}::text", col)
            } else {
                col
            };
            format!("{} AS {}", expr, quoted(&a.name))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn id_column(model: &ModelSchema) -> String {
    model
        .attribute(ID_ATTRIBUTE)
        .map(|a| quoted(&a.column))
        .unwrap_or_else(|| quoted(ID_ATTRIBUTE))
}

/// SELECT by primary key.
pub fn select_by_id(model: &ModelSchema, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(id.clone(), model.attribute(ID_ATTRIBUTE));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(model),
        quoted(&model.table_name),
        id_column(model),
        ph
    );
    q
}

/// One page ordered by the given attributes, then by id so pages are stable.
pub fn select_page(model: &ModelSchema, order: &[(String, Direction)], limit: u64, offset: u64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut order_parts: Vec<String> = order
        .iter()
        .filter_map(|(attr, dir)| model.attribute(attr).map(|a| format!("{} {}", quoted(&a.column), dir)))
        .collect();
    if !order.iter().any(|(attr, _)| attr == ID_ATTRIBUTE) {
        order_parts.push(format!("{} ASC", id_column(model)));
    }
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(model),
        quoted(&model.table_name),
        order_parts.join(", "),
        limit,
        offset
    );
    q
}

pub fn count_all(model: &ModelSchema) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT COUNT(*) FROM {}", quoted(&model.table_name));
    q
}

/// SELECT ... WHERE column IN ($1, $2, ...) ORDER BY id. Used for batch-fetching related rows.
pub fn select_by_attribute_in(model: &ModelSchema, attribute: &str, values: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let attr = model.attribute(attribute);
    let column = attr.map(|a| a.column.as_str()).unwrap_or(attribute);
    if values.is_empty() {
        q.sql = format!(
            "SELECT {} FROM {} WHERE 1 = 0",
            select_column_list(model),
            quoted(&model.table_name)
        );
        return q;
    }
    let placeholders: Vec<String> = values.iter().map(|v| q.push_param(v.clone(), attr)).collect();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({}) ORDER BY {}",
        select_column_list(model),
        quoted(&model.table_name),
        quoted(column),
        placeholders.join(", "),
        id_column(model)
    );
    q
}

/// INSERT: attributes present in `values`; omitted attributes with a default are left to the database.
pub fn insert(model: &ModelSchema, values: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for attr in &model.attributes {
        let val = match values.get(&attr.name) {
            Some(v) => v.clone(),
            None if attr.has_default() => continue,
            None => Value::Null,
        };
        placeholders.push(q.push_param(val, Some(attr)));
        cols.push(quoted(&attr.column));
    }
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            quoted(&model.table_name),
            select_column_list(model)
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quoted(&model.table_name),
            cols.join(", "),
            placeholders.join(", "),
            select_column_list(model)
        )
    };
    q
}

/// UPDATE by id: SET only declared, non-id attributes present in `values`.
/// With nothing to set this degrades to a SELECT by id.
pub fn update(model: &ModelSchema, id: &Value, values: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for attr in model.attributes.iter().filter(|a| !a.is_id()) {
        let Some(v) = values.get(&attr.name) else { continue };
        let rhs = q.push_param(v.clone(), Some(attr));
        sets.push(format!("{} = {}", quoted(&attr.column), rhs));
    }
    if sets.is_empty() {
        return select_by_id(model, id);
    }
    let id_ph = q.push_param(id.clone(), model.attribute(ID_ATTRIBUTE));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        quoted(&model.table_name),
        sets.join(", "),
        id_column(model),
        id_ph,
        select_column_list(model)
    );
    q
}

/// DELETE by id.
pub fn delete(model: &ModelSchema, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(id.clone(), model.attribute(ID_ATTRIBUTE));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        quoted(&model.table_name),
        id_column(model),
        ph,
        id_column(model)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::blog_registry;
    use serde_json::json;

    #[test]
    fn selects_attributes_under_their_names() {
        let registry = blog_registry();
        let post = registry.model("post").unwrap();
        let q = select_by_id(post, &json!(1));
        assert!(q.sql.starts_with("SELECT \"id\" AS \"id\", \"title\" AS \"title\""));
        assert!(q.sql.contains("\"user_id\" AS \"userId\""));
        assert!(q.sql.ends_with("FROM \"posts\" WHERE \"id\" = $1"));
        assert_eq!(q.params, vec![json!(1)]);
    }

    #[test]
    fn page_orders_then_tiebreaks_on_id() {
        let registry = blog_registry();
        let post = registry.model("post").unwrap();
        let q = select_page(post, &[("createdAt".into(), Direction::Desc)], 20, 40);
        assert!(q.sql.ends_with("ORDER BY \"created_at\" DESC, \"id\" ASC LIMIT 20 OFFSET 40"));
        let q = select_page(post, &[], 5, 0);
        assert!(q.sql.ends_with("ORDER BY \"id\" ASC LIMIT 5 OFFSET 0"));
    }

    #[test]
    fn far_page_offset_fits_bigint() {
        let registry = blog_registry();
        let post = registry.model("post").unwrap();
        let params: std::collections::HashMap<String, String> =
            [("page[number]", "1000000000000000000"), ("page[size]", "100")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
        let spec = crate::query::GetListRequest::new(&params, post).validate(&registry).unwrap();
        let q = select_page(post, &spec.order, spec.limit, spec.offset);
        assert!(q.sql.ends_with(&format!("LIMIT 100 OFFSET {}", i64::MAX)));
    }

    #[test]
    fn insert_skips_defaults_and_casts() {
        let registry = blog_registry();
        let post = registry.model("post").unwrap();
        let values = match json!({ "title": "t", "userId": 2, "createdAt": "2024-01-01T00:00:00Z" }) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        let q = insert(post, &values);
        assert!(q.sql.starts_with("INSERT INTO \"posts\" (\"title\", \"body\", \"user_id\", \"created_at\") VALUES ($1, $2, $3, $4::timestamptz)"));
        assert_eq!(q.params, vec![json!("t"), Value::Null, json!(2), json!("2024-01-01T00:00:00Z")]);
    }

    #[test]
    fn update_sets_only_given_attributes() {
        let registry = blog_registry();
        let user = registry.model("user").unwrap();
        let values = match json!({ "lastName": "Lee", "id": 9 }) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        let q = update(user, &json!(3), &values);
        assert!(q.sql.starts_with("UPDATE \"users\" SET \"last_name\" = $1 WHERE \"id\" = $2 RETURNING"));
        assert_eq!(q.params, vec![json!("Lee"), json!(3)]);
        assert!(update(user, &json!(3), &Map::new()).sql.starts_with("SELECT"));
    }

    #[test]
    fn batch_select_uses_in_list() {
        let registry = blog_registry();
        let comment = registry.model("comment").unwrap();
        let q = select_by_attribute_in(comment, "postId", &[json!(1), json!(2)]);
        assert!(q.sql.contains("WHERE \"post_id\" IN ($1, $2) ORDER BY \"id\""));
        assert!(select_by_attribute_in(comment, "postId", &[]).sql.ends_with("WHERE 1 = 0"));
    }
}
