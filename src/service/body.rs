//! Create/update request documents: `{ "data": { "type", "id"?, "attributes"?, "relationships"? } }`
//! turned into camelCase attribute values for the store.

use super::validation::RequestValidator;
use crate::case::to_camel_case;
use crate::config::{ModelSchema, Registry, TypedModel};
use crate::error::ApiError;
use serde_json::{Map, Value};

/// Attribute values for a create. A client-generated id is rejected on its own with 403.
pub fn parse_create(body: &Value, model: &ModelSchema, registry: &Registry) -> Result<Map<String, Value>, Vec<ApiError>> {
    let data = data_member(body).map_err(|e| vec![e])?;
    if data.get("id").map(|v| !v.is_null()).unwrap_or(false) {
        return Err(vec![ApiError::forbidden(
            "/data/id",
            format!("client-generated ids are not supported for {}", model.get_type()),
        )]);
    }
    let mut errors = Vec::new();
    check_type(data, model, &mut errors);
    let values = collect_values(data, model, registry, &mut errors);
    errors.extend(RequestValidator::validate(&values, model));
    finish(values, errors)
}

/// Attribute values for an update of resource `id`; only members present are returned.
pub fn parse_update(
    body: &Value,
    model: &ModelSchema,
    registry: &Registry,
    id: &str,
) -> Result<Map<String, Value>, Vec<ApiError>> {
    let data = data_member(body).map_err(|e| vec![e])?;
    let mut errors = Vec::new();
    check_type(data, model, &mut errors);
    match data.get("id") {
        Some(Value::String(given)) if given == id => {}
        Some(Value::String(given)) => errors.push(ApiError::unprocessable(
            "/data/id",
            format!("id \"{}\" does not match the resource being updated (\"{}\")", given, id),
        )),
        Some(_) => errors.push(ApiError::unprocessable("/data/id", "id must be a string")),
        None => errors.push(ApiError::unprocessable("/data/id", "data must contain an id")),
    }
    let values = collect_values(data, model, registry, &mut errors);
    errors.extend(RequestValidator::validate_partial(&values, model));
    finish(values, errors)
}

fn finish(values: Map<String, Value>, errors: Vec<ApiError>) -> Result<Map<String, Value>, Vec<ApiError>> {
    if errors.is_empty() {
        Ok(values)
    } else {
        Err(errors)
    }
}

fn data_member(body: &Value) -> Result<&Map<String, Value>, ApiError> {
    match body.get("data") {
        Some(Value::Object(data)) => Ok(data),
        Some(_) => Err(ApiError::unprocessable("/data", "data must be a resource object")),
        None => Err(ApiError::unprocessable("/data", "request document must contain data")),
    }
}

fn check_type(data: &Map<String, Value>, model: &ModelSchema, errors: &mut Vec<ApiError>) {
    match data.get("type") {
        Some(Value::String(t)) if t == model.get_type() => {}
        Some(Value::String(t)) => errors.push(ApiError::unprocessable(
            "/data/type",
            format!("type \"{}\" does not match the collection \"{}\"", t, model.get_type()),
        )),
        _ => errors.push(ApiError::unprocessable("/data/type", "data must contain a type")),
    }
}

/// Attributes (dasherized in the document) plus foreign keys from to-one relationship linkage.
fn collect_values(
    data: &Map<String, Value>,
    model: &ModelSchema,
    registry: &Registry,
    errors: &mut Vec<ApiError>,
) -> Map<String, Value> {
    let mut values = Map::new();

    match data.get("attributes") {
        None => {}
        Some(Value::Object(attributes)) => {
            for (key, value) in attributes {
                let name = to_camel_case(key);
                match model.attribute(&name) {
                    Some(attr) if !attr.is_id() => {
                        values.insert(name, value.clone());
                    }
                    _ => errors.push(ApiError::unprocessable(
                        format!("/data/attributes/{}", key),
                        format!("{} is not an attribute of {}", key, model.get_type()),
                    )),
                }
            }
        }
        Some(_) => errors.push(ApiError::unprocessable("/data/attributes", "attributes must be an object")),
    }

    match data.get("relationships") {
        None => {}
        Some(Value::Object(relationships)) => {
            for (key, member) in relationships {
                let pointer = format!("/data/relationships/{}", key);
                let Some(assoc) = model.association_by_segment(key) else {
                    errors.push(ApiError::unprocessable(
                        pointer,
                        format!("{} is not a relationship of {}", key, model.get_type()),
                    ));
                    continue;
                };
                if !assoc.kind.is_belongs_to() {
                    errors.push(ApiError::forbidden(
                        pointer,
                        format!("{} cannot be replaced through {}", key, model.get_type()),
                    ));
                    continue;
                }
                let Some(target) = registry.target(assoc) else {
                    continue;
                };
                match member.get("data") {
                    Some(Value::Null) => {
                        values.insert(assoc.foreign_key.clone(), Value::Null);
                    }
                    Some(Value::Object(linkage)) => {
                        match linkage.get("type").and_then(Value::as_str) {
                            Some(t) if t == target.get_type() => {}
                            _ => {
                                errors.push(ApiError::unprocessable(
                                    format!("{}/data/type", pointer),
                                    format!("{} must link to {}", key, target.get_type()),
                                ));
                                continue;
                            }
                        }
                        match linkage.get("id").and_then(Value::as_str).and_then(|id| target.pk_type.parse_id(id)) {
                            Some(id) => {
                                values.insert(assoc.foreign_key.clone(), id);
                            }
                            None => errors.push(ApiError::unprocessable(
                                format!("{}/data/id", pointer),
                                format!("{} needs a valid {} id", key, target.get_type()),
                            )),
                        }
                    }
                    _ => errors.push(ApiError::unprocessable(
                        format!("{}/data", pointer),
                        "a to-one relationship takes a resource identifier or null",
                    )),
                }
            }
        }
        Some(_) => errors.push(ApiError::unprocessable("/data/relationships", "relationships must be an object")),
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::blog_registry;
    use serde_json::json;

    fn pointers(errors: &[ApiError]) -> Vec<String> {
        errors
            .iter()
            .map(|e| e.to_object().source.unwrap().pointer.unwrap())
            .collect()
    }

    #[test]
    fn create_maps_attributes_and_linkage() {
        let registry = blog_registry();
        let post = registry.model("post").unwrap();
        let body = json!({ "data": {
            "type": "posts",
            "attributes": { "title": "Hello", "body": "..." },
            "relationships": { "user": { "data": { "type": "users", "id": "3" } } }
        } });
        let values = parse_create(&body, post, &registry).unwrap();
        assert_eq!(values["title"], json!("Hello"));
        assert_eq!(values["userId"], json!(3));
    }

    #[test]
    fn client_generated_id_is_forbidden_alone() {
        let registry = blog_registry();
        let user = registry.model("user").unwrap();
        let body = json!({ "data": { "type": "nope", "id": "5", "attributes": { "bogus": 1 } } });
        let errors = parse_create(&body, user, &registry).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].status().as_u16(), 403);
        assert_eq!(pointers(&errors), vec!["/data/id"]);
    }

    #[test]
    fn structural_errors_accumulate() {
        let registry = blog_registry();
        let user = registry.model("user").unwrap();
        let body = json!({ "data": {
            "type": "posts",
            "attributes": { "first-name": "Ann", "email": "ann@example.com", "nickname": "a" },
            "relationships": { "posts": { "data": [] }, "friend": { "data": null } }
        } });
        let errors = parse_create(&body, user, &registry).unwrap_err();
        assert_eq!(
            pointers(&errors),
            vec![
                "/data/type",
                "/data/attributes/nickname",
                "/data/relationships/friend",
                "/data/relationships/posts"
            ]
        );
        assert_eq!(errors[3].status().as_u16(), 403);
    }

    #[test]
    fn missing_data() {
        let registry = blog_registry();
        let user = registry.model("user").unwrap();
        let errors = parse_create(&json!({ "type": "users" }), user, &registry).unwrap_err();
        assert_eq!(pointers(&errors), vec!["/data"]);
    }

    #[test]
    fn update_requires_matching_id() {
        let registry = blog_registry();
        let user = registry.model("user").unwrap();
        let ok = json!({ "data": { "type": "users", "id": "2", "attributes": { "last-name": "Lee" } } });
        let values = parse_update(&ok, user, &registry, "2").unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values["lastName"], json!("Lee"));

        let wrong = json!({ "data": { "type": "users", "id": "3" } });
        assert_eq!(pointers(&parse_update(&wrong, user, &registry, "2").unwrap_err()), vec!["/data/id"]);
        let missing = json!({ "data": { "type": "users", "attributes": { "email": "bad" } } });
        assert_eq!(
            pointers(&parse_update(&missing, user, &registry, "2").unwrap_err()),
            vec!["/data/id", "/data/attributes/email"]
        );
    }

    #[test]
    fn linkage_must_match_target() {
        let registry = blog_registry();
        let comment = registry.model("comment").unwrap();
        let body = json!({ "data": {
            "type": "comments",
            "attributes": { "body": "hi" },
            "relationships": {
                "post": { "data": { "type": "users", "id": "1" } },
                "user": { "data": { "type": "users", "id": "abc" } }
            }
        } });
        let errors = parse_create(&body, comment, &registry).unwrap_err();
        assert_eq!(
            pointers(&errors),
            vec!["/data/relationships/post/data/type", "/data/relationships/user/data/id"]
        );
    }
}
