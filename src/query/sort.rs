//! `sort` parameter: comma-delimited dasherized attributes, `-` prefix for descending.

use crate::case::to_camel_case;
use crate::config::ModelSchema;
use crate::error::{ApiError, ABOUT_SORTING};
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// `(camelCaseAttribute, direction)` in request order.
pub type Order = Vec<(String, Direction)>;

pub fn parse_sort(raw: &str) -> Order {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|token| match token.strip_prefix('-') {
            Some(attr) => (to_camel_case(attr), Direction::Desc),
            None => (to_camel_case(token), Direction::Asc),
        })
        .collect()
}

/// One error per unknown attribute. Unknown entries stay in the returned order.
pub fn validate_sort(raw: &str, model: &ModelSchema) -> (Order, Vec<ApiError>) {
    let order = parse_sort(raw);
    let errors = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.strip_prefix('-').unwrap_or(t))
        .filter(|attr| !model.has_attribute(&to_camel_case(attr)))
        .map(|attr| {
            ApiError::bad_parameter(
                "sort",
                format!("\"{}\" is not a valid sort attribute of {}", attr, model.name),
            )
            .with_about(ABOUT_SORTING)
        })
        .collect();
    (order, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::blog_registry;

    #[test]
    fn ascending_and_descending() {
        assert_eq!(
            parse_sort("first-name,-created-at"),
            vec![
                ("firstName".to_string(), Direction::Asc),
                ("createdAt".to_string(), Direction::Desc)
            ]
        );
        assert!(parse_sort("").is_empty());
        assert_eq!(parse_sort("email,").len(), 1);
    }

    #[test]
    fn known_attribute_validates() {
        let registry = blog_registry();
        let (order, errors) = validate_sort("first-name", registry.model("user").unwrap());
        assert!(errors.is_empty());
        assert_eq!(order, vec![("firstName".to_string(), Direction::Asc)]);
    }

    #[test]
    fn unknown_attribute_is_reported_and_kept() {
        let registry = blog_registry();
        let (order, errors) = validate_sort("-invalid-attr,email", registry.model("user").unwrap());
        assert_eq!(errors.len(), 1);
        let obj = errors[0].to_object();
        assert!(obj.detail.unwrap().contains("\"invalid-attr\""));
        assert_eq!(obj.source.unwrap().parameter.as_deref(), Some("sort"));
        assert_eq!(order.len(), 2);
        assert_eq!(order[0], ("invalidAttr".to_string(), Direction::Desc));
    }

    #[test]
    fn direction_renders_as_sql_keyword() {
        assert_eq!(Direction::Desc.to_string(), "DESC");
        assert_eq!(serde_json::to_value(Direction::Asc).unwrap(), "ASC");
    }
}
