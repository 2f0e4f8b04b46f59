//! Attribute validation from per-model config rules.

use crate::case::to_dasherized;
use crate::config::{ModelSchema, ValidationRule};
use crate::error::ApiError;
use regex::Regex;
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create: required attributes must be present and non-null.
    /// Every violation is returned, in attribute declaration order.
    pub fn validate(values: &Map<String, Value>, model: &ModelSchema) -> Vec<ApiError> {
        let mut errors = Vec::new();
        for attr in &model.attributes {
            let Some(rule) = model.validation.get(&attr.name) else { continue };
            let val = values.get(&attr.name);
            if rule.required == Some(true) && val.map(Value::is_null).unwrap_or(true) {
                errors.push(violation(&attr.name, "is required").with_title("Required Attribute Missing"));
                continue;
            }
            if let Some(v) = val {
                validate_field(&attr.name, v, rule, &mut errors);
            }
        }
        errors
    }

    /// Validate an update: only attributes present are checked, but a present
    /// required attribute still may not be null.
    pub fn validate_partial(values: &Map<String, Value>, model: &ModelSchema) -> Vec<ApiError> {
        let mut errors = Vec::new();
        for attr in &model.attributes {
            let (Some(rule), Some(v)) = (model.validation.get(&attr.name), values.get(&attr.name)) else {
                continue;
            };
            if rule.required == Some(true) && v.is_null() {
                errors.push(violation(&attr.name, "is required").with_title("Required Attribute Missing"));
                continue;
            }
            validate_field(&attr.name, v, rule, &mut errors);
        }
        errors
    }
}

fn violation(attr: &str, message: impl std::fmt::Display) -> ApiError {
    let name = to_dasherized(attr);
    ApiError::unprocessable(format!("/data/attributes/{}", name), format!("{} {}", name, message))
}

fn validate_field(attr: &str, v: &Value, rule: &ValidationRule, errors: &mut Vec<ApiError>) {
    if v.is_null() {
        return;
    }
    if let Some(format) = &rule.format {
        if let Some(message) = check_format(v, format) {
            errors.push(violation(attr, message));
        }
    }
    let len = v.as_str().map(|s| s.chars().count());
    if let (Some(max), Some(len)) = (rule.max_length, len) {
        if len > max as usize {
            errors.push(violation(attr, format!("must be at most {} characters", max)));
        }
    }
    if let (Some(min), Some(len)) = (rule.min_length, len) {
        if len < min as usize {
            errors.push(violation(attr, format!("must be at least {} characters", min)));
        }
    }
    if let (Some(pattern), Some(s)) = (&rule.pattern, v.as_str()) {
        match Regex::new(pattern) {
            Ok(re) if !re.is_match(s) => errors.push(violation(attr, "does not match the required pattern")),
            Ok(_) => {}
            Err(e) => tracing::warn!(attribute = %attr, error = %e, "invalid validation pattern ignored"),
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            let listed: Vec<String> = allowed.iter().take(5).map(Value::to_string).collect();
            errors.push(violation(attr, format!("must be one of: {}", listed.join(", "))));
        }
    }
    if let (Some(min), Some(n)) = (rule.minimum, v.as_f64()) {
        if n < min {
            errors.push(violation(attr, format!("must be at least {}", min)));
        }
    }
    if let (Some(max), Some(n)) = (rule.maximum, v.as_f64()) {
        if n > max {
            errors.push(violation(attr, format!("must be at most {}", max)));
        }
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn check_format(v: &Value, format: &str) -> Option<&'static str> {
    let s = v.as_str()?;
    match format.to_lowercase().as_str() {
        "email" => {
            let valid = s
                .split_once('@')
                .map(|(local, domain)| !local.is_empty() && !domain.is_empty())
                .unwrap_or(false);
            (!valid).then_some("must be a valid email")
        }
        "uuid" => uuid::Uuid::parse_str(s).is_err().then_some("must be a valid UUID"),
        _ => None,
    }
}
