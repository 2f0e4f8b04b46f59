//! `page[...]` parameters: offset/limit or number/size, normalized to offset/limit.

use crate::error::{ApiError, ABOUT_PAGINATION};
use std::collections::HashMap;

pub const DEFAULT_LIMIT: u64 = 20;

/// Largest offset or limit handed to storage; PostgreSQL takes both as bigint.
pub const MAX_WINDOW: u64 = i64::MAX as u64;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageParams {
    pub offset: Option<String>,
    pub limit: Option<String>,
    pub number: Option<String>,
    pub size: Option<String>,
}

impl PageParams {
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        PageParams {
            offset: params.get("page[offset]").cloned(),
            limit: params.get("page[limit]").cloned(),
            number: params.get("page[number]").cloned(),
            size: params.get("page[size]").cloned(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Compute offset/limit and collect every problem. The returned values are always filled in;
/// callers must look at the errors before trusting them.
pub fn parse_pagination(params: &PageParams) -> (Pagination, Vec<ApiError>) {
    let mut errors = Vec::new();

    if params.offset.is_some() && params.number.is_some() {
        errors.push(
            ApiError::bad_parameter("page", "page[offset] and page[number] are mutually exclusive")
                .with_about(ABOUT_PAGINATION),
        );
    }
    if params.limit.is_some() && params.size.is_some() {
        errors.push(
            ApiError::bad_parameter("page", "page[limit] and page[size] are mutually exclusive")
                .with_about(ABOUT_PAGINATION),
        );
    }

    let offset = parse_field("offset", params.offset.as_deref(), 0, &mut errors);
    let limit = parse_field("limit", params.limit.as_deref(), 0, &mut errors);
    let number = parse_field("number", params.number.as_deref(), 1, &mut errors);
    let size = parse_field("size", params.size.as_deref(), 0, &mut errors);

    let limit = limit
        .or(size)
        .map(|n| n.max(0) as u64)
        .unwrap_or(DEFAULT_LIMIT)
        .min(MAX_WINDOW);
    let offset = match number {
        Some(n) => (n.max(1) as u64 - 1).saturating_mul(limit),
        None => offset.map(|n| n.max(0) as u64).unwrap_or(0),
    }
    .min(MAX_WINDOW);

    (Pagination { offset, limit }, errors)
}

/// Numeric value of one `page[field]`, or None (with an error pushed) when absent or unusable as a number.
fn parse_field(field: &str, raw: Option<&str>, minimum: i64, errors: &mut Vec<ApiError>) -> Option<i64> {
    let raw = raw?;
    let parameter = format!("page[{}]", field);
    let parsed = raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| n.trunc() as i64);
    let Some(n) = parsed else {
        errors.push(
            ApiError::bad_parameter(parameter.clone(), format!("{} must be a number, got \"{}\"", parameter, raw))
                .with_about(ABOUT_PAGINATION),
        );
        return None;
    };
    if n < minimum {
        errors.push(
            ApiError::bad_parameter(
                parameter.clone(),
                format!("{} must not be a number lower than {}", parameter, minimum),
            )
            .with_about(ABOUT_PAGINATION),
        );
    }
    Some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(offset: Option<&str>, limit: Option<&str>, number: Option<&str>, size: Option<&str>) -> PageParams {
        PageParams {
            offset: offset.map(String::from),
            limit: limit.map(String::from),
            number: number.map(String::from),
            size: size.map(String::from),
        }
    }

    fn parameters(errors: &[ApiError]) -> Vec<String> {
        errors
            .iter()
            .filter_map(|e| e.to_object().source.and_then(|s| s.parameter))
            .collect()
    }

    #[test]
    fn defaults_without_parameters() {
        let (p, errors) = parse_pagination(&PageParams::default());
        assert!(errors.is_empty());
        assert_eq!(p, Pagination { offset: 0, limit: 20 });
    }

    #[test]
    fn offset_and_limit() {
        let (p, errors) = parse_pagination(&page(Some("80"), Some("20"), None, None));
        assert!(errors.is_empty());
        assert_eq!(p, Pagination { offset: 80, limit: 20 });
    }

    #[test]
    fn number_and_size_convert_to_offset() {
        let (p, errors) = parse_pagination(&page(None, None, Some("3"), Some("15")));
        assert!(errors.is_empty());
        assert_eq!(p, Pagination { offset: 30, limit: 15 });

        let (p, _) = parse_pagination(&page(None, None, Some("2"), None));
        assert_eq!(p, Pagination { offset: 20, limit: 20 });
    }

    #[test]
    fn mutually_exclusive_strategies() {
        let (_, errors) = parse_pagination(&page(Some("0"), Some("10"), Some("1"), Some("10")));
        assert_eq!(parameters(&errors), vec!["page", "page"]);
        assert!(errors[0].to_string().contains("mutually exclusive"));
    }

    #[test]
    fn non_numeric_values_cite_the_value() {
        let (p, errors) = parse_pagination(&page(Some("abc"), Some("ten"), None, None));
        assert_eq!(parameters(&errors), vec!["page[offset]", "page[limit]"]);
        assert!(errors[0].to_string().contains("\"abc\""));
        assert_eq!(p, Pagination::default());
    }

    #[test]
    fn minimums() {
        let (p, errors) = parse_pagination(&page(Some("-5"), Some("-1"), None, None));
        assert_eq!(parameters(&errors), vec!["page[offset]", "page[limit]"]);
        assert!(errors[0].to_string().contains("lower than 0"));
        assert_eq!(p, Pagination { offset: 0, limit: 0 });

        let (_, errors) = parse_pagination(&page(None, None, Some("0"), None));
        assert_eq!(parameters(&errors), vec!["page[number]"]);
        assert!(errors[0].to_string().contains("lower than 1"));
    }

    #[test]
    fn huge_pages_stay_within_bigint() {
        let (p, errors) = parse_pagination(&page(None, None, Some("1000000000000000000"), Some("100")));
        assert!(errors.is_empty());
        assert_eq!(p, Pagination { offset: MAX_WINDOW, limit: 100 });

        let (p, errors) = parse_pagination(&page(Some("1e30"), Some("1e30"), None, None));
        assert!(errors.is_empty());
        assert!(p.offset <= i64::MAX as u64 && p.limit <= i64::MAX as u64);
    }

    #[test]
    fn reads_bracketed_query_keys() {
        let params: HashMap<String, String> = [("page[number]", "2"), ("page[size]", "5"), ("sort", "x")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(PageParams::from_query(&params), page(None, None, Some("2"), Some("5")));
    }
}
