//! Query parameters of a fetch request, validated against the live schema.

use super::include::{resolve_includes, IncludeDirective, IncludeNode};
use super::page::{parse_pagination, PageParams};
use super::sort::{validate_sort, Order};
use crate::config::{ModelSchema, Registry};
use crate::error::ApiError;
use std::collections::HashMap;

/// Normalized input for the store: what to sideload, which window, in which order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuerySpec {
    pub include: Vec<IncludeDirective>,
    pub limit: u64,
    pub offset: u64,
    pub order: Order,
}

/// A list request for one model. Each request builds its own.
#[derive(Clone, Debug)]
pub struct GetListRequest<'a> {
    model: &'a ModelSchema,
    include: IncludeNode,
    page: PageParams,
    sort: Option<String>,
}

impl<'a> GetListRequest<'a> {
    pub fn new(params: &HashMap<String, String>, model: &'a ModelSchema) -> Self {
        GetListRequest {
            model,
            include: include_tree(params),
            page: PageParams::from_query(params),
            sort: params.get("sort").cloned(),
        }
    }

    pub fn include_tree(&self) -> &IncludeNode {
        &self.include
    }

    /// Runs include, page and sort checks and reports every problem at once,
    /// in that order.
    pub fn validate(&self, registry: &Registry) -> Result<QuerySpec, Vec<ApiError>> {
        let (include, mut errors) = resolve_includes(&self.include, self.model, registry);

        let (page, page_errors) = parse_pagination(&self.page);
        errors.extend(page_errors);

        let (order, sort_errors) = match &self.sort {
            Some(raw) => validate_sort(raw, self.model),
            None => (Vec::new(), Vec::new()),
        };
        errors.extend(sort_errors);

        if !errors.is_empty() {
            tracing::debug!(model = %self.model.name, errors = errors.len(), "list request rejected");
            return Err(errors);
        }
        Ok(QuerySpec {
            include,
            limit: page.limit,
            offset: page.offset,
            order,
        })
    }
}

/// Include directives for a single-resource fetch; paging and sorting do not apply.
pub fn validate_include(
    params: &HashMap<String, String>,
    model: &ModelSchema,
    registry: &Registry,
) -> Result<Vec<IncludeDirective>, Vec<ApiError>> {
    let (include, errors) = resolve_includes(&include_tree(params), model, registry);
    if errors.is_empty() {
        Ok(include)
    } else {
        Err(errors)
    }
}

fn include_tree(params: &HashMap<String, String>) -> IncludeNode {
    params
        .get("include")
        .map(|raw| IncludeNode::parse(raw))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::blog_registry;
    use crate::query::sort::Direction;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn composes_query_spec() {
        let registry = blog_registry();
        let user = registry.model("user").unwrap();
        let p = params(&[
            ("include", "posts.comments"),
            ("page[number]", "3"),
            ("page[size]", "10"),
            ("sort", "-last-name,first-name"),
        ]);
        let spec = GetListRequest::new(&p, user).validate(&registry).unwrap();
        assert_eq!(spec.offset, 20);
        assert_eq!(spec.limit, 10);
        assert_eq!(
            spec.order,
            vec![
                ("lastName".to_string(), Direction::Desc),
                ("firstName".to_string(), Direction::Asc)
            ]
        );
        assert_eq!(spec.include[0].association, "posts");
        assert_eq!(spec.include[0].include[0].model, "comment");
    }

    #[test]
    fn defaults_without_parameters() {
        let registry = blog_registry();
        let spec = GetListRequest::new(&HashMap::new(), registry.model("post").unwrap())
            .validate(&registry)
            .unwrap();
        assert_eq!(spec, QuerySpec { include: vec![], limit: 20, offset: 0, order: vec![] });
    }

    #[test]
    fn reports_all_errors_in_order() {
        let registry = blog_registry();
        let user = registry.model("user").unwrap();
        let p = params(&[("sort", "invalid-attr"), ("include", "nope"), ("page[offset]", "x")]);
        let errors = GetListRequest::new(&p, user).validate(&registry).unwrap_err();
        let parameters: Vec<_> = errors
            .iter()
            .map(|e| e.to_object().source.unwrap().parameter.unwrap())
            .collect();
        assert_eq!(parameters, vec!["include", "page[offset]", "sort"]);
    }

    #[test]
    fn single_resource_include() {
        let registry = blog_registry();
        let post = registry.model("post").unwrap();
        let ok = validate_include(&params(&[("include", "user,comments")]), post, &registry).unwrap();
        assert_eq!(ok.len(), 2);
        let err = validate_include(&params(&[("include", "author")]), post, &registry).unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(validate_include(&HashMap::new(), post, &registry).unwrap().is_empty());
    }
}
