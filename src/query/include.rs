//! `include` parameter: relationship path tree and its validation against the schema.

use crate::config::{ModelSchema, Registry};
use crate::error::{ApiError, ABOUT_INCLUDES};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Requested relationship paths merged into a tree. A node without children is a leaf.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IncludeNode {
    children: Vec<(String, IncludeNode)>,
}

impl IncludeNode {
    /// Parse `"foo.bar,foo.baz,qux"`; shared prefixes share a node.
    pub fn parse(raw: &str) -> Self {
        let mut root = IncludeNode::default();
        for path in raw.split(',') {
            let mut node = &mut root;
            for name in path.split('.').map(str::trim).filter(|s| !s.is_empty()) {
                node = node.child_entry(name);
            }
        }
        root
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &IncludeNode)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn child(&self, name: &str) -> Option<&IncludeNode> {
        self.children.iter().find(|(n, _)| n == name).map(|(_, node)| node)
    }

    fn child_entry(&mut self, name: &str) -> &mut IncludeNode {
        let idx = match self.children.iter().position(|(n, _)| n == name) {
            Some(idx) => idx,
            None => {
                self.children.push((name.to_string(), IncludeNode::default()));
                self.children.len() - 1
            }
        };
        &mut self.children[idx].1
    }

    /// Dot-paths to every leaf, in tree order.
    pub fn to_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (name, child) in &self.children {
            if child.is_empty() {
                out.push(name.clone());
            } else {
                out.extend(child.to_paths().into_iter().map(|p| format!("{}.{}", name, p)));
            }
        }
        out
    }

    /// Back to the `include` parameter form.
    pub fn to_param(&self) -> String {
        self.to_paths().join(",")
    }
}

impl Serialize for IncludeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.children.len()))?;
        for (name, child) in &self.children {
            map.serialize_entry(name, child)?;
        }
        map.end()
    }
}

/// Validated include: load `association` (camelCase) of the current model, whose target is `model`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncludeDirective {
    pub association: String,
    pub model: String,
    pub include: Vec<IncludeDirective>,
}

impl IncludeDirective {
    pub fn new(association: impl Into<String>, model: impl Into<String>) -> Self {
        IncludeDirective {
            association: association.into(),
            model: model.into(),
            include: Vec::new(),
        }
    }
}

/// Walk the tree against the live schema, producing a parallel directive tree plus one error per
/// relationship that does not exist on the model at that depth.
pub fn resolve_includes(
    node: &IncludeNode,
    model: &ModelSchema,
    registry: &Registry,
) -> (Vec<IncludeDirective>, Vec<ApiError>) {
    let mut directives = Vec::new();
    let mut errors = Vec::new();
    resolve_level(node, model, registry, "", &mut directives, &mut errors);
    (directives, errors)
}

fn resolve_level(
    node: &IncludeNode,
    model: &ModelSchema,
    registry: &Registry,
    path: &str,
    directives: &mut Vec<IncludeDirective>,
    errors: &mut Vec<ApiError>,
) {
    for (name, child) in node.children() {
        let full_path = if path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", path, name)
        };
        let target = model
            .association_by_segment(name)
            .and_then(|assoc| registry.target(assoc).map(|target| (assoc, target)));
        let Some((assoc, target)) = target else {
            errors.push(
                ApiError::bad_parameter(
                    "include",
                    format!(
                        "{} has no relationship \"{}\" (requested as \"{}\")",
                        model.name, name, full_path
                    ),
                )
                .with_about(ABOUT_INCLUDES),
            );
            continue;
        };
        let mut directive = IncludeDirective::new(assoc.name.clone(), target.name.clone());
        resolve_level(child, target, registry, &full_path, &mut directive.include, errors);
        directives.push(directive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::blog_registry;
    use serde_json::json;

    #[test]
    fn merges_shared_prefixes() {
        let tree = IncludeNode::parse("foo,bar,foo.bingo,foo.bongo.ding");
        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!({ "foo": { "bingo": {}, "bongo": { "ding": {} } }, "bar": {} })
        );
        assert!(tree.child("foo").unwrap().child("bongo").unwrap().child("ding").unwrap().is_empty());
        assert!(tree.child("bar").unwrap().is_empty());
    }

    #[test]
    fn empty_parameter_is_empty_tree() {
        assert!(IncludeNode::parse("").is_empty());
        assert!(IncludeNode::parse(",,").is_empty());
    }

    #[test]
    fn reparsing_paths_is_idempotent() {
        let tree = IncludeNode::parse("foo.bar,foo.baz,foo.bar.bing,qux");
        assert_eq!(tree.to_paths(), vec!["foo.bar.bing", "foo.baz", "qux"]);
        assert_eq!(IncludeNode::parse(&tree.to_param()), tree);
    }

    #[test]
    fn resolves_nested_includes() {
        let registry = blog_registry();
        let user = registry.model("user").unwrap();
        let (directives, errors) = resolve_includes(&IncludeNode::parse("posts.comments.user,comments"), user, &registry);
        assert!(errors.is_empty());
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].association, "posts");
        assert_eq!(directives[0].model, "post");
        assert_eq!(directives[0].include[0].model, "comment");
        assert_eq!(directives[0].include[0].include[0], IncludeDirective::new("user", "user"));
        assert_eq!(directives[1], IncludeDirective::new("comments", "comment"));
    }

    #[test]
    fn reports_each_missing_relationship() {
        let registry = blog_registry();
        let post = registry.model("post").unwrap();
        let (directives, errors) = resolve_includes(&IncludeNode::parse("user.nope,tags,user.posts"), post, &registry);
        assert_eq!(errors.len(), 2);
        for e in &errors {
            let obj = e.to_object();
            assert_eq!(obj.status, 400);
            assert_eq!(obj.source.unwrap().parameter.as_deref(), Some("include"));
        }
        assert!(errors[0].to_string().contains("user has no relationship \"nope\""));
        assert!(errors[1].to_string().contains("post has no relationship \"tags\""));
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].include, vec![IncludeDirective::new("posts", "post")]);
    }
}
