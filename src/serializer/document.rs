//! Top-level JSON:API documents.

use super::included::{dedup_included, extract_included};
use super::resource::{ResourceIdentifierObject, ResourceObject};
use crate::config::{Association, ModelSchema, Registry, TypedModel};
use crate::record::Record;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
}

impl Links {
    fn self_only(self_: String) -> Self {
        Links { self_, related: None }
    }
}

/// List links; `next` and `prev` render as `null` when there is no such page.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PaginationLinks {
    #[serde(rename = "self")]
    pub self_: String,
    pub first: String,
    pub last: String,
    pub next: Option<String>,
    pub prev: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Meta {
    pub total: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Document<D, L = Links> {
    pub data: D,
    pub links: L,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub included: Option<Vec<ResourceObject>>,
}

/// Offsets behind the pagination links of a list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageOffsets {
    pub first: u64,
    pub last: u64,
    pub next: Option<u64>,
    pub prev: Option<u64>,
}

impl PageOffsets {
    pub fn compute(offset: u64, limit: u64, total: u64) -> Self {
        if limit == 0 {
            return PageOffsets { first: 0, last: 0, next: None, prev: None };
        }
        let last = total / limit * limit;
        PageOffsets {
            first: 0,
            last,
            next: offset.checked_add(limit).filter(|n| *n <= last),
            prev: (offset > limit).then(|| offset - limit),
        }
    }
}

/// The window and the request query a list document was produced from.
#[derive(Clone, Copy, Debug)]
pub struct ListContext<'q> {
    pub offset: u64,
    pub limit: u64,
    pub total: u64,
    /// Raw query string of the request, without `?`.
    pub query: Option<&'q str>,
}

/// Builds documents with links rooted at `base_url`.
#[derive(Clone, Debug)]
pub struct Serializer {
    base_url: String,
    registry: Arc<Registry>,
}

impl Serializer {
    pub fn new(base_url: impl Into<String>, registry: Arc<Registry>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Serializer { base_url, registry }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn resource(&self, record: &Record, model: &ModelSchema) -> ResourceObject {
        ResourceObject::from_record(record, model, &self.registry, &self.base_url)
    }

    pub fn resource_url(&self, model: &ModelSchema, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, model.get_type(), id)
    }

    pub fn single(&self, record: &Record, model: &ModelSchema) -> Document<ResourceObject> {
        Document {
            data: self.resource(record, model),
            links: Links::self_only(self.resource_url(model, &record.id_string())),
            meta: None,
            included: self.included(&[record]),
        }
    }

    pub fn list(&self, records: &[Record], model: &ModelSchema, ctx: ListContext<'_>) -> Document<Vec<ResourceObject>, PaginationLinks> {
        let collection = format!("{}/{}", self.base_url, model.get_type());
        let self_ = match ctx.query.filter(|q| !q.is_empty()) {
            Some(q) => format!("{}?{}", collection, q),
            None => collection.clone(),
        };
        let carried = ctx.query.map(strip_page_params).unwrap_or_default();
        let page_link = |offset: u64| {
            let sep = if carried.is_empty() { "" } else { "&" };
            format!(
                "{}?{}{}page[offset]={}&page[limit]={}",
                collection, carried, sep, offset, ctx.limit
            )
        };
        let offsets = PageOffsets::compute(ctx.offset, ctx.limit, ctx.total);
        let refs: Vec<&Record> = records.iter().collect();
        Document {
            data: records.iter().map(|r| self.resource(r, model)).collect(),
            links: PaginationLinks {
                self_,
                first: page_link(offsets.first),
                last: page_link(offsets.last),
                next: offsets.next.map(page_link),
                prev: offsets.prev.map(page_link),
            },
            meta: Some(Meta { total: ctx.total }),
            included: self.included(&refs),
        }
    }

    /// `GET /:type/:id/:relationship` for a to-one relationship.
    pub fn related_one(
        &self,
        parent: &ModelSchema,
        parent_id: &str,
        assoc: &Association,
        record: Option<&Record>,
    ) -> Document<Option<ResourceObject>> {
        let data = record.and_then(|r| self.model_of(r).map(|m| self.resource(r, m)));
        Document {
            data,
            links: Links::self_only(self.related_url(parent, parent_id, assoc)),
            meta: None,
            included: record.and_then(|r| self.included(&[r])),
        }
    }

    /// `GET /:type/:id/:relationship` for a to-many relationship.
    pub fn related_many(
        &self,
        parent: &ModelSchema,
        parent_id: &str,
        assoc: &Association,
        records: &[Record],
    ) -> Document<Vec<ResourceObject>> {
        let refs: Vec<&Record> = records.iter().collect();
        Document {
            data: records
                .iter()
                .filter_map(|r| self.model_of(r).map(|m| self.resource(r, m)))
                .collect(),
            links: Links::self_only(self.related_url(parent, parent_id, assoc)),
            meta: None,
            included: self.included(&refs),
        }
    }

    /// `GET /:type/:id/relationships/:relationship`, to-one linkage.
    pub fn relationship_one(
        &self,
        parent: &ModelSchema,
        parent_id: &str,
        assoc: &Association,
        record: Option<&Record>,
    ) -> Document<Option<ResourceIdentifierObject>> {
        Document {
            data: record.and_then(|r| self.model_of(r).map(|m| ResourceIdentifierObject::from_record(r, m))),
            links: self.relationship_links(parent, parent_id, assoc),
            meta: None,
            included: None,
        }
    }

    /// `GET /:type/:id/relationships/:relationship`, to-many linkage.
    pub fn relationship_many(
        &self,
        parent: &ModelSchema,
        parent_id: &str,
        assoc: &Association,
        records: &[Record],
    ) -> Document<Vec<ResourceIdentifierObject>> {
        Document {
            data: records
                .iter()
                .filter_map(|r| self.model_of(r).map(|m| ResourceIdentifierObject::from_record(r, m)))
                .collect(),
            links: self.relationship_links(parent, parent_id, assoc),
            meta: None,
            included: None,
        }
    }

    fn related_url(&self, parent: &ModelSchema, parent_id: &str, assoc: &Association) -> String {
        format!("{}/{}", self.resource_url(parent, parent_id), assoc.segment())
    }

    fn relationship_links(&self, parent: &ModelSchema, parent_id: &str, assoc: &Association) -> Links {
        Links {
            self_: format!(
                "{}/relationships/{}",
                self.resource_url(parent, parent_id),
                assoc.segment()
            ),
            related: Some(self.related_url(parent, parent_id, assoc)),
        }
    }

    fn model_of(&self, record: &Record) -> Option<&ModelSchema> {
        self.registry.model(&record.model)
    }

    /// Sideloaded records of `primary`, once each and never repeating a primary resource.
    /// None when there is nothing to include.
    fn included(&self, primary: &[&Record]) -> Option<Vec<ResourceObject>> {
        let primary_keys: HashSet<(String, String)> =
            primary.iter().map(|r| (r.model.clone(), r.id_string())).collect();
        let included: Vec<ResourceObject> = dedup_included(extract_included(primary, &self.registry))
            .into_iter()
            .filter(|r| !primary_keys.contains(&(r.model.clone(), r.id_string())))
            .filter_map(|r| self.model_of(r).map(|m| self.resource(r, m)))
            .collect();
        (!included.is_empty()).then_some(included)
    }
}

/// Drop `page[...]` pairs from a raw query string, keeping the rest verbatim.
fn strip_page_params(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default();
            let key = urlencoding::decode(key).map(|k| k.into_owned()).unwrap_or_else(|_| key.to_string());
            !key.starts_with("page[")
        })
        .collect::<Vec<_>>()
        .join("&")
}
