//! Persistence behind the resource handlers.
//!
//! Backends implement a handful of primitives; finding, counting and
//! sideloading related records are built on top of them once, here.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::config::{Association, ModelSchema, Registry, ID_ATTRIBUTE};
use crate::query::{Direction, IncludeDirective, QuerySpec};
use crate::record::{Record, Related};
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("unique constraint violated ({attribute:?})")]
    UniqueViolation { attribute: Option<String> },
    #[error("not-null constraint violated ({attribute:?})")]
    NotNullViolation { attribute: Option<String> },
    #[error("foreign key constraint violated ({attribute:?})")]
    ForeignKeyViolation { attribute: Option<String> },
    #[error("check constraint violated ({constraint:?})")]
    CheckViolation { constraint: Option<String> },
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("{model} has no association {association}")]
    UnknownAssociation { model: String, association: String },
}

#[async_trait]
pub trait ModelStore: Send + Sync {
    fn registry(&self) -> &Registry;

    async fn fetch_one(&self, model: &ModelSchema, id: &Value) -> Result<Option<Record>, StoreError>;

    /// One window of rows in `order` (id ascending when empty) plus the total row count.
    async fn fetch_page(
        &self,
        model: &ModelSchema,
        order: &[(String, Direction)],
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Record>, u64), StoreError>;

    /// Rows whose `attribute` equals any of `values`, id ascending.
    async fn fetch_where_in(&self, model: &ModelSchema, attribute: &str, values: &[Value]) -> Result<Vec<Record>, StoreError>;

    /// `values` holds camelCase attributes; omitted ones take their default.
    async fn insert(&self, model: &ModelSchema, values: Map<String, Value>) -> Result<Record, StoreError>;

    async fn update_by_id(&self, model: &ModelSchema, id: &Value, values: Map<String, Value>) -> Result<Option<Record>, StoreError>;

    /// True when a row was deleted.
    async fn delete_by_id(&self, model: &ModelSchema, id: &Value) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_by_id(
        &self,
        model: &ModelSchema,
        id: &Value,
        include: &[IncludeDirective],
    ) -> Result<Option<Record>, StoreError> {
        let Some(record) = self.fetch_one(model, id).await? else {
            return Ok(None);
        };
        let mut records = vec![record];
        self.load_includes(model, &mut records, include).await?;
        Ok(records.pop())
    }

    async fn find_and_count_all(&self, model: &ModelSchema, spec: &QuerySpec) -> Result<(Vec<Record>, u64), StoreError> {
        let (mut rows, total) = self.fetch_page(model, &spec.order, spec.limit, spec.offset).await?;
        self.load_includes(model, &mut rows, &spec.include).await?;
        Ok((rows, total))
    }

    /// Related record(s) of one record through `assoc`.
    async fn find_related(&self, record: &Record, assoc: &Association) -> Result<Related, StoreError> {
        let target = self
            .registry()
            .target(assoc)
            .ok_or_else(|| StoreError::UnknownModel(assoc.target.clone()))?;
        if assoc.kind.is_belongs_to() {
            return match record.get(&assoc.foreign_key).filter(|v| !v.is_null()) {
                Some(fk) => Ok(Related::One(self.fetch_one(target, fk).await?.map(Box::new))),
                None => Ok(Related::One(None)),
            };
        }
        let Some(id) = record.id() else {
            return Ok(empty_related(assoc));
        };
        let rows = self
            .fetch_where_in(target, &assoc.foreign_key, std::slice::from_ref(id))
            .await?;
        Ok(if assoc.is_multi() {
            Related::Many(rows)
        } else {
            Related::One(rows.into_iter().next().map(Box::new))
        })
    }

    /// Batch-load every directive (one query per directive and depth) and attach the
    /// results to `records` under the association name.
    async fn load_includes(
        &self,
        model: &ModelSchema,
        records: &mut [Record],
        include: &[IncludeDirective],
    ) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        for directive in include {
            let assoc = model
                .association(&directive.association)
                .ok_or_else(|| StoreError::UnknownAssociation {
                    model: model.name.clone(),
                    association: directive.association.clone(),
                })?;
            let target = self
                .registry()
                .model(&directive.model)
                .ok_or_else(|| StoreError::UnknownModel(directive.model.clone()))?;

            if assoc.kind.is_belongs_to() {
                let keys = distinct(records.iter().filter_map(|r| r.get(&assoc.foreign_key)));
                let mut parents = self.fetch_where_in(target, ID_ATTRIBUTE, &keys).await?;
                self.load_includes(target, &mut parents, &directive.include).await?;
                for record in records.iter_mut() {
                    let parent = record
                        .get(&assoc.foreign_key)
                        .and_then(|fk| parents.iter().find(|p| p.id() == Some(fk)))
                        .cloned()
                        .map(Box::new);
                    record.attach(assoc.name.clone(), Related::One(parent));
                }
            } else {
                let keys = distinct(records.iter().filter_map(|r| r.id()));
                let mut children = self.fetch_where_in(target, &assoc.foreign_key, &keys).await?;
                self.load_includes(target, &mut children, &directive.include).await?;
                for record in records.iter_mut() {
                    let own: Vec<Record> = match record.id() {
                        Some(id) => children
                            .iter()
                            .filter(|c| c.get(&assoc.foreign_key) == Some(id))
                            .cloned()
                            .collect(),
                        None => Vec::new(),
                    };
                    let related = if assoc.is_multi() {
                        Related::Many(own)
                    } else {
                        Related::One(own.into_iter().next().map(Box::new))
                    };
                    record.attach(assoc.name.clone(), related);
                }
            }
        }
        Ok(())
    }
}

fn empty_related(assoc: &Association) -> Related {
    if assoc.is_multi() {
        Related::Many(Vec::new())
    } else {
        Related::One(None)
    }
}

/// Non-null values, first occurrence kept.
fn distinct<'a>(values: impl Iterator<Item = &'a Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for v in values.filter(|v| !v.is_null()) {
        if !out.contains(v) {
            out.push(v.clone());
        }
    }
    out
}

/// Attribute whose column name appears in a constraint name such as `users_email_key`.
/// The longest match wins so `user_id` beats `id`.
pub(crate) fn attribute_in_constraint(model: &ModelSchema, constraint: &str) -> Option<String> {
    model
        .attributes
        .iter()
        .filter(|a| {
            let col = a.column.as_str();
            constraint.contains(&format!("_{}_", col)) || constraint.ends_with(&format!("_{}", col))
        })
        .max_by_key(|a| a.column.len())
        .map(|a| a.name.clone())
}
