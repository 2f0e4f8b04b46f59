//! In-process store. Used by the example server without a database and by the tests.

use super::{ModelStore, StoreError};
use crate::config::{ModelSchema, PkType, Registry, ID_ATTRIBUTE};
use crate::query::Direction;
use crate::record::Record;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Map<String, Value>>,
    next_id: i64,
}

/// Tables keyed by model name, all behind one lock so constraint checks see a consistent view.
pub struct MemoryStore {
    registry: Arc<Registry>,
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new(registry: Arc<Registry>) -> Self {
        MemoryStore {
            registry,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Number of rows currently stored for `model`.
    pub async fn count(&self, model: &str) -> usize {
        self.tables.read().await.get(model).map(|t| t.rows.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ModelStore for MemoryStore {
    fn registry(&self) -> &Registry {
        &self.registry
    }

    async fn fetch_one(&self, model: &ModelSchema, id: &Value) -> Result<Option<Record>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&model.name)
            .and_then(|t| t.rows.iter().find(|row| row.get(ID_ATTRIBUTE) == Some(id)))
            .map(|row| Record::new(model.name.clone(), row.clone())))
    }

    async fn fetch_page(
        &self,
        model: &ModelSchema,
        order: &[(String, Direction)],
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Record>, u64), StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&Map<String, Value>> = tables.get(&model.name).map(|t| t.rows.iter().collect()).unwrap_or_default();
        rows.sort_by(|a, b| compare_rows(a, b, order));
        let total = rows.len() as u64;
        let page = rows
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|row| Record::new(model.name.clone(), row.clone()))
            .collect();
        Ok((page, total))
    }

    async fn fetch_where_in(&self, model: &ModelSchema, attribute: &str, values: &[Value]) -> Result<Vec<Record>, StoreError> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let tables = self.tables.read().await;
        let mut rows: Vec<&Map<String, Value>> = tables
            .get(&model.name)
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|row| row.get(attribute).map(|v| values.contains(v)).unwrap_or(false))
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by(|a, b| compare_rows(a, b, &[]));
        Ok(rows
            .into_iter()
            .map(|row| Record::new(model.name.clone(), row.clone()))
            .collect())
    }

    async fn insert(&self, model: &ModelSchema, values: Map<String, Value>) -> Result<Record, StoreError> {
        let mut tables = self.tables.write().await;

        let mut row = Map::new();
        for attr in &model.attributes {
            let value = match values.get(&attr.name) {
                Some(v) => v.clone(),
                None => attr.default.as_ref().map(|d| d.evaluate()).unwrap_or(Value::Null),
            };
            row.insert(attr.name.clone(), value);
        }
        if row.get(ID_ATTRIBUTE).map(Value::is_null).unwrap_or(true) {
            let table = tables.entry(model.name.clone()).or_default();
            table.next_id += 1;
            let id = match model.pk_type {
                PkType::Int | PkType::BigInt => Value::from(table.next_id),
                PkType::Uuid => Value::String(uuid::Uuid::new_v4().to_string()),
                PkType::Text => Value::String(table.next_id.to_string()),
            };
            row.insert(ID_ATTRIBUTE.to_string(), id);
        }

        check_constraints(&self.registry, &tables, model, &row, None)?;
        tables.entry(model.name.clone()).or_default().rows.push(row.clone());
        tracing::debug!(model = %model.name, id = ?row.get(ID_ATTRIBUTE), "inserted");
        Ok(Record::new(model.name.clone(), row))
    }

    async fn update_by_id(&self, model: &ModelSchema, id: &Value, values: Map<String, Value>) -> Result<Option<Record>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(index) = tables
            .get(&model.name)
            .and_then(|t| t.rows.iter().position(|row| row.get(ID_ATTRIBUTE) == Some(id)))
        else {
            return Ok(None);
        };

        let mut row = tables
            .get(&model.name)
            .map(|t| t.rows[index].clone())
            .unwrap_or_default();
        for (name, value) in values {
            if name != ID_ATTRIBUTE && model.has_attribute(&name) {
                row.insert(name, value);
            }
        }

        check_constraints(&self.registry, &tables, model, &row, Some(index))?;
        if let Some(table) = tables.get_mut(&model.name) {
            table.rows[index] = row.clone();
        }
        Ok(Some(Record::new(model.name.clone(), row)))
    }

    async fn delete_by_id(&self, model: &ModelSchema, id: &Value) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        check_not_referenced(&self.registry, &tables, model, id)?;
        let Some(table) = tables.get_mut(&model.name) else {
            return Ok(false);
        };
        let before = table.rows.len();
        table.rows.retain(|row| row.get(ID_ATTRIBUTE) != Some(id));
        Ok(table.rows.len() < before)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Not-null, unique and belongs_to foreign key checks for `row`; `skip` is the row's own index on update.
fn check_constraints(
    registry: &Registry,
    tables: &HashMap<String, Table>,
    model: &ModelSchema,
    row: &Map<String, Value>,
    skip: Option<usize>,
) -> Result<(), StoreError> {
    let existing = tables.get(&model.name).map(|t| t.rows.as_slice()).unwrap_or(&[]);
    for attr in &model.attributes {
        let value = row.get(&attr.name).unwrap_or(&Value::Null);
        if value.is_null() {
            if !attr.nullable {
                return Err(StoreError::NotNullViolation {
                    attribute: Some(attr.name.clone()),
                });
            }
            continue;
        }
        if attr.unique {
            let taken = existing
                .iter()
                .enumerate()
                .any(|(i, other)| Some(i) != skip && other.get(&attr.name) == Some(value));
            if taken {
                return Err(StoreError::UniqueViolation {
                    attribute: Some(attr.name.clone()),
                });
            }
        }
    }

    for assoc in model.associations.iter().filter(|a| a.kind.is_belongs_to()) {
        let Some(fk) = row.get(&assoc.foreign_key).filter(|v| !v.is_null()) else {
            continue;
        };
        let target = registry
            .target(assoc)
            .ok_or_else(|| StoreError::UnknownModel(assoc.target.clone()))?;
        let exists = tables
            .get(&target.name)
            .map(|t| t.rows.iter().any(|r| r.get(ID_ATTRIBUTE) == Some(fk)))
            .unwrap_or(false);
        if !exists {
            return Err(StoreError::ForeignKeyViolation {
                attribute: Some(assoc.foreign_key.clone()),
            });
        }
    }
    Ok(())
}

/// Rows of other models still pointing at `id` through a belongs_to key block its deletion.
fn check_not_referenced(
    registry: &Registry,
    tables: &HashMap<String, Table>,
    model: &ModelSchema,
    id: &Value,
) -> Result<(), StoreError> {
    for source in registry.models() {
        let Some(rows) = tables.get(&source.name).map(|t| &t.rows) else {
            continue;
        };
        for assoc in source
            .associations
            .iter()
            .filter(|a| a.kind.is_belongs_to() && a.target == model.name)
        {
            if rows.iter().any(|row| row.get(&assoc.foreign_key) == Some(id)) {
                tracing::debug!(model = %model.name, referenced_by = %source.name, "delete blocked");
                return Err(StoreError::ForeignKeyViolation { attribute: None });
            }
        }
    }
    Ok(())
}

fn compare_rows(a: &Map<String, Value>, b: &Map<String, Value>, order: &[(String, Direction)]) -> Ordering {
    let by_id = [(ID_ATTRIBUTE.to_string(), Direction::Asc)];
    let order = if order.is_empty() { &by_id[..] } else { order };
    for (attr, direction) in order {
        let ord = compare_values(a.get(attr).unwrap_or(&Value::Null), b.get(attr).unwrap_or(&Value::Null));
        let ord = match direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Nulls sort last, as in PostgreSQL's default ascending order.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}
