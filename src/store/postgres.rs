//! PostgreSQL store. Tables are expected to exist; columns follow the schema's snake_case mapping.

use super::{attribute_in_constraint, ModelStore, StoreError};
use crate::config::{ModelSchema, Registry};
use crate::query::Direction;
use crate::record::Record;
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::error::ErrorKind;
use sqlx::postgres::{PgDatabaseError, PgPoolOptions, PgRow};
use sqlx::PgPool;
use std::sync::Arc;

pub struct PgStore {
    pool: PgPool,
    registry: Arc<Registry>,
}

impl PgStore {
    pub fn new(pool: PgPool, registry: Arc<Registry>) -> Self {
        PgStore { pool, registry }
    }

    pub async fn connect(database_url: &str, registry: Arc<Registry>) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(PgStore::new(pool, registry))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn query_many(&self, model: &ModelSchema, q: &QueryBuf) -> Result<Vec<Record>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from(p));
        }
        let rows = query.fetch_all(&self.pool).await.map_err(|e| classify(model, e))?;
        Ok(rows.iter().map(|r| Record::new(model.name.clone(), row_to_map(r))).collect())
    }

    async fn query_optional(&self, model: &ModelSchema, q: &QueryBuf) -> Result<Option<Record>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from(p));
        }
        let row = query.fetch_optional(&self.pool).await.map_err(|e| classify(model, e))?;
        Ok(row.map(|r| Record::new(model.name.clone(), row_to_map(&r))))
    }
}

#[async_trait]
impl ModelStore for PgStore {
    fn registry(&self) -> &Registry {
        &self.registry
    }

    async fn fetch_one(&self, model: &ModelSchema, id: &Value) -> Result<Option<Record>, StoreError> {
        self.query_optional(model, &sql::select_by_id(model, id)).await
    }

    async fn fetch_page(
        &self,
        model: &ModelSchema,
        order: &[(String, Direction)],
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Record>, u64), StoreError> {
        let rows = self.query_many(model, &sql::select_page(model, order, limit, offset)).await?;
        let count = sql::count_all(model);
        tracing::debug!(sql = %count.sql, "query");
        let total: i64 = sqlx::query_scalar(&count.sql).fetch_one(&self.pool).await?;
        Ok((rows, u64::try_from(total).unwrap_or(0)))
    }

    async fn fetch_where_in(&self, model: &ModelSchema, attribute: &str, values: &[Value]) -> Result<Vec<Record>, StoreError> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        self.query_many(model, &sql::select_by_attribute_in(model, attribute, values)).await
    }

    async fn insert(&self, model: &ModelSchema, values: Map<String, Value>) -> Result<Record, StoreError> {
        self.query_optional(model, &sql::insert(model, &values))
            .await?
            .ok_or(StoreError::Db(sqlx::Error::RowNotFound))
    }

    async fn update_by_id(&self, model: &ModelSchema, id: &Value, values: Map<String, Value>) -> Result<Option<Record>, StoreError> {
        self.query_optional(model, &sql::update(model, id, &values)).await
    }

    async fn delete_by_id(&self, model: &ModelSchema, id: &Value) -> Result<bool, StoreError> {
        Ok(self.query_optional(model, &sql::delete(model, id)).await?.is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Classify constraint failures by SQLSTATE class, naming the attribute where the
/// server reports a column or a constraint that contains one.
fn classify(model: &ModelSchema, err: sqlx::Error) -> StoreError {
    let details = match &err {
        sqlx::Error::Database(db) => {
            let pg = db.try_downcast_ref::<PgDatabaseError>();
            // A delete blocked by rows of another table reports that table.
            let other_table = pg.and_then(|e| e.table()).is_some_and(|t| t != model.table_name);
            let column = pg
                .and_then(|e| e.column())
                .and_then(|c| model.attributes.iter().find(|a| a.column == c))
                .map(|a| a.name.clone());
            let constraint = db.constraint().map(str::to_string);
            let attribute = if other_table {
                None
            } else {
                column.or_else(|| constraint.as_deref().and_then(|c| attribute_in_constraint(model, c)))
            };
            Some((db.kind(), attribute, constraint))
        }
        _ => None,
    };
    let Some((kind, attribute, constraint)) = details else {
        return StoreError::Db(err);
    };
    match kind {
        ErrorKind::UniqueViolation => StoreError::UniqueViolation { attribute },
        ErrorKind::NotNullViolation => StoreError::NotNullViolation { attribute },
        ErrorKind::ForeignKeyViolation => StoreError::ForeignKeyViolation { attribute },
        ErrorKind::CheckViolation => StoreError::CheckViolation { constraint },
        _ => StoreError::Db(err),
    }
}

fn row_to_map(row: &PgRow) -> Map<String, Value> {
    use sqlx::{Column, Row};
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

/// Decode a cell by trying the supported column types in turn.
fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::from(n);
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::from(n);
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::from(n);
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(f64::from(n)) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
