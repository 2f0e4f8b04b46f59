//! Resource handlers: collection, single resource, related resources and relationship linkage.

use crate::config::{Association, ModelSchema, TypedModel};
use crate::error::{translate_store_error, ApiError, AppError};
use crate::extractors::JsonApiBody;
use crate::query::{validate_include, GetListRequest};
use crate::record::Related;
use crate::response::JsonApi;
use crate::serializer::ListContext;
use crate::service::{parse_create, parse_update};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, RawQuery, State},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::collections::HashMap;

fn model_for<'a>(state: &'a AppState, type_: &str) -> Result<&'a ModelSchema, AppError> {
    state
        .registry
        .model_by_type(type_)
        .ok_or_else(|| ApiError::not_found(format!("there is no resource type \"{}\"", type_)).into())
}

/// Path ids that cannot be an id of this model cannot exist either.
fn parse_id(model: &ModelSchema, id: &str) -> Result<Value, AppError> {
    model.pk_type.parse_id(id).ok_or_else(|| missing(model, id))
}

fn missing(model: &ModelSchema, id: &str) -> AppError {
    ApiError::not_found(format!("no {} with id {}", model.get_type(), id)).into()
}

fn association_for<'a>(model: &'a ModelSchema, segment: &str) -> Result<&'a Association, AppError> {
    model.association_by_segment(segment).ok_or_else(|| {
        ApiError::not_found(format!("{} has no relationship \"{}\"", model.get_type(), segment)).into()
    })
}

/// GET /:type
pub async fn list(
    State(state): State<AppState>,
    Path(type_): Path<String>,
    RawQuery(raw): RawQuery,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let model = model_for(&state, &type_)?;
    let spec = GetListRequest::new(&params, model).validate(&state.registry)?;
    let (rows, total) = state
        .store
        .find_and_count_all(model, &spec)
        .await
        .map_err(|e| translate_store_error(model, e))?;
    let doc = state.serializer.list(
        &rows,
        model,
        ListContext {
            offset: spec.offset,
            limit: spec.limit,
            total,
            query: raw.as_deref(),
        },
    );
    Ok(JsonApi::ok(doc).into_response())
}

/// POST /:type
pub async fn create(
    State(state): State<AppState>,
    Path(type_): Path<String>,
    JsonApiBody(body): JsonApiBody,
) -> Result<Response, AppError> {
    let model = model_for(&state, &type_)?;
    let values = parse_create(&body, model, &state.registry)?;
    let record = state
        .store
        .insert(model, values)
        .await
        .map_err(|e| translate_store_error(model, e))?;
    tracing::info!(type_ = %type_, id = %record.id_string(), "resource created");
    let location = state.serializer.resource_url(model, &record.id_string());
    Ok(JsonApi::created(state.serializer.single(&record, model), location).into_response())
}

/// GET /:type/:id
pub async fn read(
    State(state): State<AppState>,
    Path((type_, id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let model = model_for(&state, &type_)?;
    let id_value = parse_id(model, &id)?;
    let include = validate_include(&params, model, &state.registry)?;
    let record = state
        .store
        .find_by_id(model, &id_value, &include)
        .await
        .map_err(|e| translate_store_error(model, e))?
        .ok_or_else(|| missing(model, &id))?;
    Ok(JsonApi::ok(state.serializer.single(&record, model)).into_response())
}

/// PATCH /:type/:id
pub async fn update(
    State(state): State<AppState>,
    Path((type_, id)): Path<(String, String)>,
    JsonApiBody(body): JsonApiBody,
) -> Result<Response, AppError> {
    let model = model_for(&state, &type_)?;
    let id_value = parse_id(model, &id)?;
    let values = parse_update(&body, model, &state.registry, &id)?;
    let record = state
        .store
        .update_by_id(model, &id_value, values)
        .await
        .map_err(|e| translate_store_error(model, e))?
        .ok_or_else(|| missing(model, &id))?;
    Ok(JsonApi::ok(state.serializer.single(&record, model)).into_response())
}

/// DELETE /:type/:id
pub async fn delete(
    State(state): State<AppState>,
    Path((type_, id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let model = model_for(&state, &type_)?;
    let id_value = parse_id(model, &id)?;
    let deleted = state
        .store
        .delete_by_id(model, &id_value)
        .await
        .map_err(|e| translate_store_error(model, e))?;
    if !deleted {
        return Err(missing(model, &id));
    }
    tracing::info!(type_ = %type_, id = %id, "resource deleted");
    Ok(JsonApi::no_content().into_response())
}

/// Parent model, relationship and what it points to. `include` applies to the related records.
async fn load_related<'a>(
    state: &'a AppState,
    type_: &str,
    id: &str,
    relationship: &str,
    params: Option<&HashMap<String, String>>,
) -> Result<(&'a ModelSchema, &'a Association, Related), AppError> {
    let model = model_for(state, type_)?;
    let assoc = association_for(model, relationship)?;
    let id_value = parse_id(model, id)?;
    let target = state
        .registry
        .target(assoc)
        .ok_or_else(|| AppError::from(ApiError::InternalServerError))?;
    let include = match params {
        Some(params) => validate_include(params, target, &state.registry)?,
        None => Vec::new(),
    };
    let parent = state
        .store
        .fetch_one(model, &id_value)
        .await
        .map_err(|e| translate_store_error(model, e))?
        .ok_or_else(|| missing(model, id))?;
    let mut related = state
        .store
        .find_related(&parent, assoc)
        .await
        .map_err(|e| translate_store_error(target, e))?;
    if !include.is_empty() {
        let mut rows: Vec<_> = related.records().into_iter().cloned().collect();
        state
            .store
            .load_includes(target, &mut rows, &include)
            .await
            .map_err(|e| translate_store_error(target, e))?;
        related = match related {
            Related::Many(_) => Related::Many(rows),
            Related::One(_) => Related::One(rows.into_iter().next().map(Box::new)),
        };
    }
    Ok((model, assoc, related))
}

/// GET /:type/:id/:relationship
pub async fn related(
    State(state): State<AppState>,
    Path((type_, id, relationship)): Path<(String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let (model, assoc, related) = load_related(&state, &type_, &id, &relationship, Some(&params)).await?;
    let resp = match related {
        Related::One(record) => {
            JsonApi::ok(state.serializer.related_one(model, &id, assoc, record.as_deref())).into_response()
        }
        Related::Many(records) => {
            JsonApi::ok(state.serializer.related_many(model, &id, assoc, &records)).into_response()
        }
    };
    Ok(resp)
}

/// GET /:type/:id/relationships/:relationship
pub async fn relationship(
    State(state): State<AppState>,
    Path((type_, id, relationship)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let (model, assoc, related) = load_related(&state, &type_, &id, &relationship, None).await?;
    let resp = match related {
        Related::One(record) => {
            JsonApi::ok(state.serializer.relationship_one(model, &id, assoc, record.as_deref())).into_response()
        }
        Related::Many(records) => {
            JsonApi::ok(state.serializer.relationship_many(model, &id, assoc, &records)).into_response()
        }
    };
    Ok(resp)
}

/// Any unmatched route.
pub async fn not_found(uri: axum::http::Uri) -> AppError {
    ApiError::not_found(format!("no route matches {}", uri.path())).into()
}
