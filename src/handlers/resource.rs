// Generic REST handlers over any `CrudResource`.
//
// GET    /{resource}       -> list      (200)
// POST   /{resource}       -> create    (201)
// GET    /{resource}/:id   -> retrieve  (200)
// PUT    /{resource}/:id   -> update    (200, all required fields)
// PATCH  /{resource}/:id   -> update    (200, partial)
// DELETE /{resource}/:id   -> delete    (204)

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::validation::NON_FIELD_ERRORS;
use crate::models::{FieldErrors, Principal, UpdateMode};
use crate::services::CrudResource;

/// Mounts the collection and item routes for one resource
pub fn routes<R: CrudResource>(path: &str, resource: Arc<R>) -> Router {
    Router::new()
        .route(path, get(list::<R>).post(create::<R>))
        .route(
            &format!("{}/:id", path),
            get(retrieve::<R>)
                .put(replace::<R>)
                .patch(patch::<R>)
                .delete(delete::<R>),
        )
        .with_state(resource)
}

pub async fn list<R: CrudResource>(
    State(resource): State<Arc<R>>,
    Extension(principal): Extension<Principal>,
    filters: Result<Query<R::Filters>, QueryRejection>,
) -> ApiResult<Vec<R::Summary>> {
    let Query(filters) = filters.map_err(query_error)?;
    let rows = resource.list(&principal, filters).await?;
    Ok(ApiResponse::success(rows))
}

pub async fn retrieve<R: CrudResource>(
    State(resource): State<Arc<R>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<R::Detail> {
    let id = parse_id(resource.as_ref(), &id)?;
    Ok(ApiResponse::success(resource.retrieve(&principal, id).await?))
}

pub async fn create<R: CrudResource>(
    State(resource): State<Arc<R>>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<R::Detail> {
    let Json(payload) = payload.map_err(json_error)?;
    Ok(ApiResponse::created(resource.create(&principal, &payload).await?))
}

pub async fn replace<R: CrudResource>(
    State(resource): State<Arc<R>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<R::Detail> {
    update(resource.as_ref(), &principal, &id, payload, UpdateMode::Full).await
}

pub async fn patch<R: CrudResource>(
    State(resource): State<Arc<R>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<R::Detail> {
    update(resource.as_ref(), &principal, &id, payload, UpdateMode::Partial).await
}

pub async fn delete<R: CrudResource>(
    State(resource): State<Arc<R>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(resource.as_ref(), &id)?;
    resource.delete(&principal, id).await?;
    Ok(ApiResponse::no_content())
}

async fn update<R: CrudResource>(
    resource: &R,
    principal: &Principal,
    id: &str,
    payload: Result<Json<Value>, JsonRejection>,
    mode: UpdateMode,
) -> ApiResult<R::Detail> {
    let id = parse_id(resource, id)?;
    let Json(payload) = payload.map_err(json_error)?;
    Ok(ApiResponse::success(resource.update(principal, id, &payload, mode).await?))
}

/// Non-numeric ids cannot match any row, so they get the ordinary 404
fn parse_id<R: CrudResource>(resource: &R, raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::not_found(format!("{} not found", resource.label())))
}

fn json_error(rejection: JsonRejection) -> ApiError {
    ApiError::invalid_json(rejection.body_text())
}

fn query_error(rejection: QueryRejection) -> ApiError {
    FieldErrors::single(NON_FIELD_ERRORS, rejection.body_text()).into()
}
