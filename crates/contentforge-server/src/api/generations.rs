//! Gallery CRUD routes

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use contentforge_core::Error;
use contentforge_core::storage::{Generation, GenerationQuery, NewGeneration};
use serde::Serialize;
use tracing::info;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: String,
    pub deleted: bool,
}

pub async fn list_generations(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<GenerationQuery>, QueryRejection>,
) -> Result<Json<Vec<Generation>>, ApiError> {
    let Query(mut query) = query?;
    if query.limit.is_none() {
        query.limit = Some(state.list_limit);
    }

    let generations = state.store_for(&headers).list(&query).await?;
    Ok(Json(generations))
}

pub async fn create_generation(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewGeneration>, JsonRejection>,
) -> Result<(StatusCode, Json<Generation>), ApiError> {
    let Json(new) = payload?;
    let saved = state.store_for(&headers).insert(new).await?;

    info!(id = %saved.id, kind = %saved.kind, "Generation saved");
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn get_generation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Generation>, ApiError> {
    state
        .store_for(&headers)
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::GenerationNotFound(id).into())
}

pub async fn delete_generation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    if !state.store_for(&headers).delete(&id).await? {
        return Err(Error::GenerationNotFound(id).into());
    }

    info!(id = %id, "Generation deleted");
    Ok(Json(Deleted { id, deleted: true }))
}
