//! `/indices` handlers.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use crate::http::error::{json_body, ApiError};
use crate::http::response::ApiResponse;
use crate::http::state::AppState;
use search_gateway_repository::SearchError;
use search_gateway_shared::{IndexDefinition, UpdateIndexRequest};

pub async fn create_index(
    State(state): State<AppState>,
    payload: Result<Json<IndexDefinition>, JsonRejection>,
) -> Result<ApiResponse<()>, ApiError> {
    let definition = json_body(payload)?;
    state
        .migration
        .create(&definition.name, &definition.fields)
        .await?;

    Ok(ApiResponse::message("index created successfully"))
}

/// Update the schema of a logical index, creating it when unbound.
pub async fn update_index(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    payload: Result<Json<UpdateIndexRequest>, JsonRejection>,
) -> Result<ApiResponse<()>, ApiError> {
    let request = json_body(payload)?;
    let outcome = state.migration.update(&alias, &request.fields).await?;

    info!(alias = %alias, outcome = ?outcome, "Index schema applied");
    Ok(ApiResponse::message(outcome.message()))
}

pub async fn delete_index(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    state.migration.delete(&alias).await?;
    Ok(ApiResponse::message("alias deleted successfully"))
}

/// Every alias with the physical index it points at.
pub async fn list_indices(
    State(state): State<AppState>,
) -> Result<ApiResponse<BTreeMap<String, String>>, ApiError> {
    let bindings = state.resolver.bindings().await?;
    Ok(ApiResponse::ok("success", bindings))
}

pub async fn index_info(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> Result<ApiResponse<IndexDefinition>, ApiError> {
    let definition = state.resolver.describe(&alias).await?;
    Ok(ApiResponse::ok("index info retrieved successfully", definition))
}

pub async fn index_exists(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    if !state.resolver.exists(&alias).await? {
        return Err(SearchError::alias_not_found(&alias).into());
    }
    Ok(ApiResponse::ok("alias exists", json!({ "exists": true })))
}
