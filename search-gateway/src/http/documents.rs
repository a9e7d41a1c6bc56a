//! `/documents` handlers.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::config::settings::parse_flag;
use crate::http::error::{json_body, ApiError};
use crate::http::response::ApiResponse;
use crate::http::state::AppState;
use search_gateway_lifecycle::render_export;
use search_gateway_repository::SearchError;
use search_gateway_shared::{
    AddDocumentsRequest, ExportFormat, ExportRequest, ListDocumentsResponse, SearchRequest,
    SearchResponse, SuggestRequest, SuggestResponse, UpdateDocumentRequest,
};
use search_gateway_shared::search::DEFAULT_PAGE_SIZE;

/// Set on export responses cut short by the page ceiling or the deadline.
pub const EXPORT_PARTIAL_HEADER: &str = "x-export-partial";

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    page: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BulkParams {
    bulk: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    bulk: Option<String>,
    /// Seconds the scroll loop may run before returning a partial result.
    timeout_secs: Option<String>,
}

fn bulk_flag(value: Option<String>) -> Result<bool, ApiError> {
    parse_flag("bulk", value, false)
        .map_err(|e| SearchError::bad_request("invalid bulk flag").with_details(e.to_string()).into())
}

fn timeout(value: Option<String>) -> Result<Option<Duration>, ApiError> {
    value
        .map(|v| {
            v.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                ApiError::from(SearchError::bad_request("invalid export timeout").with_details(v))
            })
        })
        .transpose()
}

fn positive(value: Option<String>, default: usize, message: &str) -> Result<usize, ApiError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| SearchError::bad_request(message).with_details(v).into()),
    }
}

/// One page of documents, `?page=1&size=10` by default.
pub async fn list_documents(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<ApiResponse<ListDocumentsResponse>, ApiError> {
    let page = positive(params.page, 1, "invalid page number")?;
    let size = positive(params.size, DEFAULT_PAGE_SIZE, "invalid page size")?;

    let listing = state.documents.list(&alias, page, size).await?;
    Ok(ApiResponse::ok("success", listing))
}

pub async fn add_documents(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    payload: Result<Json<AddDocumentsRequest>, JsonRejection>,
) -> Result<ApiResponse<Value>, ApiError> {
    let request = json_body(payload)?;
    let added = state.transfer.add_documents(&alias, request.data).await?;

    Ok(ApiResponse::ok("data added successfully", json!({ "added": added })))
}

pub async fn search(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<ApiResponse<SearchResponse>, ApiError> {
    let request = json_body(payload)?;
    let result = state.documents.search(&alias, &request).await?;

    Ok(ApiResponse::ok("search successful", result))
}

pub async fn suggest(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    payload: Result<Json<SuggestRequest>, JsonRejection>,
) -> Result<ApiResponse<SuggestResponse>, ApiError> {
    let request = json_body(payload)?;
    let result = state.documents.suggest(&alias, &request).await?;

    Ok(ApiResponse::ok("suggestions retrieved successfully", result))
}

/// Download every matching document as a JSON array or an NDJSON bulk stream.
///
/// `?timeout_secs=` bounds the scroll loop; a cut-short export is still a 200
/// with [`EXPORT_PARTIAL_HEADER`] set.
pub async fn export(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    Query(params): Query<ExportParams>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: ExportRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ExportRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            SearchError::bad_request("invalid request payload").with_details(e.to_string())
        })?
    };
    let format = ExportFormat::from_flag(bulk_flag(params.bulk)?);
    let deadline = timeout(params.timeout_secs)?;

    let result = state
        .transfer
        .export(&alias, request.query.as_ref(), deadline)
        .await?;
    let content = render_export(&result.documents, format, &alias)?;

    let disposition = format!("attachment; filename={}", format.file_name());
    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response();

    if result.is_partial() {
        response
            .headers_mut()
            .insert(EXPORT_PARTIAL_HEADER, HeaderValue::from_static("true"));
    }

    Ok(response)
}

/// Import a JSON array or bulk stream from a multipart form.
///
/// Form fields: `index` (target alias, defaults to the path alias), `file` or
/// `json` (file wins), and `bulk` (falls back to the `?bulk=` query flag).
pub async fn import(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    Query(params): Query<BulkParams>,
    mut multipart: Multipart,
) -> Result<ApiResponse<Value>, ApiError> {
    let mut target = None;
    let mut file = None;
    let mut inline = None;
    let mut bulk = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        SearchError::bad_request("invalid multipart form").with_details(e.body_text())
    })? {
        let name = field.name().unwrap_or_default().to_string();
        let value = field.text().await.map_err(|e| {
            SearchError::bad_request("invalid multipart form").with_details(e.body_text())
        })?;

        match name.as_str() {
            "index" => target = Some(value).filter(|v| !v.trim().is_empty()),
            "file" => file = Some(value),
            "json" => inline = Some(value).filter(|v| !v.trim().is_empty()),
            "bulk" => bulk = Some(value),
            _ => {}
        }
    }

    let content = file
        .or(inline)
        .ok_or_else(|| SearchError::bad_request("no file or JSON content provided"))?;
    let bulk = bulk_flag(bulk)? || bulk_flag(params.bulk)?;
    let target = target.unwrap_or(alias);

    let imported = state.transfer.import(&target, &content, bulk).await?;

    info!(alias = %target, imported = imported, bulk = bulk, "Documents imported");
    Ok(ApiResponse::ok(
        "documents imported successfully",
        json!({ "imported": imported }),
    ))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path((alias, id)): Path<(String, String)>,
) -> Result<ApiResponse<Value>, ApiError> {
    let document = state.documents.get(&alias, &id).await?;
    Ok(ApiResponse::ok(
        "document fetched successfully",
        json!({ "document": document }),
    ))
}

pub async fn update_document(
    State(state): State<AppState>,
    Path((alias, id)): Path<(String, String)>,
    payload: Result<Json<UpdateDocumentRequest>, JsonRejection>,
) -> Result<ApiResponse<()>, ApiError> {
    let request = json_body(payload)?;
    state.documents.update(&alias, &id, request.data).await?;

    Ok(ApiResponse::message("document updated successfully"))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path((alias, id)): Path<(String, String)>,
) -> Result<ApiResponse<()>, ApiError> {
    state.documents.delete(&alias, &id).await?;
    Ok(ApiResponse::message("document deleted"))
}
