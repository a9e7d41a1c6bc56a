//! HTTP surface.
//!
//! All routes live under the configured base path:
//!
//! - `GET /` greeting, `GET /health` engine health
//! - `/indices`: create, update, delete, list, info, exists
//! - `/documents/:alias`: list, add, search, suggest, export, import, and
//!   get/update/delete by id

pub mod documents;
pub mod error;
pub mod indices;
pub mod middleware;
pub mod response;
pub mod state;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post, put};
use axum::{middleware as axum_middleware, Json, Router};
use serde_json::{json, Value};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use error::ApiError;
use middleware::{cors_layer, request_span, require_bearer, TokenVerifier};
use response::ApiResponse;
use search_gateway_repository::SearchError;

pub use state::AppState;

/// Upper bound on import uploads.
const IMPORT_BODY_LIMIT: usize = 64 * 1024 * 1024;

async fn greeting() -> Json<&'static str> {
    Json("Hello, World!")
}

async fn health(State(state): State<AppState>) -> Result<ApiResponse<Value>, ApiError> {
    if !state.engine.health_check().await? {
        return Err(SearchError::server("search engine is unhealthy").into());
    }
    Ok(ApiResponse::ok("success", json!({ "status": "ok" })))
}

fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(greeting))
        .route("/health", get(health))
        .route(
            "/indices",
            get(indices::list_indices).post(indices::create_index),
        )
        .route(
            "/indices/",
            get(indices::list_indices).post(indices::create_index),
        )
        .route(
            "/indices/:alias",
            put(indices::update_index).delete(indices::delete_index),
        )
        .route("/indices/:alias/info", get(indices::index_info))
        .route("/indices/:alias/exists", get(indices::index_exists))
        .route("/documents/:alias", get(documents::list_documents))
        .route("/documents/:alias/add", post(documents::add_documents))
        .route("/documents/:alias/search", post(documents::search))
        .route("/documents/:alias/suggest", post(documents::suggest))
        .route("/documents/:alias/export", post(documents::export))
        .route(
            "/documents/:alias/import",
            post(documents::import).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        .route(
            "/documents/:alias/:id",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::delete_document),
        )
        .with_state(state)
}

/// Build the application router with its middleware stack.
pub fn router(state: AppState, settings: &Settings) -> Router {
    let mut routes = api_routes(state);

    if let Some(secret) = &settings.api_secret {
        let verifier = Arc::new(TokenVerifier::new(secret));
        routes = routes.layer(axum_middleware::from_fn_with_state(verifier, require_bearer));
    }
    if settings.detail_error {
        routes = routes.layer(axum_middleware::from_fn(error::detailed_errors));
    }

    let app = if settings.base_path.is_empty() {
        routes
    } else {
        Router::new().nest(&settings.base_path, routes)
    };

    let app = if settings.cors.enabled {
        app.layer(cors_layer(&settings.cors))
    } else {
        app
    };

    app.layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use search_gateway_lifecycle::testing::MemoryEngine;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    fn app_with(engine: Arc<MemoryEngine>, vars: &[(&str, &str)]) -> Router {
        let settings = settings(vars);
        router(AppState::new(engine, settings.transfer.clone()), &settings)
    }

    fn app(engine: Arc<MemoryEngine>) -> Router {
        app_with(engine, &[])
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    fn product_index() -> Value {
        json!({
            "index": "products",
            "fields": {
                "name": { "type": "text", "autocomplete": true, "search": true },
                "price": { "type": "float" }
            }
        })
    }

    #[tokio::test]
    async fn test_greeting_under_base_path() {
        let response = app(Arc::new(MemoryEngine::new()))
            .oneshot(empty_request("GET", "/v1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!("Hello, World!"));
    }

    #[tokio::test]
    async fn test_index_lifecycle() {
        let engine = Arc::new(MemoryEngine::new());
        let app = app(engine.clone());

        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/indices/", product_index()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "index created successfully");

        let physical = engine.alias_target("products").await.unwrap();
        assert!(physical.starts_with("products_"));
        assert_eq!(physical.len(), "products_".len() + 14);

        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/indices", product_index()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["type"], "resource_already_exists_exception");
        assert!(body.get("details").is_none());

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/v1/indices/products/info"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"]["index"], "products");
        assert_eq!(body["data"]["fields"]["name"]["autocomplete"], true);
        assert_eq!(body["data"]["fields"]["price"]["type"], "float");

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/v1/indices/"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["data"]["products"], json!(physical));

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/v1/indices/products/exists"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["data"]["exists"], true);

        let response = app
            .clone()
            .oneshot(empty_request("DELETE", "/v1/indices/products"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["message"], "alias deleted successfully");

        let response = app
            .oneshot(empty_request("GET", "/v1/indices/products/exists"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_index_reports_reindex() {
        let engine = Arc::new(MemoryEngine::new());
        engine.seed("products", "products_1", 2).await;

        let response = app(engine.clone())
            .oneshot(json_request(
                "PUT",
                "/v1/indices/products",
                json!({ "fields": { "name": { "type": "text" }, "rank": { "type": "keyword" } } }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["message"],
            "index updated successfully (re-indexed)"
        );
        let physical = engine.alias_target("products").await.unwrap();
        assert_ne!(physical, "products_1");
        assert_eq!(engine.documents(&physical).await.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let response = app(Arc::new(MemoryEngine::new()))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/indices/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["type"], "bad_request");
        assert_eq!(body["message"], "invalid request payload");
    }

    #[tokio::test]
    async fn test_documents_crud() {
        let engine = Arc::new(MemoryEngine::new());
        engine.seed("products", "products_1", 0).await;
        let app = app(engine.clone());

        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/documents/products/add", json!({ "data": [] })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "data array cannot be empty");

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/v1/documents/products/add",
                json!({ "data": [{ "name": "Product A", "price": 10.0 }, { "name": "Product B", "price": 20.0 }] }),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["message"], "data added successfully");

        let (id, _) = engine.documents("products_1").await.remove(0);

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/v1/documents/products/{}", id),
                json!({ "data": { "price": 12.5 } }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(empty_request("GET", &format!("/v1/documents/products/{}", id)))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["message"], "document fetched successfully");
        assert_eq!(body["data"]["document"]["name"], "Product A");
        assert_eq!(body["data"]["document"]["price"], 12.5);

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/v1/documents/products?page=1&size=1"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"]["total"], 2);
        assert_eq!(body["data"]["documents"].as_array().unwrap().len(), 1);

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/v1/documents/products?page=abc"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(empty_request("DELETE", &format!("/v1/documents/products/{}", id)))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["message"], "document deleted");

        let response = app
            .oneshot(empty_request("GET", &format!("/v1/documents/products/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_alias_is_not_found() {
        let response = app(Arc::new(MemoryEngine::new()))
            .oneshot(empty_request("GET", "/v1/documents/missing/doc-1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["type"], "not_found");
    }

    #[tokio::test]
    async fn test_search_without_query_is_bad_request() {
        let engine = Arc::new(MemoryEngine::new());
        engine.seed("products", "products_1", 1).await;

        let response = app(engine)
            .oneshot(json_request("POST", "/v1/documents/products/search", json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "no valid query provided");
    }

    #[tokio::test]
    async fn test_export_bulk_stream() {
        let engine = Arc::new(MemoryEngine::new());
        engine.seed("products", "products_1", 3).await;

        let response = app(engine)
            .oneshot(empty_request("POST", "/v1/documents/products/export?bulk=true"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/x-ndjson"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=export.ndjson"
        );
        assert!(response.headers().get(documents::EXPORT_PARTIAL_HEADER).is_none());

        let text = body_text(response).await;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], r#"{"index":{"_index":"products"}}"#);
    }

    #[tokio::test]
    async fn test_export_partial_header() {
        let engine = Arc::new(MemoryEngine::new());
        engine.seed("products", "products_1", 10).await;
        let app = app_with(
            engine,
            &[("EXPORT_PAGE_SIZE", "2"), ("EXPORT_MAX_PAGES", "2")],
        );

        let response = app
            .oneshot(empty_request("POST", "/v1/documents/products/export"))
            .await
            .unwrap();

        assert_eq!(response.headers()[documents::EXPORT_PARTIAL_HEADER], "true");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_export_caller_timeout_returns_first_page() {
        let engine = Arc::new(MemoryEngine::new());
        engine.seed("products", "products_1", 10).await;
        let app = app_with(engine.clone(), &[("EXPORT_PAGE_SIZE", "3")]);

        let response = app
            .clone()
            .oneshot(empty_request(
                "POST",
                "/v1/documents/products/export?timeout_secs=0",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[documents::EXPORT_PARTIAL_HEADER], "true");
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body.as_array().unwrap().len(), 3);
        assert_eq!(engine.open_scrolls().await, 0);

        let response = app
            .oneshot(empty_request(
                "POST",
                "/v1/documents/products/export?timeout_secs=soon",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "invalid export timeout");
    }

    #[tokio::test]
    async fn test_import_multipart_bulk() {
        let engine = Arc::new(MemoryEngine::new());
        engine.seed("copy", "copy_1", 0).await;

        let stream = "{\"index\":{\"_index\":\"products\"}}\n{\"name\":\"A\"}\n{\"index\":{}}\n{\"name\":\"B\"}\n";
        let boundary = "gateway-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"index\"\r\n\r\ncopy\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"bulk\"\r\n\r\ntrue\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"export.ndjson\"\r\n\
             Content-Type: application/x-ndjson\r\n\r\n{s}\r\n--{b}--\r\n",
            b = boundary,
            s = stream
        );

        let response = app(engine.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/documents/ignored/import")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={}", boundary),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "documents imported successfully");
        assert_eq!(body["data"]["imported"], 2);
        assert_eq!(engine.documents("copy_1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_import_without_content() {
        let engine = Arc::new(MemoryEngine::new());
        engine.seed("products", "products_1", 0).await;
        let boundary = "gateway-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"bulk\"\r\n\r\nfalse\r\n--{b}--\r\n",
            b = boundary
        );

        let response = app(engine)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/documents/products/import")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={}", boundary),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["message"],
            "no file or JSON content provided"
        );
    }

    #[tokio::test]
    async fn test_auth_required_when_secret_set() {
        let app = app_with(Arc::new(MemoryEngine::new()), &[("API_SECRET", "s3cret")]);

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/v1/indices/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["type"], "unauthorized");
        assert_eq!(body["message"], "Authorization token required");

        let token = encode(
            &Header::default(),
            &json!({ "sub": "gateway-tests" }),
            &EncodingKey::from_secret(b"s3cret"),
        )
        .unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/indices/")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_detail_error_mode_includes_details() {
        let engine = Arc::new(MemoryEngine::new());
        let app = app_with(engine, &[("DETAIL_ERROR", "true")]);

        let response = app
            .oneshot(empty_request("GET", "/v1/documents/missing/doc-1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["message"], "alias not found");
        assert_eq!(body["details"], "alias missing is not bound");
    }

    #[tokio::test]
    async fn test_request_id_is_echoed_or_generated() {
        let app = app(Arc::new(MemoryEngine::new()));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/v1")
                    .header("x-request-id", "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-123");

        let response = app.oneshot(empty_request("GET", "/v1")).await.unwrap();
        let generated = response.headers()["x-request-id"].to_str().unwrap();
        assert_eq!(generated.len(), 36);
    }

    #[tokio::test]
    async fn test_root_base_path() {
        let response = app_with(Arc::new(MemoryEngine::new()), &[("BASE_PATH", "/")])
            .oneshot(empty_request("GET", "/health"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["status"], "ok");
    }
}
