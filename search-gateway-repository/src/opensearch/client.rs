//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngine`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    cat::{CatAliasesParts, CatIndicesParts},
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{
        IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesGetAliasParts,
        IndicesGetParts, IndicesPutMappingParts,
    },
    BulkParts, ClearScrollParts, DeleteParts, GetParts, OpenSearch, ScrollParts, SearchParts,
    UpdateParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::config::EngineConfig;
use crate::errors::{classify_engine_error, SearchError};
use crate::interfaces::SearchEngine;
use crate::types::{AliasAction, AliasBinding};

/// OpenSearch-backed search engine.
///
/// # Example
///
/// ```ignore
/// use search_gateway_repository::{EngineConfig, OpenSearchEngine, SearchEngine};
///
/// let engine = OpenSearchEngine::new(&EngineConfig::new("http://localhost:9200")).await?;
/// let physical = engine.get_alias("products").await?;
/// ```
pub struct OpenSearchEngine {
    client: OpenSearch,
}

impl OpenSearchEngine {
    /// Create a new engine client connected to the configured URL.
    ///
    /// # Arguments
    ///
    /// * `config` - URL and optional basic-auth credentials
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchEngine)` - A new client instance
    /// * `Err(SearchError)` - If the URL is invalid or the transport cannot be built
    pub async fn new(config: &EngineConfig) -> Result<Self, SearchError> {
        let parsed_url =
            Url::parse(&config.url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();
        if let Some((username, password)) = config.credentials() {
            builder = builder.auth(Credentials::Basic(
                username.to_string(),
                password.to_string(),
            ));
        }
        let transport = builder
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        info!(
            url = %config.url,
            authenticated = config.credentials().is_some(),
            "Created OpenSearch client"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }

    /// Pass successful responses through, classify everything else.
    async fn ensure_success(
        response: Response,
        default_message: &str,
    ) -> Result<Response, SearchError> {
        let status = response.status_code();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %error_body, "{}", default_message);
        Err(classify_engine_error(
            status.as_u16(),
            &error_body,
            default_message,
        ))
    }

    /// Like `ensure_success`, but a 404 without an engine error body is `not_found`.
    async fn ensure_found(
        response: Response,
        default_message: &str,
        missing_message: &str,
    ) -> Result<Response, SearchError> {
        if response.status_code().as_u16() != 404 {
            return Self::ensure_success(response, default_message).await;
        }

        let body = response.text().await.unwrap_or_default();
        let has_engine_error = serde_json::from_str::<Value>(&body)
            .map(|v| v.get("error").is_some())
            .unwrap_or(false);

        if has_engine_error {
            Err(classify_engine_error(404, &body, default_message))
        } else {
            Err(SearchError::not_found(missing_message).with_details(body))
        }
    }

    async fn decode(response: Response) -> Result<Value, SearchError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| SearchError::decode(e.to_string()))
    }

    /// First key of a get-alias response: the physical index behind the alias.
    fn alias_target(response: &Value) -> Option<String> {
        response.as_object()?.keys().next().cloned()
    }

    /// Number of failed items in a bulk response.
    fn count_bulk_failures(response: &Value) -> (usize, usize) {
        let items = response["items"].as_array();
        let total = items.map(Vec::len).unwrap_or_default();
        let failed = items
            .map(|items| {
                items
                    .iter()
                    .filter(|item| {
                        item.as_object()
                            .and_then(|actions| actions.values().next())
                            .and_then(|result| result.get("error"))
                            .is_some()
                    })
                    .count()
            })
            .unwrap_or_default();
        (failed, total)
    }
}

#[async_trait]
impl SearchEngine for OpenSearchEngine {
    #[instrument(skip(self, body))]
    async fn create_index(&self, index: &str, body: Value) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        Self::ensure_success(response, "failed to create index").await?;
        debug!(index = %index, "Index created");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_index(&self, index: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        Self::ensure_success(response, "failed to delete index").await?;
        debug!(index = %index, "Index deleted");
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            _ => Self::ensure_success(response, "failed to check for index")
                .await
                .map(|_| true),
        }
    }

    async fn get_index(&self, index: &str) -> Result<Value, SearchError> {
        let response = self
            .client
            .indices()
            .get(IndicesGetParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let response = Self::ensure_success(response, "failed to get index info").await?;
        Self::decode(response).await
    }

    async fn get_alias(&self, alias: &str) -> Result<Option<String>, SearchError> {
        let response = self
            .client
            .indices()
            .get_alias(IndicesGetAliasParts::Name(&[alias]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }

        let response = Self::ensure_success(response, "failed to resolve alias").await?;
        let body = Self::decode(response).await?;
        Ok(Self::alias_target(&body))
    }

    async fn list_indices(&self) -> Result<Vec<String>, SearchError> {
        let response = self
            .client
            .cat()
            .indices(CatIndicesParts::None)
            .format("json")
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let response = Self::ensure_success(response, "failed to list indices").await?;
        let rows = Self::decode(response).await?;

        let rows = rows
            .as_array()
            .ok_or_else(|| SearchError::parse("cat indices response is not an array"))?;

        Ok(rows
            .iter()
            .filter_map(|row| row["index"].as_str().map(str::to_string))
            .collect())
    }

    async fn list_aliases(&self) -> Result<Vec<AliasBinding>, SearchError> {
        let response = self
            .client
            .cat()
            .aliases(CatAliasesParts::None)
            .format("json")
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let response = Self::ensure_success(response, "failed to list aliases").await?;
        let rows = Self::decode(response).await?;

        let rows = rows
            .as_array()
            .ok_or_else(|| SearchError::parse("cat aliases response is not an array"))?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(AliasBinding {
                    alias: row["alias"].as_str()?.to_string(),
                    index: row["index"].as_str()?.to_string(),
                })
            })
            .collect())
    }

    #[instrument(skip(self, properties))]
    async fn put_mapping(&self, index: &str, properties: Value) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(json!({ "properties": properties }))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        Self::ensure_success(response, "failed to update index mappings").await?;
        Ok(())
    }

    #[instrument(skip(self), fields(action_count = actions.len()))]
    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), SearchError> {
        let actions: Vec<Value> = actions.iter().map(AliasAction::to_json).collect();

        let response = self
            .client
            .indices()
            .update_aliases()
            .body(json!({ "actions": actions }))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        Self::ensure_success(response, "failed to update alias").await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reindex(&self, source: &str, dest: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .reindex()
            .wait_for_completion(true)
            .refresh(true)
            .body(json!({
                "source": { "index": source },
                "dest": { "index": dest }
            }))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let response = Self::ensure_success(response, "failed to reindex data").await?;
        let body = Self::decode(response).await?;

        let failures = body["failures"].as_array().map(Vec::len).unwrap_or_default();
        if failures > 0 {
            error!(source = %source, dest = %dest, failures = failures, "Reindex reported failures");
            return Err(SearchError::server("failed to reindex data")
                .with_details(format!("{} documents failed to copy", failures)));
        }

        info!(
            source = %source,
            dest = %dest,
            total = body["total"].as_u64().unwrap_or_default(),
            "Reindex completed"
        );
        Ok(())
    }

    async fn bulk(&self, lines: Vec<Value>) -> Result<(), SearchError> {
        let body: Vec<JsonBody<Value>> = lines.into_iter().map(JsonBody::from).collect();

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let response = Self::ensure_success(response, "bulk request failed").await?;
        let body = Self::decode(response).await?;

        if body["errors"].as_bool().unwrap_or(false) {
            let (failed, total) = Self::count_bulk_failures(&body);
            error!(failed = failed, total = total, "Bulk request had item failures");
            return Err(SearchError::bulk(failed, total));
        }

        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        body: Value,
        scroll: Option<&str>,
    ) -> Result<Value, SearchError> {
        let indices = [index];
        let mut request = self.client.search(SearchParts::Index(&indices)).body(body);
        if let Some(keep_alive) = scroll {
            request = request.scroll(keep_alive);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let response = Self::ensure_success(response, "failed to search").await?;
        Self::decode(response).await
    }

    async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<Value, SearchError> {
        let response = self
            .client
            .scroll(ScrollParts::None)
            .body(json!({ "scroll": keep_alive, "scroll_id": scroll_id }))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let response = Self::ensure_success(response, "failed to scroll documents").await?;
        Self::decode(response).await
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .body(json!({ "scroll_id": [scroll_id] }))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        Self::ensure_success(response, "failed to clear scroll").await?;
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Value, SearchError> {
        let response = self
            .client
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let response =
            Self::ensure_found(response, "failed to get document by id", "document not found")
                .await?;
        Self::decode(response).await
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        partial: Value,
    ) -> Result<(), SearchError> {
        let response = self
            .client
            .update(UpdateParts::IndexId(index, id))
            .body(json!({ "doc": partial }))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        Self::ensure_success(response, "failed to update document").await?;
        debug!(index = %index, id = %id, "Document updated");
        Ok(())
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        Self::ensure_found(response, "failed to delete document", "document not found").await?;
        debug!(index = %index, id = %id, "Document deleted");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let response = Self::ensure_success(response, "failed to check cluster health").await?;
        let health = Self::decode(response).await?;
        let status = health["status"].as_str().unwrap_or("unknown");

        info!(status = %status, "OpenSearch cluster status");
        Ok(status == "green" || status == "yellow")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_target() {
        let response = json!({
            "products_20240101120000": { "aliases": { "products": {} } }
        });
        assert_eq!(
            OpenSearchEngine::alias_target(&response).as_deref(),
            Some("products_20240101120000")
        );
        assert!(OpenSearchEngine::alias_target(&json!({})).is_none());
    }

    #[test]
    fn test_count_bulk_failures() {
        let response = json!({
            "errors": true,
            "items": [
                { "index": { "_id": "1", "status": 201 } },
                { "index": { "_id": "2", "status": 400, "error": { "type": "mapper_parsing_exception" } } },
                { "create": { "_id": "3", "status": 409, "error": { "type": "version_conflict_engine_exception" } } }
            ]
        });

        assert_eq!(OpenSearchEngine::count_bulk_failures(&response), (2, 3));
        assert_eq!(OpenSearchEngine::count_bulk_failures(&json!({})), (0, 0));
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_url() {
        let result = OpenSearchEngine::new(&EngineConfig::new("not a url")).await;
        assert_eq!(
            result.err().map(|e| e.error_type().to_string()),
            Some("connection_error".to_string())
        );
    }

    #[tokio::test]
    async fn test_new_with_credentials() {
        let config = EngineConfig::new("http://localhost:9200").with_credentials("admin", "admin");
        assert!(OpenSearchEngine::new(&config).await.is_ok());
    }
}
