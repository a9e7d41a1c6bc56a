//! Document operations addressed by logical index name.
//!
//! Each operation resolves the alias and then makes exactly one engine call.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::resolver::AliasResolver;
use search_gateway_repository::opensearch::queries::{
    build_list_query, build_search_query, build_suggest_query, parse_listed_documents,
    parse_search_response, parse_suggestions,
};
use search_gateway_repository::{SearchEngine, SearchError};
use search_gateway_shared::{
    Document, ListDocumentsResponse, SearchRequest, SearchResponse, SuggestRequest,
    SuggestResponse,
};

#[derive(Clone)]
pub struct DocumentGateway {
    engine: Arc<dyn SearchEngine>,
    resolver: AliasResolver,
}

impl DocumentGateway {
    pub fn new(engine: Arc<dyn SearchEngine>, resolver: AliasResolver) -> Self {
        Self { engine, resolver }
    }

    /// Fetch the stored body of document `id`.
    #[instrument(skip(self))]
    pub async fn get(&self, alias: &str, id: &str) -> Result<Document, SearchError> {
        let physical = self.resolver.resolve(alias).await?;
        let response = self.engine.get_document(&physical, id).await?;

        if response["found"] == Value::Bool(false) {
            return Err(SearchError::not_found("document not found"));
        }

        response["_source"]
            .as_object()
            .cloned()
            .ok_or_else(|| SearchError::parse("document response has no _source"))
    }

    /// Merge `partial` into the stored document `id`.
    #[instrument(skip(self, partial))]
    pub async fn update(&self, alias: &str, id: &str, partial: Document) -> Result<(), SearchError> {
        if partial.is_empty() {
            return Err(SearchError::bad_request("data cannot be empty"));
        }

        let physical = self.resolver.resolve(alias).await?;
        self.engine
            .update_document(&physical, id, Value::Object(partial))
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, alias: &str, id: &str) -> Result<(), SearchError> {
        let physical = self.resolver.resolve(alias).await?;
        self.engine.delete_document(&physical, id).await
    }

    /// Full-text search. The query body is built before the alias is resolved,
    /// so an empty request never reaches the engine.
    #[instrument(skip(self, request))]
    pub async fn search(
        &self,
        alias: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, SearchError> {
        let body = build_search_query(request)?;
        let physical = self.resolver.resolve(alias).await?;

        let response = self.engine.search(&physical, body, None).await?;
        let result = parse_search_response(&response)?;

        debug!(alias = %alias, total = result.total, "Search completed");
        Ok(result)
    }

    /// Prefix suggestions from the completion sub-field of `request.field`.
    #[instrument(skip(self, request))]
    pub async fn suggest(
        &self,
        alias: &str,
        request: &SuggestRequest,
    ) -> Result<SuggestResponse, SearchError> {
        if request.field.trim().is_empty() || request.input.is_empty() {
            return Err(SearchError::bad_request("field and input are required"));
        }

        let physical = self.resolver.resolve(alias).await?;
        let response = self
            .engine
            .search(&physical, build_suggest_query(&request.field, &request.input), None)
            .await?;

        Ok(parse_suggestions(&response))
    }

    /// One page of documents. `page` is 1-based.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        alias: &str,
        page: usize,
        size: usize,
    ) -> Result<ListDocumentsResponse, SearchError> {
        if page == 0 || size == 0 {
            return Err(SearchError::bad_request("page and size must be positive"));
        }

        let physical = self.resolver.resolve(alias).await?;
        let response = self
            .engine
            .search(&physical, build_list_query(page, size), None)
            .await?;

        parse_listed_documents(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryEngine;
    use search_gateway_repository::ErrorKind;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    async fn gateway() -> (Arc<MemoryEngine>, DocumentGateway) {
        let engine = Arc::new(MemoryEngine::new());
        engine.seed("products", "products_1", 3).await;
        let gateway = DocumentGateway::new(engine.clone(), AliasResolver::new(engine.clone()));
        (engine, gateway)
    }

    #[tokio::test]
    async fn test_get_document() {
        let (_, gateway) = gateway().await;

        let document = gateway.get("products", "doc-1").await.unwrap();
        assert_eq!(document["name"], "Product 1");

        let err = gateway.get("products", "missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = gateway.get("orders", "doc-1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let (engine, gateway) = gateway().await;

        let mut partial = Document::new();
        partial.insert("price".to_string(), json!(9.5));
        gateway.update("products", "doc-2", partial).await.unwrap();

        let documents = engine.documents("products_1").await;
        let (_, stored) = documents.iter().find(|(id, _)| id == "doc-2").unwrap();
        assert_eq!(stored["name"], "Product 2");
        assert_eq!(stored["price"], 9.5);

        let err = gateway
            .update("products", "doc-2", Document::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_delete_document() {
        let (engine, gateway) = gateway().await;

        gateway.delete("products", "doc-0").await.unwrap();
        assert_eq!(engine.documents("products_1").await.len(), 2);

        let err = gateway.delete("products", "doc-0").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_search_without_query_never_reaches_engine() {
        let (engine, gateway) = gateway().await;

        let err = gateway
            .search("products", &SearchRequest::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(engine.search_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_match_all() {
        let (_, gateway) = gateway().await;

        let request = SearchRequest {
            match_all: true,
            ..Default::default()
        };
        let result = gateway.search("products", &request).await.unwrap();

        assert_eq!(result.total, 3);
        assert_eq!(result.documents.len(), 3);
    }

    #[tokio::test]
    async fn test_list_pages() {
        let (_, gateway) = gateway().await;

        let page = gateway.list("products", 2, 2).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.documents.len(), 1);
        assert_eq!(page.documents[0].id, "doc-2");

        let err = gateway.list("products", 0, 2).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_suggest_requires_field_and_input() {
        let (_, gateway) = gateway().await;

        let request = SuggestRequest {
            field: String::new(),
            input: "Pro".to_string(),
        };
        let err = gateway.suggest("products", &request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_min_score_drops_weaker_match() {
        use crate::provisioner::IndexProvisioner;
        use crate::transfer::{BulkTransferEngine, TransferConfig};
        use search_gateway_shared::{FieldConfig, FieldSchema};

        let engine = Arc::new(MemoryEngine::new());
        let resolver = AliasResolver::new(engine.clone());

        let mut fields = FieldSchema::new();
        fields.insert(
            "name".to_string(),
            FieldConfig::new("text").with_autocomplete().with_search(),
        );
        fields.insert("price".to_string(), FieldConfig::new("float"));
        IndexProvisioner::new(engine.clone(), resolver.clone())
            .create("products", &fields)
            .await
            .unwrap();

        let documents = [("Product A", 10.0), ("Product B", 20.0)]
            .iter()
            .map(|(name, price)| {
                json!({ "name": name, "price": price })
                    .as_object()
                    .cloned()
                    .unwrap()
            })
            .collect();
        BulkTransferEngine::new(engine.clone(), resolver.clone(), TransferConfig::default())
            .add_documents("products", documents)
            .await
            .unwrap();

        let gateway = DocumentGateway::new(engine.clone(), resolver);
        let mut request = SearchRequest {
            query: Some("Product A".to_string()),
            ..Default::default()
        };

        let all = gateway.search("products", &request).await.unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.documents[0].data["name"], "Product A");
        assert!(all.documents[0].score > all.documents[1].score);

        request.min_score = Some(all.documents[1].score + 0.5);
        let strict = gateway.search("products", &request).await.unwrap();
        assert_eq!(strict.total, 1);
        assert_eq!(strict.documents.len(), 1);
        assert_eq!(strict.documents[0].data["name"], "Product A");
        assert!(strict.documents[0].score > 0.0);
    }
}
