//! Search engine capability trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchError;
use crate::types::{AliasAction, AliasBinding};

/// The capabilities the gateway consumes from a clustered search engine.
///
/// Every method maps to exactly one engine call. Implementations classify
/// engine-reported failures into [`SearchError`] and never retry.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Create a physical index.
    ///
    /// # Arguments
    ///
    /// * `index` - Physical index name
    /// * `body` - Settings, mappings and optional aliases for the new index
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index (and any embedded alias) was created
    /// * `Err(SearchError)` - If the engine rejected the creation
    async fn create_index(&self, index: &str, body: Value) -> Result<(), SearchError>;

    /// Delete a physical index.
    async fn delete_index(&self, index: &str) -> Result<(), SearchError>;

    /// Check whether a physical index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError>;

    /// Fetch the engine's description of an index, keyed by physical name.
    async fn get_index(&self, index: &str) -> Result<Value, SearchError>;

    /// Look up the physical index an alias points at.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(index))` - The alias is bound
    /// * `Ok(None)` - The alias does not exist
    /// * `Err(SearchError)` - If the lookup itself failed
    async fn get_alias(&self, alias: &str) -> Result<Option<String>, SearchError>;

    /// List the names of all physical indices.
    async fn list_indices(&self) -> Result<Vec<String>, SearchError>;

    /// List every alias binding.
    async fn list_aliases(&self) -> Result<Vec<AliasBinding>, SearchError>;

    /// Add fields to the mapping of an existing index.
    ///
    /// The engine rejects changes to the type of an existing field.
    async fn put_mapping(&self, index: &str, properties: Value) -> Result<(), SearchError>;

    /// Apply alias actions in one atomic engine call.
    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), SearchError>;

    /// Copy every document of `source` into `dest`.
    ///
    /// Waits for the copy to complete and refreshes `dest` before returning.
    async fn reindex(&self, source: &str, dest: &str) -> Result<(), SearchError>;

    /// Send a bulk-action batch.
    ///
    /// # Arguments
    ///
    /// * `lines` - Alternating action metadata and document bodies
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If every item was applied
    /// * `Err(SearchError)` - If the batch failed, or a bulk error counting failed items
    async fn bulk(&self, lines: Vec<Value>) -> Result<(), SearchError>;

    /// Run a search, optionally opening a scroll context kept alive for `scroll`.
    async fn search(
        &self,
        index: &str,
        body: Value,
        scroll: Option<&str>,
    ) -> Result<Value, SearchError>;

    /// Fetch the next page of an open scroll context.
    async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<Value, SearchError>;

    /// Release a scroll context.
    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError>;

    /// Fetch a single document.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The engine's document response, including `_source`
    /// * `Err(SearchError)` - With kind `NotFound` when the document does not exist
    async fn get_document(&self, index: &str, id: &str) -> Result<Value, SearchError>;

    /// Merge `partial` into an existing document.
    async fn update_document(&self, index: &str, id: &str, partial: Value)
        -> Result<(), SearchError>;

    /// Delete a single document.
    async fn delete_document(&self, index: &str, id: &str) -> Result<(), SearchError>;

    /// Check that the cluster is green or yellow.
    async fn health_check(&self) -> Result<bool, SearchError>;
}
