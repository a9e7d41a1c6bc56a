//! Alias resolution.
//!
//! Maps logical index names to the physical index currently bound to them.
//! Every lookup is an engine call; bindings are never cached.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use search_gateway_repository::opensearch::index_config::parse_index_fields;
use search_gateway_repository::{SearchEngine, SearchError};
use search_gateway_shared::IndexDefinition;

/// Resolves logical index names against the engine's alias table.
#[derive(Clone)]
pub struct AliasResolver {
    engine: Arc<dyn SearchEngine>,
}

impl AliasResolver {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self { engine }
    }

    /// Physical index bound to `alias`, or `None` when the alias is unbound.
    pub async fn lookup(&self, alias: &str) -> Result<Option<String>, SearchError> {
        if alias.trim().is_empty() {
            return Err(SearchError::bad_request("alias name is required"));
        }
        self.engine.get_alias(alias).await
    }

    /// Physical index bound to `alias`.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The physical index name
    /// * `Err(SearchError)` - `not_found` when the alias is unbound, or the engine failure
    #[instrument(skip(self))]
    pub async fn resolve(&self, alias: &str) -> Result<String, SearchError> {
        match self.lookup(alias).await? {
            Some(physical) => {
                debug!(alias = %alias, physical = %physical, "Alias resolved");
                Ok(physical)
            }
            None => Err(SearchError::alias_not_found(alias)),
        }
    }

    /// Check that `alias` is bound and its physical index exists.
    pub async fn exists(&self, alias: &str) -> Result<bool, SearchError> {
        match self.lookup(alias).await? {
            Some(physical) => self.engine.index_exists(&physical).await,
            None => Ok(false),
        }
    }

    /// Field schema of the index bound to `alias`, rebuilt from its mapping.
    pub async fn describe(&self, alias: &str) -> Result<IndexDefinition, SearchError> {
        let physical = self.resolve(alias).await?;
        let info = self.engine.get_index(&physical).await?;

        Ok(IndexDefinition {
            name: alias.to_string(),
            fields: parse_index_fields(&info, &physical)?,
        })
    }

    /// Map of every alias to its physical index.
    ///
    /// System indices and aliases (names starting with `.`) are skipped.
    pub async fn bindings(&self) -> Result<BTreeMap<String, String>, SearchError> {
        let aliases = self.engine.list_aliases().await?;

        Ok(aliases
            .into_iter()
            .filter(|b| !b.alias.starts_with('.') && !b.index.starts_with('.'))
            .map(|b| (b.alias, b.index))
            .collect())
    }

    /// Physical indices no alias points at.
    pub async fn unbound_indices(&self) -> Result<Vec<String>, SearchError> {
        let bound: Vec<String> = self.bindings().await?.into_values().collect();
        let indices = self.engine.list_indices().await?;

        Ok(indices
            .into_iter()
            .filter(|name| !name.starts_with('.') && !bound.contains(name))
            .collect())
    }
}
