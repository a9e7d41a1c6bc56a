//! Schema migration.
//!
//! Applies a new field schema to a logical index:
//!
//! ```text
//! RESOLVING -> NOT_BOUND -> CREATE_NEW
//!           -> BOUND(P)  -> TRY_INPLACE_UPDATE -> DONE
//!                                              -> REINDEX(Q) -> SWAP_ALIAS -> RETIRE_OLD -> DONE
//! ```
//!
//! Any in-place rejection triggers the reindex path. Until the alias swap
//! lands the alias keeps pointing at `P`; a failed retirement of `P` is a
//! degraded success.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tracing::{error, info, instrument, warn};

use crate::provisioner::IndexProvisioner;
use crate::resolver::AliasResolver;
use search_gateway_repository::opensearch::index_config::{generate_properties, validate_fields};
use search_gateway_repository::{AliasAction, SearchEngine, SearchError};
use search_gateway_shared::FieldSchema;

/// Result of a schema update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The alias was unbound, so a new index was created.
    Created { index: String },
    /// The engine accepted the mapping change on the bound index.
    UpdatedInPlace { index: String },
    /// Documents were copied to a new index and the alias moved to it.
    Reindexed {
        from: String,
        to: String,
        /// False when the old index could not be deleted and is now orphaned.
        retired: bool,
    },
}

impl MigrationOutcome {
    /// Physical index the alias points at after the update.
    pub fn index(&self) -> &str {
        match self {
            Self::Created { index } | Self::UpdatedInPlace { index } => index,
            Self::Reindexed { to, .. } => to,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Created { .. } => "index created successfully",
            Self::UpdatedInPlace { .. } => "index updated successfully",
            Self::Reindexed { .. } => "index updated successfully (re-indexed)",
        }
    }
}

/// Coordinates index creation, schema updates and deletion, serialising them
/// per logical name.
pub struct MigrationCoordinator {
    engine: Arc<dyn SearchEngine>,
    resolver: AliasResolver,
    provisioner: Arc<IndexProvisioner>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl MigrationCoordinator {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        resolver: AliasResolver,
        provisioner: Arc<IndexProvisioner>,
    ) -> Self {
        Self {
            engine,
            resolver,
            provisioner,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, alias: &str) -> Result<Arc<tokio::sync::Mutex<()>>, SearchError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| SearchError::server("migration lock poisoned"))?;
        Ok(locks.entry(alias.to_string()).or_default().clone())
    }

    /// Drop the lock entry for `alias` once no other caller holds or awaits it.
    fn prune(&self, alias: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
        if let Ok(mut locks) = self.locks.lock() {
            // The map and `lock` are the only references left.
            if Arc::strong_count(lock) == 2 {
                locks.remove(alias);
            }
        }
    }

    /// Run `operation` while holding the lock for `alias`.
    async fn exclusive<T, F, Fut>(&self, alias: &str, operation: F) -> Result<T, SearchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SearchError>>,
    {
        let lock = self.lock_for(alias)?;
        let result = {
            let _guard = lock.lock().await;
            operation().await
        };
        self.prune(alias, &lock);
        result
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }

    /// Create the logical index `alias`.
    ///
    /// Serialised with updates and deletes of the same alias, so two callers
    /// racing on an unbound name provision exactly one physical index.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The new physical index name
    /// * `Err(SearchError)` - `resource_already_exists_exception` when the alias
    ///   is bound, or the provisioning failure
    #[instrument(skip(self, fields), fields(field_count = fields.len()))]
    pub async fn create(&self, alias: &str, fields: &FieldSchema) -> Result<String, SearchError> {
        validate_fields(fields)?;
        self.exclusive(alias, || self.provisioner.create(alias, fields))
            .await
    }

    /// Apply `fields` to the logical index `alias`, creating it when unbound.
    ///
    /// Concurrent creates, updates and deletes of the same alias within this
    /// process run one at a time.
    ///
    /// # Returns
    ///
    /// * `Ok(MigrationOutcome)` - How the update was applied
    /// * `Err(SearchError)` - Schema validation, provisioning, reindex or swap failure;
    ///   the alias still points at the previous index
    #[instrument(skip(self, fields), fields(field_count = fields.len()))]
    pub async fn update(
        &self,
        alias: &str,
        fields: &FieldSchema,
    ) -> Result<MigrationOutcome, SearchError> {
        validate_fields(fields)?;
        self.exclusive(alias, || self.apply(alias, fields)).await
    }

    async fn apply(&self, alias: &str, fields: &FieldSchema) -> Result<MigrationOutcome, SearchError> {
        let current = match self.resolver.lookup(alias).await? {
            Some(current) => current,
            None => {
                info!(alias = %alias, "Alias unbound, creating index");
                let index = self.provisioner.create(alias, fields).await?;
                return Ok(MigrationOutcome::Created { index });
            }
        };

        match self
            .engine
            .put_mapping(&current, generate_properties(fields))
            .await
        {
            Ok(()) => {
                info!(alias = %alias, physical = %current, "Mapping updated in place");
                Ok(MigrationOutcome::UpdatedInPlace { index: current })
            }
            Err(e) => {
                warn!(
                    alias = %alias,
                    physical = %current,
                    error = %e,
                    "In-place mapping update rejected, reindexing"
                );
                self.reindex(alias, &current, fields).await
            }
        }
    }

    /// Delete the physical index bound to `alias`, which drops the binding with it.
    #[instrument(skip(self))]
    pub async fn delete(&self, alias: &str) -> Result<String, SearchError> {
        self.exclusive(alias, || async {
            let physical = self.resolver.resolve(alias).await?;
            self.engine.delete_index(&physical).await?;

            info!(alias = %alias, physical = %physical, "Index deleted");
            Ok::<_, SearchError>(physical)
        })
        .await
    }

    async fn reindex(
        &self,
        alias: &str,
        current: &str,
        fields: &FieldSchema,
    ) -> Result<MigrationOutcome, SearchError> {
        let target = self.provisioner.provision_unbound(alias, fields).await?;

        if let Err(e) = self.engine.reindex(current, &target).await {
            error!(
                alias = %alias,
                source = %current,
                orphaned = %target,
                error = %e,
                "Reindex failed, alias unchanged"
            );
            return Err(e);
        }

        let swap = [
            AliasAction::remove(current, alias),
            AliasAction::add(target.as_str(), alias),
        ];
        if let Err(e) = self.engine.update_aliases(&swap).await {
            error!(
                alias = %alias,
                source = %current,
                orphaned = %target,
                error = %e,
                "Alias swap failed, alias unchanged"
            );
            return Err(e);
        }

        info!(alias = %alias, from = %current, to = %target, "Alias swapped");

        let retired = match self.engine.delete_index(current).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    alias = %alias,
                    orphaned = %current,
                    error = %e,
                    "Failed to delete previous index, manual cleanup required"
                );
                false
            }
        };

        Ok(MigrationOutcome::Reindexed {
            from: current.to_string(),
            to: target,
            retired,
        })
    }
}
