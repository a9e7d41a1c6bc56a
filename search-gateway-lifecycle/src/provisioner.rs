//! Index provisioning.
//!
//! Creates physical indices named `{logical}_{YYYYmmddHHMMSS}` with mappings
//! derived from a field schema, optionally binding the logical alias as part
//! of the same creation call.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::resolver::AliasResolver;
use search_gateway_repository::opensearch::index_config::{build_index_body, validate_fields};
use search_gateway_repository::{SearchEngine, SearchError};
use search_gateway_shared::FieldSchema;

/// Format of the physical index suffix.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Source of the creation timestamp.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Creates physical indices for logical names.
pub struct IndexProvisioner {
    engine: Arc<dyn SearchEngine>,
    resolver: AliasResolver,
    clock: Arc<dyn Clock>,
}

impl IndexProvisioner {
    /// Create a provisioner using the wall clock.
    pub fn new(engine: Arc<dyn SearchEngine>, resolver: AliasResolver) -> Self {
        Self::with_clock(engine, resolver, Arc::new(SystemClock))
    }

    /// Create a provisioner with a custom clock.
    pub fn with_clock(
        engine: Arc<dyn SearchEngine>,
        resolver: AliasResolver,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            resolver,
            clock,
        }
    }

    /// Physical name for `alias` created at `at`.
    pub fn physical_name(alias: &str, at: DateTime<Utc>) -> String {
        format!("{}_{}", alias, at.format(TIMESTAMP_FORMAT))
    }

    /// Create a logical index.
    ///
    /// The alias binding is embedded in the creation body, so either both the
    /// physical index and the binding exist afterwards or neither does.
    ///
    /// The unbound check and the creation are not atomic on their own; HTTP
    /// callers go through `MigrationCoordinator::create`, which holds the
    /// per-alias lock around this call.
    ///
    /// # Arguments
    ///
    /// * `alias` - Logical index name
    /// * `fields` - Field schema for the mappings
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The new physical index name
    /// * `Err(SearchError)` - `resource_already_exists_exception` when the alias
    ///   is already bound, `bad_request` for an invalid schema, or the engine failure
    #[instrument(skip(self, fields), fields(field_count = fields.len()))]
    pub async fn create(&self, alias: &str, fields: &FieldSchema) -> Result<String, SearchError> {
        validate_fields(fields)?;

        if let Some(existing) = self.resolver.lookup(alias).await? {
            info!(alias = %alias, physical = %existing, "Alias already bound");
            return Err(SearchError::already_exists(alias));
        }

        let physical = Self::physical_name(alias, self.clock.now());
        self.engine
            .create_index(&physical, build_index_body(Some(alias), fields))
            .await?;

        info!(alias = %alias, physical = %physical, "Index created and alias bound");
        Ok(physical)
    }

    /// Create a physical index for `alias` without binding the alias.
    ///
    /// Used as the reindex target during schema migration.
    #[instrument(skip(self, fields))]
    pub async fn provision_unbound(
        &self,
        alias: &str,
        fields: &FieldSchema,
    ) -> Result<String, SearchError> {
        validate_fields(fields)?;

        let physical = Self::physical_name(alias, self.clock.now());
        self.engine
            .create_index(&physical, build_index_body(None, fields))
            .await?;

        info!(alias = %alias, physical = %physical, "Unbound index created");
        Ok(physical)
    }
}
