//! Dependency initialization and wiring for the gateway.

use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::http::AppState;
use crate::StartupError;
use search_gateway_repository::{OpenSearchEngine, SearchEngine};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// Handler state ready to mount on the router.
    pub state: AppState,
}

impl Dependencies {
    /// Connect to the engine described by `settings` and wire the lifecycle core.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(StartupError)` - If the engine client cannot be built or the
    ///   cluster is unreachable or unhealthy
    pub async fn new(settings: &Settings) -> Result<Self, StartupError> {
        info!(
            opensearch_url = %settings.engine.url,
            base_path = %settings.base_path,
            "Initializing dependencies"
        );

        let engine = OpenSearchEngine::new(&settings.engine)
            .await
            .map_err(|e| StartupError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        let healthy = engine
            .health_check()
            .await
            .map_err(|e| StartupError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(StartupError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        Ok(Self::with_engine(Arc::new(engine), settings))
    }

    /// Wire the lifecycle core around an already constructed engine.
    pub fn with_engine(engine: Arc<dyn SearchEngine>, settings: &Settings) -> Self {
        Self {
            state: AppState::new(engine, settings.transfer.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_gateway_lifecycle::testing::MemoryEngine;

    #[tokio::test]
    async fn test_with_engine_wires_state() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        let engine = Arc::new(MemoryEngine::new());
        engine.seed("products", "products_1", 1).await;

        let deps = Dependencies::with_engine(engine, &settings);

        assert_eq!(
            deps.state.resolver.resolve("products").await.unwrap(),
            "products_1"
        );
        assert_eq!(deps.state.transfer.config().max_pages, 100);
    }
}
