//! Shared handler state.

use std::sync::Arc;

use search_gateway_lifecycle::{
    AliasResolver, BulkTransferEngine, DocumentGateway, IndexProvisioner, MigrationCoordinator,
    TransferConfig,
};
use search_gateway_repository::SearchEngine;

/// Lifecycle components shared by every request. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn SearchEngine>,
    pub resolver: AliasResolver,
    pub migration: Arc<MigrationCoordinator>,
    pub transfer: Arc<BulkTransferEngine>,
    pub documents: DocumentGateway,
}

impl AppState {
    /// Wire the lifecycle components around `engine`.
    pub fn new(engine: Arc<dyn SearchEngine>, transfer: TransferConfig) -> Self {
        let resolver = AliasResolver::new(engine.clone());
        let provisioner = Arc::new(IndexProvisioner::new(engine.clone(), resolver.clone()));
        let migration = Arc::new(MigrationCoordinator::new(
            engine.clone(),
            resolver.clone(),
            provisioner,
        ));
        let transfer = Arc::new(BulkTransferEngine::new(
            engine.clone(),
            resolver.clone(),
            transfer,
        ));
        let documents = DocumentGateway::new(engine.clone(), resolver.clone());

        Self {
            engine,
            resolver,
            migration,
            transfer,
            documents,
        }
    }
}
