//! # Search Gateway Lifecycle
//!
//! This crate implements the index lifecycle behind the gateway's stable
//! logical index names.
//!
//! ## Architecture
//!
//! 1. **Resolver**: maps a logical name (alias) to its physical index
//! 2. **Provisioner**: creates timestamp-suffixed physical indices bound to an alias
//! 3. **Migration**: applies schema updates in place, or reindexes and swaps the alias
//! 4. **Transfer**: scrolled export and bulk import
//! 5. **Documents**: single-document operations addressed by logical name
//!
//! Every component talks to the engine through `Arc<dyn SearchEngine>` and
//! keeps no alias or schema cache.

pub mod documents;
pub mod migration;
pub mod provisioner;
pub mod resolver;
pub mod transfer;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use documents::DocumentGateway;
pub use migration::{MigrationCoordinator, MigrationOutcome};
pub use provisioner::{Clock, IndexProvisioner, SystemClock};
pub use resolver::AliasResolver;
pub use transfer::{
    parse_bulk_stream, parse_document_array, render_export, BulkTransferEngine, ExportResult,
    ExportStop, ScrollCursor, TransferConfig,
};
