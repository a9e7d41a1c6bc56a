//! # Search Gateway Repository
//!
//! This crate provides the search engine capability interface used by the
//! gateway core, the error taxonomy shared by every layer, and a concrete
//! implementation for OpenSearch. It also owns the translation between field
//! schemas and engine mappings, and the builders for engine request bodies.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use config::EngineConfig;
pub use errors::{ErrorKind, SearchError};
pub use interfaces::SearchEngine;
pub use opensearch::OpenSearchEngine;
pub use types::{AliasAction, AliasBinding, SearchPage, SearchPageHit};
