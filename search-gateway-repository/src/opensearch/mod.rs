//! OpenSearch implementation of the search engine capability.
//!
//! This module provides a concrete implementation of `SearchEngine` using
//! OpenSearch as the backend, plus the mapping translation and request-body
//! builders shared with the gateway core.

mod client;
pub mod index_config;
pub mod queries;

pub use client::OpenSearchEngine;
