//! Interface definitions for the search engine.
//!
//! This module defines the abstract `SearchEngine` trait that the gateway core
//! depends on, allowing swappable backends and in-memory test doubles.

mod search_engine;

pub use search_engine::SearchEngine;
