//! # Search Gateway
//!
//! HTTP gateway that lets clients address stable logical index names while
//! the lifecycle core manages the physical OpenSearch indices behind them.
//!
//! This crate provides configuration loading, dependency wiring, the axum
//! router and its middleware.

pub mod config;
pub mod http;

pub use config::{Dependencies, Settings};

use thiserror::Error;

/// Errors that can occur while starting or running the gateway.
#[derive(Error, Debug)]
pub enum StartupError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Search engine error.
    #[error("Search error: {0}")]
    SearchError(#[from] search_gateway_repository::SearchError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StartupError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
