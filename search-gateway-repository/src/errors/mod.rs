//! Error types for the search gateway.

mod search_error;

pub use search_error::{classify_engine_error, ErrorKind, SearchError};
