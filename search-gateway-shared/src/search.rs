//! Search and suggestion request/response types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::documents::Document;

/// Page size used when the caller does not provide one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Offset pagination for search requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Pagination {
    #[serde(default)]
    pub from: usize,
    #[serde(default)]
    pub size: usize,
}

impl Pagination {
    /// Page size with the zero value replaced by the default.
    pub fn effective_size(&self) -> usize {
        if self.size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.size
        }
    }
}

/// Body of `POST /documents/{alias}/search`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchRequest {
    /// Full-text query.
    pub query: Option<String>,
    /// Exact-match filters, one `term` clause per entry.
    pub filters: Map<String, Value>,
    pub match_all: bool,
    pub pagination: Pagination,
    pub min_score: Option<f64>,
    /// Fields to run the full-text query against.
    pub search_fields: Vec<String>,
}

/// One scored hit.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
    pub data: Document,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SearchResponse {
    pub total: u64,
    pub max_score: f64,
    pub documents: Vec<SearchHit>,
}

/// Body of `POST /documents/{alias}/suggest`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SuggestRequest {
    pub field: String,
    pub input: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<String>,
}
