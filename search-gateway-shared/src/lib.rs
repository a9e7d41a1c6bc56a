//! # Search Gateway Shared
//!
//! Shared types used across the search gateway crates: documents, index
//! schema descriptions, and the request/response records exchanged with
//! HTTP clients.

pub mod documents;
pub mod schema;
pub mod search;

pub use documents::{
    AddDocumentsRequest, Document, ExportFormat, ExportRequest, ListDocumentsResponse,
    ListedDocument, UpdateDocumentRequest,
};
pub use schema::{FieldConfig, FieldSchema, IndexDefinition, UpdateIndexRequest};
pub use search::{
    Pagination, SearchHit, SearchRequest, SearchResponse, SuggestRequest, SuggestResponse,
};
