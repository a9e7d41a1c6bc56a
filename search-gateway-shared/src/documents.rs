//! Document types.
//!
//! Documents are user-defined at runtime, so they are kept as ordered JSON
//! objects rather than fixed records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An opaque document body, field order preserved.
pub type Document = Map<String, Value>;

/// Body of `POST /documents/{alias}/add`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AddDocumentsRequest {
    #[serde(default)]
    pub data: Vec<Document>,
}

/// Body of `PUT /documents/{alias}/{id}`: fields merged into the stored document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateDocumentRequest {
    pub data: Document,
}

/// Optional body of `POST /documents/{alias}/export`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExportRequest {
    /// Engine query used as a filter. Match-everything when absent.
    #[serde(default)]
    pub query: Option<Value>,
}

/// How exported documents are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// A JSON array of document bodies.
    #[default]
    Documents,
    /// NDJSON bulk-action stream: an `index` action line before every document.
    Bulk,
}

impl ExportFormat {
    pub fn from_flag(bulk: bool) -> Self {
        if bulk {
            Self::Bulk
        } else {
            Self::Documents
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Documents => "application/json",
            Self::Bulk => "application/x-ndjson",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Documents => "export.json",
            Self::Bulk => "export.ndjson",
        }
    }
}

/// A single stored document with its engine id.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ListedDocument {
    pub id: String,
    pub data: Document,
}

/// Response of `GET /documents/{alias}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ListDocumentsResponse {
    pub total: u64,
    pub documents: Vec<ListedDocument>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_preserves_field_order() {
        let doc: Document =
            serde_json::from_str(r#"{"zeta": 1, "alpha": 2, "mid": 3}"#).unwrap();
        let keys: Vec<&String> = doc.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_add_request_defaults_to_empty() {
        let req: AddDocumentsRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.data.is_empty());
    }

    #[test]
    fn test_export_format_headers() {
        assert_eq!(ExportFormat::from_flag(true), ExportFormat::Bulk);
        assert_eq!(ExportFormat::Bulk.content_type(), "application/x-ndjson");
        assert_eq!(ExportFormat::Bulk.file_name(), "export.ndjson");
        assert_eq!(ExportFormat::from_flag(false).file_name(), "export.json");
    }
}
