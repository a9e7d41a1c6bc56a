//! Index schema descriptions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name to field configuration. Sorted so generated mappings are stable.
pub type FieldSchema = BTreeMap<String, FieldConfig>;

/// Configuration of one field in a logical index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldConfig {
    /// Engine field type (`text`, `keyword`, `float`, `nested`, ...).
    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_analyzer: Option<String>,

    /// Adds a completion sub-field for prefix suggestions (`text` only).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub autocomplete: bool,

    /// Adds a standard-analyzed full-text sub-field (`text` only).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub search: bool,

    /// Child fields, required for `nested` and forbidden otherwise.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: FieldSchema,
}

impl FieldConfig {
    pub fn new(field_type: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            ..Default::default()
        }
    }

    pub fn with_autocomplete(mut self) -> Self {
        self.autocomplete = true;
        self
    }

    pub fn with_search(mut self) -> Self {
        self.search = true;
        self
    }

    pub fn with_properties(mut self, properties: FieldSchema) -> Self {
        self.properties = properties;
        self
    }

    pub fn is_nested(&self) -> bool {
        self.field_type == "nested"
    }

    pub fn is_text(&self) -> bool {
        self.field_type == "text"
    }
}

/// Body of `POST /indices/`, also returned by the index-info operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndexDefinition {
    /// Logical index name.
    #[serde(rename = "index")]
    pub name: String,
    pub fields: FieldSchema,
}

/// Body of `PUT /indices/{alias}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UpdateIndexRequest {
    pub fields: FieldSchema,
}
