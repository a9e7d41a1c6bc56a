//! OpenSearch index configuration and mappings.
//!
//! This module translates field schemas into engine mappings and back, and
//! builds the settings shared by every physical index the gateway creates.

use serde_json::{json, Map, Value};

use crate::errors::SearchError;
use search_gateway_shared::{FieldConfig, FieldSchema};

/// Analyzer used by completion sub-fields.
pub const AUTOCOMPLETE_ANALYZER: &str = "autocomplete_analyzer";

/// Analyzer used by full-text sub-fields.
pub const STANDARD_ANALYZER: &str = "standard_analyzer";

/// Edge n-gram bounds for prefix completion.
pub const MIN_GRAM: u32 = 2;
pub const MAX_GRAM: u32 = 20;

/// Get the analysis settings shared by all gateway indices.
///
/// The configuration includes:
/// - **autocomplete_analyzer**: edge n-gram tokenizer with lowercasing, for prefix completion
/// - **standard_analyzer**: standard tokenizer with lowercasing, for full-text matching
/// - **autocomplete_filter**: edge n-gram token filter (2..20)
pub fn get_index_settings() -> Value {
    json!({
        "analysis": {
            "analyzer": {
                AUTOCOMPLETE_ANALYZER: {
                    "type": "custom",
                    "tokenizer": "autocomplete_tokenizer",
                    "filter": ["lowercase"]
                },
                STANDARD_ANALYZER: {
                    "type": "custom",
                    "tokenizer": "standard",
                    "filter": ["lowercase"]
                }
            },
            "tokenizer": {
                "autocomplete_tokenizer": {
                    "type": "edge_ngram",
                    "min_gram": MIN_GRAM,
                    "max_gram": MAX_GRAM,
                    "token_chars": ["letter", "digit"]
                }
            },
            "filter": {
                "autocomplete_filter": {
                    "type": "edge_ngram",
                    "min_gram": MIN_GRAM,
                    "max_gram": MAX_GRAM
                }
            }
        }
    })
}

/// Build the full creation body for a physical index.
///
/// When `alias` is set the alias binding is embedded in the body, so the
/// index and its alias are created by one engine call.
pub fn build_index_body(alias: Option<&str>, fields: &FieldSchema) -> Value {
    let mut body = json!({
        "settings": get_index_settings(),
        "mappings": {
            "properties": generate_properties(fields)
        }
    });

    if let Some(alias) = alias {
        body["aliases"] = json!({ alias: {} });
    }

    body
}

/// Validate a field schema before it is sent to the engine.
///
/// `nested` fields must carry a non-empty `properties` map and every other
/// type must not carry one. Nested schemas are checked recursively.
pub fn validate_fields(fields: &FieldSchema) -> Result<(), SearchError> {
    if fields.is_empty() {
        return Err(SearchError::bad_request("fields cannot be empty"));
    }
    validate_level(fields, "")
}

fn validate_level(fields: &FieldSchema, prefix: &str) -> Result<(), SearchError> {
    for (name, config) in fields {
        let path = format!("{}{}", prefix, name);
        if name.trim().is_empty() {
            return Err(SearchError::bad_request("field names cannot be empty"));
        }
        if config.field_type.trim().is_empty() {
            return Err(SearchError::bad_request(format!("field {} has no type", path)));
        }
        if config.is_nested() {
            if config.properties.is_empty() {
                return Err(SearchError::bad_request(format!(
                    "nested field {} requires properties",
                    path
                )));
            }
            validate_level(&config.properties, &format!("{}.", path))?;
        } else if !config.properties.is_empty() {
            return Err(SearchError::bad_request(format!(
                "field {} of type {} cannot have properties",
                path, config.field_type
            )));
        }
    }
    Ok(())
}

/// Translate a field schema into engine mapping properties.
///
/// `text` fields flagged for autocomplete or search gain a `raw` keyword
/// sub-field, plus `suggest` (completion) and `fulltext` (standard analyzed)
/// sub-fields respectively. `nested` fields recurse.
pub fn generate_properties(fields: &FieldSchema) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|(name, config)| (name.clone(), field_mapping(config)))
        .collect();
    Value::Object(properties)
}

fn field_mapping(config: &FieldConfig) -> Value {
    let mut mapping = json!({ "type": config.field_type });

    if let Some(analyzer) = &config.analyzer {
        mapping["analyzer"] = json!(analyzer);
    }
    if let Some(search_analyzer) = &config.search_analyzer {
        mapping["search_analyzer"] = json!(search_analyzer);
    }

    if config.is_text() && (config.autocomplete || config.search) {
        let mut sub_fields = json!({ "raw": { "type": "keyword" } });
        if config.autocomplete {
            sub_fields["suggest"] = json!({
                "type": "completion",
                "analyzer": AUTOCOMPLETE_ANALYZER,
                "search_analyzer": STANDARD_ANALYZER
            });
        }
        if config.search {
            sub_fields["fulltext"] = json!({
                "type": "text",
                "analyzer": STANDARD_ANALYZER
            });
        }
        mapping["fields"] = sub_fields;
    }

    if config.is_nested() && !config.properties.is_empty() {
        mapping["properties"] = generate_properties(&config.properties);
    }

    mapping
}

/// Reconstruct a field schema from engine mapping properties.
pub fn parse_properties(properties: &Map<String, Value>) -> Result<FieldSchema, SearchError> {
    let mut fields = FieldSchema::new();

    for (name, mapping) in properties {
        let mapping = mapping
            .as_object()
            .ok_or_else(|| SearchError::parse(format!("invalid field format for {}", name)))?;

        let sub_fields = mapping.get("fields").and_then(Value::as_object);
        let has_sub_field = |key: &str| sub_fields.is_some_and(|f| f.contains_key(key));

        let nested = match mapping.get("properties").and_then(Value::as_object) {
            Some(children) => parse_properties(children)?,
            None => FieldSchema::new(),
        };

        // Object mappings have no explicit type.
        let field_type = mapping
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(if nested.is_empty() { "" } else { "object" });

        fields.insert(
            name.clone(),
            FieldConfig {
                field_type: field_type.to_string(),
                analyzer: mapping.get("analyzer").and_then(Value::as_str).map(str::to_string),
                search_analyzer: mapping
                    .get("search_analyzer")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                autocomplete: has_sub_field("suggest"),
                search: has_sub_field("fulltext"),
                properties: nested,
            },
        );
    }

    Ok(fields)
}

/// Extract the field schema of `index` from an engine get-index response.
pub fn parse_index_fields(info: &Value, index: &str) -> Result<FieldSchema, SearchError> {
    let properties = info
        .get(index)
        .and_then(|i| i.get("mappings"))
        .and_then(|m| m.get("properties"))
        .and_then(Value::as_object)
        .ok_or_else(|| SearchError::parse(format!("failed to extract properties for {}", index)))?;

    parse_properties(properties)
}
