//! Request and response types exchanged with the search engine.

use serde_json::{json, Value};

use crate::errors::SearchError;
use search_gateway_shared::Document;

/// One action of an atomic alias update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasAction {
    Add { index: String, alias: String },
    Remove { index: String, alias: String },
}

impl AliasAction {
    pub fn add(index: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::Add {
            index: index.into(),
            alias: alias.into(),
        }
    }

    pub fn remove(index: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::Remove {
            index: index.into(),
            alias: alias.into(),
        }
    }

    /// Engine representation of the action.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Add { index, alias } => json!({ "add": { "index": index, "alias": alias } }),
            Self::Remove { index, alias } => {
                json!({ "remove": { "index": index, "alias": alias } })
            }
        }
    }
}

/// An alias and the physical index it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasBinding {
    pub alias: String,
    pub index: String,
}

/// A single hit of a search or scroll page.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPageHit {
    pub id: String,
    pub score: f64,
    pub source: Document,
}

/// A decoded search or scroll response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    /// Total number of matching documents reported by the engine.
    pub total: u64,
    pub max_score: f64,
    pub hits: Vec<SearchPageHit>,
    /// Scroll cursor id, present when the request opened a scroll.
    pub scroll_id: Option<String>,
}

impl SearchPage {
    /// Decode an engine search response.
    ///
    /// Accepts both `hits.total: {"value": n}` and the older `hits.total: n`.
    pub fn parse(response: &Value) -> Result<Self, SearchError> {
        let hits = response
            .get("hits")
            .ok_or_else(|| SearchError::parse("search response has no hits"))?;

        let total = match &hits["total"] {
            Value::Number(n) => n.as_u64().unwrap_or_default(),
            other => other["value"].as_u64().unwrap_or_default(),
        };

        let hits = hits["hits"]
            .as_array()
            .map(|items| items.iter().filter_map(Self::parse_hit).collect())
            .unwrap_or_default();

        Ok(Self {
            total,
            max_score: response["hits"]["max_score"].as_f64().unwrap_or_default(),
            hits,
            scroll_id: response["_scroll_id"].as_str().map(str::to_string),
        })
    }

    fn parse_hit(hit: &Value) -> Option<SearchPageHit> {
        Some(SearchPageHit {
            id: hit["_id"].as_str()?.to_string(),
            score: hit["_score"].as_f64().unwrap_or_default(),
            source: hit["_source"].as_object().cloned().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_action_json() {
        assert_eq!(
            AliasAction::add("products_20240101000000", "products").to_json(),
            json!({ "add": { "index": "products_20240101000000", "alias": "products" } })
        );
        assert_eq!(
            AliasAction::remove("products_1", "products").to_json()["remove"]["index"],
            "products_1"
        );
    }

    #[test]
    fn test_parse_search_page() {
        let response = json!({
            "_scroll_id": "c2Nyb2xs",
            "hits": {
                "total": { "value": 3, "relation": "eq" },
                "max_score": 1.5,
                "hits": [
                    { "_id": "1", "_score": 1.5, "_source": { "name": "Product A" } },
                    { "_id": "2", "_score": 0.5, "_source": { "name": "Product B" } }
                ]
            }
        });

        let page = SearchPage::parse(&response).unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.max_score, 1.5);
        assert_eq!(page.hits.len(), 2);
        assert_eq!(page.hits[0].id, "1");
        assert_eq!(page.hits[1].source["name"], "Product B");
        assert_eq!(page.scroll_id.as_deref(), Some("c2Nyb2xs"));
    }

    #[test]
    fn test_parse_search_page_numeric_total_and_null_score() {
        let response = json!({
            "hits": {
                "total": 1,
                "max_score": null,
                "hits": [ { "_id": "a", "_score": null, "_source": {} } ]
            }
        });

        let page = SearchPage::parse(&response).unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.max_score, 0.0);
        assert_eq!(page.hits[0].score, 0.0);
        assert!(page.scroll_id.is_none());
    }

    #[test]
    fn test_parse_search_page_missing_hits() {
        let result = SearchPage::parse(&json!({ "took": 1 }));
        assert!(result.is_err());
    }
}
