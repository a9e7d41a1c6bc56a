//! OpenSearch query builders.
//!
//! This module builds engine request bodies for search, suggestion, listing
//! and export, and decodes the parts of the responses the gateway exposes.

use serde_json::{json, Map, Value};

use crate::errors::SearchError;
use crate::types::SearchPage;
use search_gateway_shared::{
    ListDocumentsResponse, ListedDocument, SearchHit, SearchRequest, SearchResponse,
    SuggestResponse,
};

/// Fields searched when the request does not name any.
pub const DEFAULT_SEARCH_FIELDS: [&str; 2] = ["name.fulltext", "description.fulltext"];

/// Name of the completion suggester in suggest requests.
pub const SUGGESTION_NAME: &str = "name_suggestion";

/// Build the `query` clause for a search request.
///
/// Precedence:
/// - `match_all` matches every document
/// - a query text becomes a bool query combining an exact phrase match
///   (boost 2) and a fuzzy match (boost 1), with filters applied
/// - filters alone become a filter-only bool query
///
/// Returns `None` when the request has none of the above.
pub fn build_query_clause(request: &SearchRequest) -> Option<Value> {
    if request.match_all {
        return Some(json!({ "match_all": {} }));
    }

    let query_text = request.query.as_deref().filter(|q| !q.trim().is_empty());

    if let Some(text) = query_text {
        let fields: Vec<&str> = if request.search_fields.is_empty() {
            DEFAULT_SEARCH_FIELDS.to_vec()
        } else {
            request.search_fields.iter().map(String::as_str).collect()
        };

        return Some(json!({
            "bool": {
                "should": [
                    {
                        "multi_match": {
                            "query": text,
                            "fields": fields,
                            "type": "phrase",
                            "boost": 2
                        }
                    },
                    {
                        // AUTO fuzziness scales allowed edits with term length
                        "multi_match": {
                            "query": text,
                            "fields": fields,
                            "fuzziness": "AUTO",
                            "boost": 1
                        }
                    }
                ],
                "minimum_should_match": 1,
                "filter": build_filters(&request.filters)
            }
        }));
    }

    if !request.filters.is_empty() {
        return Some(json!({
            "bool": {
                "filter": build_filters(&request.filters)
            }
        }));
    }

    None
}

/// One `term` clause per filter entry.
fn build_filters(filters: &Map<String, Value>) -> Vec<Value> {
    filters
        .iter()
        .map(|(field, value)| json!({ "term": { field: value } }))
        .collect()
}

/// Build the full search body, with pagination and optional minimum score.
pub fn build_search_query(request: &SearchRequest) -> Result<Value, SearchError> {
    let query = build_query_clause(request)
        .ok_or_else(|| SearchError::bad_request("no valid query provided"))?;

    let mut body = json!({
        "query": query,
        "from": request.pagination.from,
        "size": request.pagination.effective_size()
    });

    if let Some(min_score) = request.min_score {
        body["min_score"] = json!(min_score);
    }

    Ok(body)
}

/// Build a completion-suggester body against `{field}.suggest`.
pub fn build_suggest_query(field: &str, input: &str) -> Value {
    json!({
        "suggest": {
            "text": input,
            SUGGESTION_NAME: {
                "completion": {
                    "field": format!("{}.suggest", field)
                }
            }
        }
    })
}

/// Build the body of one listing page. Pages are 1-based.
pub fn build_list_query(page: usize, size: usize) -> Value {
    json!({
        "query": { "match_all": {} },
        "from": page.saturating_sub(1) * size,
        "size": size
    })
}

/// Build the first-page body of an export.
pub fn build_export_query(query: Option<&Value>, page_size: usize) -> Value {
    let query = match query {
        Some(q) if !q.is_null() => q.clone(),
        _ => json!({ "match_all": {} }),
    };

    json!({
        "query": query,
        "size": page_size
    })
}

/// Map an engine search response to the gateway search response.
pub fn parse_search_response(response: &Value) -> Result<SearchResponse, SearchError> {
    let page = SearchPage::parse(response)?;

    Ok(SearchResponse {
        total: page.total,
        max_score: page.max_score,
        documents: page
            .hits
            .into_iter()
            .map(|hit| SearchHit {
                id: hit.id,
                score: hit.score,
                data: hit.source,
            })
            .collect(),
    })
}

/// Collect suggestion texts from a completion-suggester response.
pub fn parse_suggestions(response: &Value) -> SuggestResponse {
    let suggestions = response["suggest"][SUGGESTION_NAME]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry["options"].as_array())
                .flatten()
                .filter_map(|option| option["text"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    SuggestResponse { suggestions }
}

/// Map an engine search response to a document listing.
pub fn parse_listed_documents(response: &Value) -> Result<ListDocumentsResponse, SearchError> {
    let page = SearchPage::parse(response)?;

    Ok(ListDocumentsResponse {
        total: page.total,
        documents: page
            .hits
            .into_iter()
            .map(|hit| ListedDocument {
                id: hit.id,
                data: hit.source,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_gateway_shared::Pagination;

    fn text_request(query: &str) -> SearchRequest {
        SearchRequest {
            query: Some(query.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_query_text() {
        let body = build_search_query(&text_request("Product A")).unwrap();

        let should = body["query"]["bool"]["should"].as_array().unwrap();
        assert_eq!(should.len(), 2);
        assert_eq!(should[0]["multi_match"]["type"], "phrase");
        assert_eq!(should[0]["multi_match"]["boost"], 2);
        assert_eq!(should[1]["multi_match"]["fuzziness"], "AUTO");
        assert_eq!(
            should[0]["multi_match"]["fields"],
            json!(["name.fulltext", "description.fulltext"])
        );
        assert_eq!(body["query"]["bool"]["minimum_should_match"], 1);
        assert_eq!(body["from"], 0);
        assert_eq!(body["size"], 10);
        assert!(body.get("min_score").is_none());
    }

    #[test]
    fn test_build_query_custom_fields_filters_and_min_score() {
        let mut request = text_request("lamp");
        request.search_fields = vec!["title".to_string()];
        request.filters.insert("category".to_string(), json!("lighting"));
        request.min_score = Some(1.5);
        request.pagination = Pagination { from: 20, size: 5 };

        let body = build_search_query(&request).unwrap();

        assert_eq!(body["query"]["bool"]["should"][1]["multi_match"]["fields"], json!(["title"]));
        assert_eq!(
            body["query"]["bool"]["filter"][0]["term"]["category"],
            "lighting"
        );
        assert_eq!(body["min_score"], 1.5);
        assert_eq!(body["from"], 20);
        assert_eq!(body["size"], 5);
    }

    #[test]
    fn test_build_query_match_all_wins() {
        let mut request = text_request("ignored");
        request.match_all = true;

        let body = build_search_query(&request).unwrap();
        assert!(body["query"]["match_all"].is_object());
    }

    #[test]
    fn test_build_query_filters_only() {
        let mut request = SearchRequest::default();
        request.filters.insert("in_stock".to_string(), json!(true));

        let body = build_search_query(&request).unwrap();

        assert!(body["query"]["bool"]["should"].is_null());
        assert_eq!(body["query"]["bool"]["filter"][0]["term"]["in_stock"], true);
    }

    #[test]
    fn test_build_query_empty_is_bad_request() {
        let err = build_search_query(&text_request("   ")).unwrap_err();
        assert_eq!(err.error_type(), "bad_request");
        assert_eq!(err.message(), "no valid query provided");
    }

    #[test]
    fn test_build_suggest_query() {
        let body = build_suggest_query("name", "pro");

        assert_eq!(body["suggest"]["text"], "pro");
        assert_eq!(
            body["suggest"]["name_suggestion"]["completion"]["field"],
            "name.suggest"
        );
    }

    #[test]
    fn test_build_list_query_offsets() {
        assert_eq!(build_list_query(1, 10)["from"], 0);
        assert_eq!(build_list_query(3, 25)["from"], 50);
        assert_eq!(build_list_query(3, 25)["size"], 25);
    }

    #[test]
    fn test_build_export_query_defaults_to_match_all() {
        let body = build_export_query(None, 500);
        assert!(body["query"]["match_all"].is_object());
        assert_eq!(body["size"], 500);

        let filter = json!({ "term": { "category": "books" } });
        let body = build_export_query(Some(&filter), 500);
        assert_eq!(body["query"]["term"]["category"], "books");
    }

    #[test]
    fn test_parse_suggestions() {
        let response = json!({
            "suggest": {
                "name_suggestion": [
                    {
                        "text": "pro",
                        "options": [ { "text": "Product A" }, { "text": "Product B" } ]
                    }
                ]
            }
        });

        let parsed = parse_suggestions(&response);
        assert_eq!(parsed.suggestions, vec!["Product A", "Product B"]);
        assert!(parse_suggestions(&json!({})).suggestions.is_empty());
    }

    #[test]
    fn test_parse_search_and_list_responses() {
        let response = json!({
            "hits": {
                "total": { "value": 1 },
                "max_score": 2.0,
                "hits": [ { "_id": "p1", "_score": 2.0, "_source": { "name": "Product A" } } ]
            }
        });

        let search = parse_search_response(&response).unwrap();
        assert_eq!(search.total, 1);
        assert_eq!(search.documents[0].id, "p1");
        assert_eq!(search.documents[0].data["name"], "Product A");

        let listed = parse_listed_documents(&response).unwrap();
        assert_eq!(listed.documents[0].id, "p1");
    }
}
