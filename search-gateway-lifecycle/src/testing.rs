//! In-memory search engine for tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

use search_gateway_repository::errors::classify_engine_error;
use search_gateway_repository::{AliasAction, AliasBinding, SearchEngine, SearchError};
use search_gateway_shared::Document;

#[derive(Default)]
struct StoredIndex {
    properties: Map<String, Value>,
    documents: Vec<(String, Document)>,
}

struct ScrollContext {
    remaining: Vec<(String, Document, f64)>,
    page_size: usize,
    total: usize,
}

#[derive(Default)]
struct State {
    indices: BTreeMap<String, StoredIndex>,
    aliases: HashMap<String, String>,
    scrolls: HashMap<String, ScrollContext>,
    next_id: usize,
}

/// Engine double with call counters and injectable failures.
#[derive(Default)]
pub struct MemoryEngine {
    state: Mutex<State>,
    failing: Mutex<HashSet<&'static str>>,
    alias_delay: Mutex<Option<Duration>>,
    pub create_calls: AtomicUsize,
    pub put_mapping_calls: AtomicUsize,
    pub reindex_calls: AtomicUsize,
    pub alias_updates: Mutex<Vec<Vec<AliasAction>>>,
    pub bulk_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub scroll_calls: AtomicUsize,
    pub cleared_scrolls: Mutex<Vec<String>>,
    pub deleted_indices: Mutex<Vec<String>>,
}

fn engine_error(status: u16, error_type: &str, reason: &str, default: &str) -> SearchError {
    let body = json!({ "error": { "type": error_type, "reason": reason }, "status": status });
    classify_engine_error(status, &body.to_string(), default)
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named operation fail until cleared.
    pub async fn fail_on(&self, operation: &'static str) {
        self.failing.lock().await.insert(operation);
    }

    /// Sleep before answering every alias lookup, so concurrent callers interleave.
    pub async fn delay_alias_lookups(&self, delay: Duration) {
        *self.alias_delay.lock().await = Some(delay);
    }

    async fn check(&self, operation: &'static str) -> Result<(), SearchError> {
        if self.failing.lock().await.contains(operation) {
            return Err(engine_error(
                500,
                "injected_failure",
                operation,
                &format!("{} failed", operation),
            ));
        }
        Ok(())
    }

    /// Create an index bound to `alias` holding `count` documents.
    pub async fn seed(&self, alias: &str, physical: &str, count: usize) {
        let mut state = self.state.lock().await;
        let documents = (0..count)
            .map(|i| {
                let mut doc = Document::new();
                doc.insert("name".to_string(), json!(format!("Product {}", i)));
                doc.insert("rank".to_string(), json!(i));
                (format!("doc-{}", i), doc)
            })
            .collect();
        let mut properties = Map::new();
        properties.insert("name".to_string(), json!({ "type": "text" }));
        properties.insert("rank".to_string(), json!({ "type": "integer" }));
        state.indices.insert(
            physical.to_string(),
            StoredIndex {
                properties,
                documents,
            },
        );
        state.aliases.insert(alias.to_string(), physical.to_string());
    }

    pub async fn alias_target(&self, alias: &str) -> Option<String> {
        self.state.lock().await.aliases.get(alias).cloned()
    }

    pub async fn index_names(&self) -> Vec<String> {
        self.state.lock().await.indices.keys().cloned().collect()
    }

    pub async fn documents(&self, index: &str) -> Vec<(String, Document)> {
        self.state
            .lock()
            .await
            .indices
            .get(index)
            .map(|i| i.documents.clone())
            .unwrap_or_default()
    }

    pub async fn properties(&self, index: &str) -> Map<String, Value> {
        self.state
            .lock()
            .await
            .indices
            .get(index)
            .map(|i| i.properties.clone())
            .unwrap_or_default()
    }

    pub async fn open_scrolls(&self) -> usize {
        self.state.lock().await.scrolls.len()
    }

    fn resolve_name(state: &State, name: &str) -> Option<String> {
        if state.indices.contains_key(name) {
            Some(name.to_string())
        } else {
            state.aliases.get(name).cloned()
        }
    }

    /// Text of the first `multi_match` clause in a search body.
    fn query_text(body: &Value) -> Option<String> {
        body["query"]["bool"]["should"]
            .as_array()?
            .iter()
            .find_map(|clause| clause["multi_match"]["query"].as_str())
            .map(str::to_string)
    }

    /// Number of query terms found as whole words in the document's string fields.
    fn term_score(doc: &Document, text: &str) -> f64 {
        let words: HashSet<String> = doc
            .values()
            .filter_map(Value::as_str)
            .flat_map(str::split_whitespace)
            .map(str::to_lowercase)
            .collect();
        text.split_whitespace()
            .filter(|term| words.contains(&term.to_lowercase()))
            .count() as f64
    }

    /// Score, filter and order documents for a search body. Bodies without a
    /// text query match everything with score 1.
    fn score(documents: Vec<(String, Document)>, body: &Value) -> Vec<(String, Document, f64)> {
        let Some(text) = Self::query_text(body) else {
            return documents
                .into_iter()
                .map(|(id, doc)| (id, doc, 1.0))
                .collect();
        };
        let min_score = body["min_score"].as_f64().unwrap_or(0.0);

        let mut scored: Vec<(String, Document, f64)> = documents
            .into_iter()
            .map(|(id, doc)| {
                let score = Self::term_score(&doc, &text);
                (id, doc, score)
            })
            .filter(|(_, _, score)| *score > 0.0 && *score >= min_score)
            .collect();
        scored.sort_by(|a, b| b.2.total_cmp(&a.2));
        scored
    }

    fn page(hits: &[(String, Document, f64)], total: usize, scroll_id: Option<&str>) -> Value {
        let max_score = hits.iter().map(|(_, _, score)| *score).fold(0.0, f64::max);
        let hits: Vec<Value> = hits
            .iter()
            .map(|(id, doc, score)| json!({ "_id": id, "_score": score, "_source": doc }))
            .collect();
        let mut page = json!({
            "hits": {
                "total": { "value": total, "relation": "eq" },
                "max_score": max_score,
                "hits": hits
            }
        });
        if let Some(id) = scroll_id {
            page["_scroll_id"] = json!(id);
        }
        page
    }
}

#[async_trait]
impl SearchEngine for MemoryEngine {
    async fn create_index(&self, index: &str, body: Value) -> Result<(), SearchError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check("create_index").await?;

        let mut state = self.state.lock().await;
        if state.indices.contains_key(index) {
            return Err(engine_error(
                400,
                "resource_already_exists_exception",
                &format!("index [{}] already exists", index),
                "failed to create index",
            ));
        }

        let properties = body["mappings"]["properties"]
            .as_object()
            .cloned()
            .unwrap_or_default();
        state.indices.insert(
            index.to_string(),
            StoredIndex {
                properties,
                documents: Vec::new(),
            },
        );
        if let Some(aliases) = body["aliases"].as_object() {
            for alias in aliases.keys() {
                state.aliases.insert(alias.clone(), index.to_string());
            }
        }
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), SearchError> {
        self.check("delete_index").await?;
        let mut state = self.state.lock().await;
        if state.indices.remove(index).is_none() {
            return Err(engine_error(
                404,
                "index_not_found_exception",
                &format!("no such index [{}]", index),
                "failed to delete index",
            ));
        }
        state.aliases.retain(|_, target| target != index);
        self.deleted_indices.lock().await.push(index.to_string());
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        Ok(self.state.lock().await.indices.contains_key(index))
    }

    async fn get_index(&self, index: &str) -> Result<Value, SearchError> {
        let state = self.state.lock().await;
        let name = Self::resolve_name(&state, index).ok_or_else(|| {
            engine_error(404, "index_not_found_exception", index, "failed to get index info")
        })?;
        let stored = &state.indices[&name];
        let aliases: Map<String, Value> = state
            .aliases
            .iter()
            .filter(|(_, target)| **target == name)
            .map(|(alias, _)| (alias.clone(), json!({})))
            .collect();
        Ok(json!({
            name.clone(): {
                "aliases": aliases,
                "mappings": { "properties": stored.properties }
            }
        }))
    }

    async fn get_alias(&self, alias: &str) -> Result<Option<String>, SearchError> {
        self.check("get_alias").await?;
        let delay = *self.alias_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.state.lock().await.aliases.get(alias).cloned())
    }

    async fn list_indices(&self) -> Result<Vec<String>, SearchError> {
        Ok(self.state.lock().await.indices.keys().cloned().collect())
    }

    async fn list_aliases(&self) -> Result<Vec<AliasBinding>, SearchError> {
        Ok(self
            .state
            .lock()
            .await
            .aliases
            .iter()
            .map(|(alias, index)| AliasBinding {
                alias: alias.clone(),
                index: index.clone(),
            })
            .collect())
    }

    async fn put_mapping(&self, index: &str, properties: Value) -> Result<(), SearchError> {
        self.put_mapping_calls.fetch_add(1, Ordering::SeqCst);
        self.check("put_mapping").await?;

        let mut state = self.state.lock().await;
        let stored = state.indices.get_mut(index).ok_or_else(|| {
            engine_error(404, "index_not_found_exception", index, "failed to update index mappings")
        })?;
        let incoming = properties.as_object().cloned().unwrap_or_default();

        for (field, mapping) in &incoming {
            if let Some(existing) = stored.properties.get(field) {
                if existing["type"] != mapping["type"] {
                    return Err(engine_error(
                        400,
                        "illegal_argument_exception",
                        &format!("mapper [{}] cannot be changed", field),
                        "failed to update index mappings",
                    ));
                }
            }
        }
        stored.properties.extend(incoming);
        Ok(())
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), SearchError> {
        self.alias_updates.lock().await.push(actions.to_vec());
        self.check("update_aliases").await?;

        let mut state = self.state.lock().await;
        for action in actions {
            match action {
                AliasAction::Add { index, alias } => {
                    if !state.indices.contains_key(index) {
                        return Err(engine_error(
                            404,
                            "index_not_found_exception",
                            index,
                            "failed to update alias",
                        ));
                    }
                    state.aliases.insert(alias.clone(), index.clone());
                }
                AliasAction::Remove { index, alias } => {
                    if state.aliases.get(alias) == Some(index) {
                        state.aliases.remove(alias);
                    }
                }
            }
        }
        Ok(())
    }

    async fn reindex(&self, source: &str, dest: &str) -> Result<(), SearchError> {
        self.reindex_calls.fetch_add(1, Ordering::SeqCst);
        self.check("reindex").await?;

        let mut state = self.state.lock().await;
        let documents = state
            .indices
            .get(source)
            .map(|i| i.documents.clone())
            .unwrap_or_default();
        let dest = state.indices.get_mut(dest).ok_or_else(|| {
            engine_error(404, "index_not_found_exception", dest, "failed to reindex data")
        })?;
        dest.documents.extend(documents);
        Ok(())
    }

    async fn bulk(&self, lines: Vec<Value>) -> Result<(), SearchError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        self.check("bulk").await?;

        let mut state = self.state.lock().await;
        for pair in lines.chunks(2) {
            let target = pair[0]["index"]["_index"].as_str().unwrap_or_default().to_string();
            let doc = pair
                .get(1)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            state.next_id += 1;
            let id = pair[0]["index"]["_id"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("auto-{}", state.next_id));
            let name = Self::resolve_name(&state, &target).ok_or_else(|| SearchError::bulk(1, 1))?;
            if let Some(stored) = state.indices.get_mut(&name) {
                stored.documents.push((id, doc));
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        body: Value,
        scroll: Option<&str>,
    ) -> Result<Value, SearchError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check("search").await?;

        let mut state = self.state.lock().await;
        let name = Self::resolve_name(&state, index).ok_or_else(|| {
            engine_error(404, "index_not_found_exception", index, "failed to search")
        })?;
        let documents = Self::score(state.indices[&name].documents.clone(), &body);
        let total = documents.len();
        let from = body["from"].as_u64().unwrap_or(0) as usize;
        let size = body["size"].as_u64().unwrap_or(10) as usize;

        let start = from.min(total);
        let end = (start + size).min(total);
        let first = documents[start..end].to_vec();

        let scroll_id = if scroll.is_some() {
            state.next_id += 1;
            let id = format!("scroll-{}", state.next_id);
            state.scrolls.insert(
                id.clone(),
                ScrollContext {
                    remaining: documents[end..].to_vec(),
                    page_size: size,
                    total,
                },
            );
            Some(id)
        } else {
            None
        };

        Ok(Self::page(&first, total, scroll_id.as_deref()))
    }

    async fn scroll(&self, scroll_id: &str, _keep_alive: &str) -> Result<Value, SearchError> {
        self.scroll_calls.fetch_add(1, Ordering::SeqCst);
        self.check("scroll").await?;

        let mut state = self.state.lock().await;
        let context = state.scrolls.get_mut(scroll_id).ok_or_else(|| {
            engine_error(
                404,
                "search_context_missing_exception",
                scroll_id,
                "failed to scroll documents",
            )
        })?;
        let take = context.page_size.min(context.remaining.len());
        let batch: Vec<(String, Document, f64)> = context.remaining.drain(..take).collect();
        Ok(Self::page(&batch, context.total, Some(scroll_id)))
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError> {
        self.cleared_scrolls.lock().await.push(scroll_id.to_string());
        self.check("clear_scroll").await?;
        self.state.lock().await.scrolls.remove(scroll_id);
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Value, SearchError> {
        let state = self.state.lock().await;
        let name = Self::resolve_name(&state, index).ok_or_else(|| {
            engine_error(404, "index_not_found_exception", index, "failed to get document by id")
        })?;
        state.indices[&name]
            .documents
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(doc_id, doc)| json!({ "_id": doc_id, "found": true, "_source": doc }))
            .ok_or_else(|| SearchError::not_found("document not found"))
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        partial: Value,
    ) -> Result<(), SearchError> {
        let mut state = self.state.lock().await;
        let name = Self::resolve_name(&state, index).ok_or_else(|| {
            engine_error(404, "index_not_found_exception", index, "failed to update document")
        })?;
        let stored = state
            .indices
            .get_mut(&name)
            .ok_or_else(|| SearchError::not_found("document not found"))?;
        let (_, doc) = stored
            .documents
            .iter_mut()
            .find(|(doc_id, _)| doc_id == id)
            .ok_or_else(|| {
                engine_error(
                    404,
                    "document_missing_exception",
                    id,
                    "failed to update document",
                )
            })?;
        if let Some(fields) = partial.as_object() {
            for (key, value) in fields {
                doc.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<(), SearchError> {
        let mut state = self.state.lock().await;
        let name = Self::resolve_name(&state, index).ok_or_else(|| {
            engine_error(404, "index_not_found_exception", index, "failed to delete document")
        })?;
        let stored = state
            .indices
            .get_mut(&name)
            .ok_or_else(|| SearchError::not_found("document not found"))?;
        let before = stored.documents.len();
        stored.documents.retain(|(doc_id, _)| doc_id != id);
        if stored.documents.len() == before {
            return Err(SearchError::not_found("document not found"));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        Ok(true)
    }
}
