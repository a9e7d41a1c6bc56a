//! Bulk document transfer.
//!
//! Export walks a scroll cursor page by page up to a fixed page ceiling and an
//! optional deadline. Import accepts either a JSON array of documents or an
//! NDJSON bulk-action stream and writes it in a single bulk call.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::resolver::AliasResolver;
use search_gateway_repository::opensearch::queries::build_export_query;
use search_gateway_repository::{SearchEngine, SearchError, SearchPage};
use search_gateway_shared::{Document, ExportFormat};

/// Scroll lifetime requested for every export page.
pub const DEFAULT_KEEP_ALIVE: &str = "2m";

/// Documents fetched per export page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Maximum number of pages one export fetches, first page included.
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Export tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub page_size: usize,
    pub max_pages: usize,
    pub keep_alive: String,
    /// Stop scrolling once this much time has passed and return what was collected.
    pub deadline: Option<Duration>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            keep_alive: DEFAULT_KEEP_ALIVE.to_string(),
            deadline: None,
        }
    }
}

/// Engine-issued scroll cursor, owned by a single export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollCursor {
    pub id: String,
    pub keep_alive: String,
}

/// Why an export stopped collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStop {
    /// Every matching document was collected.
    Exhausted,
    /// The page ceiling was reached first.
    Ceiling,
    /// The deadline passed first.
    Deadline,
}

/// Documents collected by an export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportResult {
    /// Document bodies in engine order.
    pub documents: Vec<Document>,
    /// Matching documents reported by the engine.
    pub total: u64,
    pub pages: usize,
    pub stop: ExportStop,
}

impl ExportResult {
    pub fn is_partial(&self) -> bool {
        self.stop != ExportStop::Exhausted
    }
}

/// Export and import of whole document sets.
pub struct BulkTransferEngine {
    engine: Arc<dyn SearchEngine>,
    resolver: AliasResolver,
    config: TransferConfig,
}

impl BulkTransferEngine {
    pub fn new(engine: Arc<dyn SearchEngine>, resolver: AliasResolver, config: TransferConfig) -> Self {
        Self {
            engine,
            resolver,
            config,
        }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Export every document of `alias` matching `query` (match-everything when `None`).
    ///
    /// `deadline` bounds the scroll loop for this call. It is capped by the
    /// configured deadline, which also applies when the caller gives none.
    /// Hitting the page ceiling or the deadline is not an error: the documents
    /// collected so far are returned with the matching [`ExportStop`].
    ///
    /// The first page is always requested with a scroll cursor. When that page
    /// already holds every match the cursor is cleared straight away, so no
    /// context outlives the call.
    ///
    /// # Returns
    ///
    /// * `Ok(ExportResult)` - Collected documents and why collection stopped
    /// * `Err(SearchError)` - `not_found` for an unbound alias, or the engine failure
    #[instrument(skip(self, query))]
    pub async fn export(
        &self,
        alias: &str,
        query: Option<&Value>,
        deadline: Option<Duration>,
    ) -> Result<ExportResult, SearchError> {
        let started = Instant::now();
        let deadline = match (deadline, self.config.deadline) {
            (Some(requested), Some(limit)) => Some(requested.min(limit)),
            (requested, limit) => requested.or(limit),
        };
        let physical = self.resolver.resolve(alias).await?;

        let first = self
            .engine
            .search(
                &physical,
                build_export_query(query, self.config.page_size),
                Some(&self.config.keep_alive),
            )
            .await?;
        let first = SearchPage::parse(&first)?;

        let total = first.total;
        let mut result = ExportResult {
            documents: first.hits.into_iter().map(|hit| hit.source).collect(),
            total,
            pages: 1,
            stop: ExportStop::Exhausted,
        };

        if result.documents.len() as u64 >= total {
            if let Some(id) = first.scroll_id {
                self.release(&id).await;
            }
            info!(alias = %alias, documents = result.documents.len(), "Export fit in one page");
            return Ok(result);
        }

        let cursor = ScrollCursor {
            id: first
                .scroll_id
                .ok_or_else(|| SearchError::parse("failed to get scroll_id from response"))?,
            keep_alive: self.config.keep_alive.clone(),
        };

        let outcome = self.drain(cursor, started, deadline, &mut result).await;

        match outcome {
            Ok(last_id) => {
                self.release(&last_id).await;
                info!(
                    alias = %alias,
                    documents = result.documents.len(),
                    total = total,
                    pages = result.pages,
                    stop = ?result.stop,
                    "Export finished"
                );
                Ok(result)
            }
            Err((last_id, e)) => {
                self.release(&last_id).await;
                Err(e)
            }
        }
    }

    /// Fetch scroll pages into `result`. Returns the last cursor id seen so the
    /// caller can release it, on failure as well.
    async fn drain(
        &self,
        mut cursor: ScrollCursor,
        started: Instant,
        deadline: Option<Duration>,
        result: &mut ExportResult,
    ) -> Result<String, (String, SearchError)> {
        loop {
            if result.documents.len() as u64 >= result.total {
                result.stop = ExportStop::Exhausted;
                break;
            }
            if result.pages >= self.config.max_pages {
                result.stop = ExportStop::Ceiling;
                break;
            }
            if deadline.is_some_and(|deadline| started.elapsed() >= deadline) {
                result.stop = ExportStop::Deadline;
                break;
            }

            let page = match self.engine.scroll(&cursor.id, &cursor.keep_alive).await {
                Ok(page) => page,
                Err(e) => return Err((cursor.id, e)),
            };
            let page = match SearchPage::parse(&page) {
                Ok(page) => page,
                Err(e) => return Err((cursor.id, e)),
            };
            result.pages += 1;

            if page.hits.is_empty() {
                result.stop = ExportStop::Exhausted;
                break;
            }
            debug!(page = result.pages, hits = page.hits.len(), "Scroll page fetched");
            result
                .documents
                .extend(page.hits.into_iter().map(|hit| hit.source));

            match page.scroll_id {
                Some(id) if !id.is_empty() => cursor.id = id,
                _ => {
                    result.stop = ExportStop::Exhausted;
                    break;
                }
            }
        }

        Ok(cursor.id)
    }

    async fn release(&self, scroll_id: &str) {
        if let Err(e) = self.engine.clear_scroll(scroll_id).await {
            warn!(error = %e, "Failed to clear scroll");
        }
    }

    /// Index `documents` into the index bound to `alias` with one bulk call.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of documents sent
    /// * `Err(SearchError)` - `bad_request` for an empty set, `not_found` for an
    ///   unbound alias, `bulk_error` when the engine rejected items
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub async fn add_documents(
        &self,
        alias: &str,
        documents: Vec<Document>,
    ) -> Result<usize, SearchError> {
        if documents.is_empty() {
            return Err(SearchError::bad_request("data array cannot be empty"));
        }

        let physical = self.resolver.resolve(alias).await?;
        let count = documents.len();

        let mut lines = Vec::with_capacity(count * 2);
        for document in documents {
            lines.push(json!({ "index": { "_index": physical } }));
            lines.push(Value::Object(document));
        }

        self.engine.bulk(lines).await?;

        info!(alias = %alias, physical = %physical, count = count, "Documents indexed");
        Ok(count)
    }

    /// Import `content` into `alias`.
    ///
    /// `content` is an NDJSON bulk-action stream when `bulk` is set, otherwise
    /// a JSON array of documents. Malformed input fails before any engine write.
    /// Index names in bulk metadata lines are ignored; everything lands in `alias`.
    pub async fn import(&self, alias: &str, content: &str, bulk: bool) -> Result<usize, SearchError> {
        let documents = if bulk {
            parse_bulk_stream(content)?
        } else {
            parse_document_array(content)?
        };

        if documents.is_empty() {
            return Err(SearchError::bad_request("no documents to import"));
        }

        self.add_documents(alias, documents).await
    }
}

/// Render exported documents for download.
pub fn render_export(
    documents: &[Document],
    format: ExportFormat,
    alias: &str,
) -> Result<String, SearchError> {
    let marshal = |e: serde_json::Error| {
        SearchError::marshaling("failed to serialize export").with_details(e.to_string())
    };

    match format {
        ExportFormat::Documents => serde_json::to_string(documents).map_err(marshal),
        ExportFormat::Bulk => {
            let action = json!({ "index": { "_index": alias } }).to_string();
            let mut out = String::new();
            for document in documents {
                out.push_str(&action);
                out.push('\n');
                out.push_str(&serde_json::to_string(document).map_err(marshal)?);
                out.push('\n');
            }
            Ok(out)
        }
    }
}

/// Parse an NDJSON bulk-action stream into its document bodies.
///
/// Lines strictly alternate between an action line, which must be an object
/// with an `index` key, and a document object. Only trailing whitespace at the
/// end of the stream is ignored; a blank line inside it is malformed.
pub fn parse_bulk_stream(content: &str) -> Result<Vec<Document>, SearchError> {
    let mut lines = content.trim_end().lines();
    let mut documents = Vec::new();

    while let Some(meta) = lines.next() {
        let meta: Value = serde_json::from_str(meta).map_err(|e| {
            SearchError::bad_request("invalid metadata line in bulk JSON").with_details(e.to_string())
        })?;
        if !meta.as_object().is_some_and(|m| m.contains_key("index")) {
            return Err(SearchError::bad_request(
                "metadata line must contain an 'index' field",
            ));
        }

        let line = lines
            .next()
            .ok_or_else(|| SearchError::bad_request("missing document line in bulk JSON"))?;
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(document)) => documents.push(document),
            Ok(_) => return Err(SearchError::bad_request("invalid document line in bulk JSON")),
            Err(e) => {
                return Err(SearchError::bad_request("invalid document line in bulk JSON")
                    .with_details(e.to_string()))
            }
        }
    }

    Ok(documents)
}

/// Parse a JSON array of document objects.
pub fn parse_document_array(content: &str) -> Result<Vec<Document>, SearchError> {
    serde_json::from_str::<Vec<Document>>(content).map_err(|e| {
        SearchError::bad_request("invalid JSON document array").with_details(e.to_string())
    })
}
