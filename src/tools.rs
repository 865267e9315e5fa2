//! Callable capabilities offered to a stage.
//!
//! A [`Tool`] has a fixed name, a description, a JSON-schema for its
//! arguments and an async `call(args) -> String`. Stages carry a [`ToolSet`];
//! the completion service decides whether and how often to call them.

use crate::config::{ArticleConfig, RecencyWindow};
use crate::error::ServiceError;
use crate::pipeline::extract::{extract_document_text, DocumentExtractor};
use crate::pipeline::input::resolve_location;
use crate::pipeline::search::{format_results, SearchClient};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A named capability the model may invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Function name as shown to the model.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema describing the argument object.
    fn parameters(&self) -> Value;

    async fn call(&self, args: Value) -> Result<String, ServiceError>;
}

/// The tools offered to one stage.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any existing tool with the same name.
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    /// Dispatch a model tool call given its raw JSON argument string.
    pub async fn invoke(&self, name: &str, raw_args: &str) -> Result<String, ServiceError> {
        let tool = self.get(name).ok_or_else(|| ServiceError::UnknownTool {
            name: name.to_string(),
        })?;

        let args: Value = if raw_args.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(raw_args).map_err(|e| ServiceError::ToolFailed {
                name: name.to_string(),
                detail: format!("arguments are not valid JSON: {e}"),
            })?
        };

        debug!("Invoking tool '{}' with {}", name, args);
        tool.call(args).await
    }
}

fn required_str<'a>(tool: &str, args: &'a Value, key: &str) -> Result<&'a str, ServiceError> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ServiceError::ToolFailed {
            name: tool.to_string(),
            detail: format!("missing string argument '{key}'"),
        })
}

// ── search_web ───────────────────────────────────────────────────────────────

/// Runs a news search and returns the formatted results.
pub struct WebSearchTool {
    client: Arc<dyn SearchClient>,
    recency: RecencyWindow,
    limit: usize,
}

impl WebSearchTool {
    pub const NAME: &'static str = "search_web";

    pub fn new(client: Arc<dyn SearchClient>, recency: RecencyWindow, limit: usize) -> Self {
        Self {
            client,
            recency,
            limit,
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Search recent news and web pages. Returns titles, URLs, snippets, dates and sources."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "What to search for." },
                "recency": {
                    "type": "string",
                    "enum": ["day", "week", "month", "year"],
                    "description": "How far back to look."
                },
                "max_results": { "type": "integer", "minimum": 1, "maximum": 20 }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<String, ServiceError> {
        let query = required_str(Self::NAME, &args, "query")?;
        let recency = args
            .get("recency")
            .and_then(Value::as_str)
            .and_then(RecencyWindow::parse)
            .unwrap_or(self.recency);
        let limit = args
            .get("max_results")
            .and_then(Value::as_u64)
            .map(|n| (n as usize).clamp(1, 20))
            .unwrap_or(self.limit);

        let results = self
            .client
            .search(query, recency, limit)
            .await
            .map_err(|e| ServiceError::ToolFailed {
                name: Self::NAME.to_string(),
                detail: e.to_string(),
            })?;

        if results.is_empty() {
            return Ok(format!("No results found for '{query}'."));
        }
        Ok(format_results(query, &results))
    }
}

// ── read_document ────────────────────────────────────────────────────────────

/// Reads the text of a PDF the run is allowed to open.
///
/// Only locations in `allowed` are opened: the run's own document plus
/// whatever the caller listed in [`ArticleConfig::readable_documents`].
/// Anything else is a tool error.
pub struct DocumentReadTool {
    extractor: Arc<dyn DocumentExtractor>,
    allowed: Vec<String>,
    max_pages: usize,
    password: Option<String>,
    download_timeout_secs: u64,
}

impl DocumentReadTool {
    pub const NAME: &'static str = "read_document";

    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        allowed: Vec<String>,
        config: &ArticleConfig,
    ) -> Self {
        Self {
            extractor,
            allowed,
            max_pages: config.max_pages,
            password: config.password.clone(),
            download_timeout_secs: config.download_timeout_secs,
        }
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }
}

#[async_trait]
impl Tool for DocumentReadTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Extract the text of one of the listed PDFs, up to a page limit."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "enum": self.allowed,
                    "description": "File path or URL of the PDF."
                },
                "max_pages": { "type": "integer", "minimum": 1 }
            },
            "required": ["location"]
        })
    }

    async fn call(&self, args: Value) -> Result<String, ServiceError> {
        let location = required_str(Self::NAME, &args, "location")?.trim();
        let max_pages = args
            .get("max_pages")
            .and_then(Value::as_u64)
            .map(|n| (n as usize).max(1))
            .unwrap_or(self.max_pages);

        let failed = |detail: String| ServiceError::ToolFailed {
            name: Self::NAME.to_string(),
            detail,
        };

        if !self.allowed.iter().any(|a| a == location) {
            warn!("Refused read_document for '{}'", location);
            return Err(failed(format!(
                "'{location}' is not readable here; allowed: {}",
                self.allowed.join(", ")
            )));
        }

        let document = resolve_location(location, self.download_timeout_secs)
            .await
            .map_err(|e| failed(e.to_string()))?;
        let text = extract_document_text(
            Arc::clone(&self.extractor),
            document.path(),
            max_pages,
            self.password.as_deref(),
        )
        .await
        .map_err(|e| failed(e.to_string()))?;

        if text.trim().is_empty() {
            return Ok(format!("No text found in '{location}'."));
        }
        Ok(text)
    }
}
