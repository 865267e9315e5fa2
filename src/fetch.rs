//! Content fetching: turn a [`Source`] into raw text.
//!
//! Documents are resolved to a local PDF and their text layer extracted.
//! Queries go to the search client and the hits are rendered as plain text.
//! Both paths end in a `String`, so nothing downstream cares which one ran.

use crate::config::{ArticleConfig, RecencyWindow};
use crate::error::ArticleError;
use crate::output::SourceKind;
use crate::pipeline::extract::{extract_document_text, DocumentExtractor};
use crate::pipeline::input::{resolve_bytes, resolve_location};
use crate::pipeline::search::{format_results, SearchClient, TAVILY_API_KEY_ENV};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Where a document comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Local path or HTTP(S) URL.
    Location(String),
    /// PDF bytes already in memory.
    Bytes(Vec<u8>),
}

impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Location(loc) => f.debug_tuple("Location").field(loc).finish(),
            DocumentSource::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
        }
    }
}

/// The input of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Query(String),
    Document(DocumentSource),
}

impl Source {
    pub fn query(q: impl Into<String>) -> Self {
        Source::Query(q.into())
    }

    /// A document at a local path or URL.
    pub fn document(location: impl Into<String>) -> Self {
        Source::Document(DocumentSource::Location(location.into()))
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Source::Document(DocumentSource::Bytes(bytes.into()))
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Query(_) => SourceKind::Query,
            Source::Document(_) => SourceKind::Document,
        }
    }

    /// Short human-readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            Source::Query(q) => format!("query '{}'", q),
            Source::Document(DocumentSource::Location(loc)) => format!("document {}", loc),
            Source::Document(DocumentSource::Bytes(b)) => {
                format!("uploaded document ({} bytes)", b.len())
            }
        }
    }
}

/// Produces the raw text for a source. Empty text is returned as-is; the
/// orchestrator decides that it means "no content".
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, source: &Source) -> Result<String, ArticleError>;
}

/// [`ContentFetcher`] over a search client and a document extractor.
pub struct SourceFetcher {
    search: Option<Arc<dyn SearchClient>>,
    extractor: Arc<dyn DocumentExtractor>,
    max_pages: usize,
    password: Option<String>,
    recency: RecencyWindow,
    result_limit: usize,
    download_timeout_secs: u64,
}

impl SourceFetcher {
    /// `search` may be `None` when only documents will be fetched.
    pub fn new(
        search: Option<Arc<dyn SearchClient>>,
        extractor: Arc<dyn DocumentExtractor>,
        config: &ArticleConfig,
    ) -> Self {
        Self {
            search,
            extractor,
            max_pages: config.max_pages,
            password: config.password.clone(),
            recency: config.recency,
            result_limit: config.result_limit,
            download_timeout_secs: config.download_timeout_secs,
        }
    }

    async fn fetch_document(&self, doc: &DocumentSource) -> Result<String, ArticleError> {
        let resolved = match doc {
            DocumentSource::Location(loc) => {
                resolve_location(loc, self.download_timeout_secs).await?
            }
            DocumentSource::Bytes(bytes) => resolve_bytes(bytes)?,
        };

        let text = extract_document_text(
            Arc::clone(&self.extractor),
            resolved.path(),
            self.max_pages,
            self.password.as_deref(),
        )
        .await?;

        info!(
            "Extracted {} bytes of text from {}",
            text.len(),
            resolved.path().display()
        );
        Ok(text)
    }

    async fn fetch_query(&self, query: &str) -> Result<String, ArticleError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ArticleError::InvalidInput {
                input: query.to_string(),
            });
        }
        let search = self
            .search
            .as_ref()
            .ok_or_else(|| ArticleError::MissingCredential {
                service: "Tavily search".into(),
                env_var: TAVILY_API_KEY_ENV.into(),
            })?;

        let results = search.search(query, self.recency, self.result_limit).await?;
        if results.is_empty() {
            warn!("Search for '{}' returned no results", query);
        }
        Ok(format_results(query, &results))
    }
}

#[async_trait]
impl ContentFetcher for SourceFetcher {
    async fn fetch(&self, source: &Source) -> Result<String, ArticleError> {
        match source {
            Source::Query(q) => self.fetch_query(q).await,
            Source::Document(doc) => self.fetch_document(doc).await,
        }
    }
}
