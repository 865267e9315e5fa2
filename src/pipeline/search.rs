//! Web/news search: the query side of the content fetcher.
//!
//! [`SearchClient`] is the seam; [`TavilySearchClient`] talks to the Tavily
//! search API. Results are rendered into plain text by [`format_results`]
//! so the rest of the pipeline treats a search exactly like a document.

use crate::config::RecencyWindow;
use crate::error::ArticleError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable holding the Tavily API key.
pub const TAVILY_API_KEY_ENV: &str = "TAVILY_API_KEY";

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Runs a news search. An empty result list is not an error.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(
        &self,
        query: &str,
        recency: RecencyWindow,
        limit: usize,
    ) -> Result<Vec<SearchResult>, ArticleError>;
}

/// [`SearchClient`] over the Tavily HTTP API.
#[derive(Clone)]
pub struct TavilySearchClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl std::fmt::Debug for TavilySearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilySearchClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl TavilySearchClient {
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> Result<Self, ArticleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ArticleError::Internal(format!("search client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: TAVILY_ENDPOINT.to_string(),
        })
    }

    /// Use an explicit key, falling back to `TAVILY_API_KEY`.
    pub fn from_key_or_env(
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, ArticleError> {
        let key = pick_key(api_key, std::env::var(TAVILY_API_KEY_ENV).ok())?;
        Self::new(key, timeout_secs)
    }

    /// Point the client at a different endpoint (proxies, test servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

fn pick_key(explicit: Option<&str>, from_env: Option<String>) -> Result<String, ArticleError> {
    explicit
        .filter(|k| !k.trim().is_empty())
        .map(str::to_string)
        .or_else(|| from_env.filter(|k| !k.trim().is_empty()))
        .ok_or_else(|| ArticleError::MissingCredential {
            service: "Tavily search".into(),
            env_var: TAVILY_API_KEY_ENV.into(),
        })
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    topic: &'static str,
    time_range: &'static str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Debug, Deserialize)]
struct TavilyHit {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    published_date: Option<String>,
}

impl From<TavilyHit> for SearchResult {
    fn from(hit: TavilyHit) -> Self {
        let source = source_from_url(&hit.url);
        SearchResult {
            title: hit.title.trim().to_string(),
            url: hit.url,
            snippet: hit.content.trim().to_string(),
            date: hit.published_date.filter(|d| !d.trim().is_empty()),
            source,
        }
    }
}

/// Host name of the result URL without a leading `www.`.
fn source_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

fn parse_response(body: &str, limit: usize) -> Result<Vec<SearchResult>, serde_json::Error> {
    let response: TavilyResponse = serde_json::from_str(body)?;
    Ok(response
        .results
        .into_iter()
        .take(limit)
        .map(SearchResult::from)
        .collect())
}

#[async_trait]
impl SearchClient for TavilySearchClient {
    async fn search(
        &self,
        query: &str,
        recency: RecencyWindow,
        limit: usize,
    ) -> Result<Vec<SearchResult>, ArticleError> {
        info!("Searching news for '{}' (past {}, ≤{} results)", query, recency.as_str(), limit);

        let failed = |reason: String| ArticleError::SearchFailed {
            query: query.to_string(),
            reason,
        };

        let request = TavilyRequest {
            query,
            topic: "news",
            time_range: recency.as_str(),
            max_results: limit,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| failed(e.to_string()))?;
        if !status.is_success() {
            return Err(failed(format!("HTTP {}: {}", status, body.trim())));
        }

        let results = parse_response(&body, limit).map_err(|e| failed(e.to_string()))?;
        debug!("Search returned {} results", results.len());
        Ok(results)
    }
}

/// Render search results as the raw text handed to the synthesis stage.
///
/// Returns an empty string for no results so the caller can report
/// "no content" instead of sending an empty prompt.
pub fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return String::new();
    }

    let mut out = format!("Search results for: {}\n", query);
    for (i, r) in results.iter().enumerate() {
        out.push_str(&format!("\n{}. Title: {}\n", i + 1, r.title));
        out.push_str(&format!("URL: {}\n", r.url));
        out.push_str(&format!("Description: {}\n", r.snippet));
        if let Some(ref date) = r.date {
            out.push_str(&format!("Date: {}\n", date));
        }
        if let Some(ref source) = r.source {
            out.push_str(&format!("Source: {}\n", source));
        }
    }
    out
}
