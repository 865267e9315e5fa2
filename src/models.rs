//! Model listing against an OpenAI-compatible `GET {base}/models` endpoint.
//!
//! Used by the CLI's `--list-models` flag and its startup model check. The
//! pipeline itself never calls it.

use crate::error::ArticleError;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Base URL used when `OPENAI_BASE_URL` is not set.
pub const DEFAULT_MODELS_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// Client for the model listing endpoint.
#[derive(Clone)]
pub struct ModelCatalog {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for ModelCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCatalog")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ModelCatalog {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, ArticleError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ArticleError::Internal(format!("models client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// `OPENAI_BASE_URL` (or the OpenAI default) with `OPENAI_API_KEY`.
    pub fn from_env(timeout_secs: u64) -> Result<Self, ArticleError> {
        let base = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODELS_BASE.to_string());
        Self::new(base, std::env::var("OPENAI_API_KEY").ok(), timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Model ids offered by the endpoint, sorted.
    pub async fn list_models(&self) -> Result<Vec<String>, ArticleError> {
        let url = format!("{}/models", self.base_url);
        let unavailable = |hint: String| ArticleError::ProviderNotConfigured {
            provider: self.base_url.clone(),
            hint,
        };

        let mut request = self.http.get(&url).header("Accept", "application/json");
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| unavailable(format!("GET {url}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| unavailable(format!("GET {url}: {e}")))?;
        if !status.is_success() {
            return Err(unavailable(format!("GET {url}: HTTP {status}: {}", body.trim())));
        }

        let ids = parse_model_ids(&body).map_err(|e| unavailable(format!("bad response: {e}")))?;
        debug!("{} models listed at {}", ids.len(), self.base_url);
        Ok(ids)
    }

    /// Fail with [`ArticleError::InvalidModel`] unless `model` is listed.
    pub async fn ensure_model_available(&self, model: &str) -> Result<(), ArticleError> {
        let ids = self.list_models().await?;
        check_model(model, &ids)
    }
}

fn parse_model_ids(body: &str) -> Result<Vec<String>, serde_json::Error> {
    let response: ModelsResponse = serde_json::from_str(body)?;
    let mut ids: Vec<String> = response.data.into_iter().map(|m| m.id).collect();
    ids.sort();
    ids.dedup();
    Ok(ids)
}

fn check_model(model: &str, available: &[String]) -> Result<(), ArticleError> {
    if available.iter().any(|id| id == model) {
        return Ok(());
    }
    Err(ArticleError::InvalidModel {
        model: model.to_string(),
        available: if available.is_empty() {
            "(none listed)".to_string()
        } else {
            available.join(", ")
        },
    })
}
