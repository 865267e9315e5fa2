//! Configuration types for article generation.
//!
//! Every knob of a run lives in [`ArticleConfig`], built via its
//! [`ArticleConfigBuilder`]. Model selection is part of the config and is
//! passed explicitly into each run; nothing is held in process-wide state.

use crate::error::ArticleError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Environment variable naming the model when the config leaves it unset.
pub const MODEL_ENV: &str = "EDGEQUAKE_MODEL";

/// Configuration for one or more article-generation runs.
///
/// Built via [`ArticleConfig::builder()`] or using
/// [`ArticleConfig::default()`].
///
/// # Example
/// ```rust
/// use research_article::{ArticleConfig, RecencyWindow};
///
/// let config = ArticleConfig::builder()
///     .model("gpt-4.1-mini")
///     .max_words(3000)
///     .recency(RecencyWindow::Week)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ArticleConfig {
    /// LLM model identifier used by every stage. If None, `EDGEQUAKE_MODEL`
    /// and then [`DEFAULT_MODEL`] apply.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for every completion. Default: 0.3.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per stage call. Default: 4096.
    pub max_tokens: usize,

    /// Word budget per chunk. Default: 5000.
    ///
    /// Word count stands in for token count. It is an approximation: dense
    /// technical text tokenises to more tokens per word than prose, so leave
    /// headroom below the model's real context window.
    pub max_words: usize,

    /// Pages read from a document source. Default: 10.
    pub max_pages: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// How far back news searches look. Default: [`RecencyWindow::Day`].
    pub recency: RecencyWindow,

    /// Maximum search results per query. Range: 1–20. Default: 10.
    pub result_limit: usize,

    /// Offer `read_document` / `search_web` tools to the analysis stages. Default: true.
    pub offer_tools: bool,

    /// Upper bound on tool-call rounds within one stage call. Default: 8.
    pub max_tool_rounds: usize,

    /// Extra PDF paths or URLs the `read_document` tool may open, besides
    /// the run's own document. Anything else the model asks for is refused.
    pub readable_documents: Vec<String>,

    /// Custom instructions for the document extraction stage.
    pub extraction_instructions: Option<String>,

    /// Custom instructions for the search synthesis stage.
    pub synthesis_instructions: Option<String>,

    /// Custom instructions for the writing stage.
    pub writing_instructions: Option<String>,

    /// Search API key. If None, read from `TAVILY_API_KEY`.
    pub search_api_key: Option<String>,

    /// Download timeout for URL documents in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-completion-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Per-search-request timeout in seconds. Default: 30.
    pub search_timeout_secs: u64,

    /// Receives per-chunk progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ArticleConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 4096,
            max_words: 5000,
            max_pages: 10,
            password: None,
            recency: RecencyWindow::default(),
            result_limit: 10,
            offer_tools: true,
            max_tool_rounds: 8,
            readable_documents: Vec::new(),
            extraction_instructions: None,
            synthesis_instructions: None,
            writing_instructions: None,
            search_api_key: None,
            download_timeout_secs: 120,
            api_timeout_secs: 120,
            search_timeout_secs: 30,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ArticleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticleConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_words", &self.max_words)
            .field("max_pages", &self.max_pages)
            .field("recency", &self.recency)
            .field("result_limit", &self.result_limit)
            .field("offer_tools", &self.offer_tools)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("readable_documents", &self.readable_documents)
            .field("search_api_key", &self.search_api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl ArticleConfig {
    /// Create a new builder for `ArticleConfig`.
    pub fn builder() -> ArticleConfigBuilder {
        ArticleConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model every stage targets.
    pub fn model_id(&self) -> String {
        pick_model(self.model.as_deref(), std::env::var(MODEL_ENV).ok())
    }
}

fn pick_model(configured: Option<&str>, from_env: Option<String>) -> String {
    configured
        .map(str::to_string)
        .or_else(|| from_env.filter(|m| !m.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

/// Builder for [`ArticleConfig`].
pub struct ArticleConfigBuilder {
    config: ArticleConfig,
}

impl fmt::Debug for ArticleConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticleConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ArticleConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_words(mut self, n: usize) -> Self {
        self.config.max_words = n.max(1);
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n.max(1);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn recency(mut self, window: RecencyWindow) -> Self {
        self.config.recency = window;
        self
    }

    pub fn result_limit(mut self, n: usize) -> Self {
        self.config.result_limit = n.clamp(1, 20);
        self
    }

    pub fn offer_tools(mut self, v: bool) -> Self {
        self.config.offer_tools = v;
        self
    }

    pub fn max_tool_rounds(mut self, n: usize) -> Self {
        self.config.max_tool_rounds = n;
        self
    }

    /// Allow `read_document` to open `location` as well.
    pub fn readable_document(mut self, location: impl Into<String>) -> Self {
        self.config.readable_documents.push(location.into());
        self
    }

    pub fn extraction_instructions(mut self, text: impl Into<String>) -> Self {
        self.config.extraction_instructions = Some(text.into());
        self
    }

    pub fn synthesis_instructions(mut self, text: impl Into<String>) -> Self {
        self.config.synthesis_instructions = Some(text.into());
        self
    }

    pub fn writing_instructions(mut self, text: impl Into<String>) -> Self {
        self.config.writing_instructions = Some(text.into());
        self
    }

    pub fn search_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.search_api_key = Some(key.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn search_timeout_secs(mut self, secs: u64) -> Self {
        self.config.search_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ArticleConfig, ArticleError> {
        let c = &self.config;
        if c.max_words == 0 {
            return Err(ArticleError::InvalidConfig(
                "max_words must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(ArticleError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if let Some(model) = &c.model {
            if model.trim().is_empty() {
                return Err(ArticleError::InvalidConfig(
                    "model id must not be empty".into(),
                ));
            }
        }
        if c.api_timeout_secs == 0 || c.search_timeout_secs == 0 || c.download_timeout_secs == 0 {
            return Err(ArticleError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How far back a news search looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecencyWindow {
    /// Past 24 hours. (default)
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl RecencyWindow {
    /// Wire value understood by the search API.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecencyWindow::Day => "day",
            RecencyWindow::Week => "week",
            RecencyWindow::Month => "month",
            RecencyWindow::Year => "year",
        }
    }

    /// Parse the short forms used on the command line and in tool arguments.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "d" | "day" => Some(RecencyWindow::Day),
            "w" | "week" => Some(RecencyWindow::Week),
            "m" | "month" => Some(RecencyWindow::Month),
            "y" | "year" => Some(RecencyWindow::Year),
            _ => None,
        }
    }
}
