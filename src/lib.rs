//! # research-article
//!
//! Generate articles from a PDF or a news search using LLMs.
//!
//! Give it a document (local path, URL or bytes) or a search query. The text
//! is fetched, split into word-bounded chunks, and each chunk goes through
//! two model stages: an analysis stage that organises the raw material and a
//! writing stage that turns it into publishable Markdown. The fragments are
//! joined into one article.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source
//!  │
//!  ├─ 1. Fetch    PDF text via pdfium, or news search results via Tavily
//!  ├─ 2. Chunk    ≤ max_words words per chunk (default 5000)
//!  ├─ 3. Analyse  "PDF Assistant" (documents) / "Research Assistant" (queries)
//!  ├─ 4. Write    "Writer Assistant", one fragment per chunk
//!  ├─ 5. Tidy     strip fences, normalise whitespace
//!  └─ 6. Merge    fragments joined by one blank line, in chunk order
//! ```
//!
//! Chunks are processed strictly one after another. Any failure aborts the
//! run; there is no partial article.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use research_article::{generate_article, ArticleConfig, Source};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     // Query sources also need TAVILY_API_KEY.
//!     let config = ArticleConfig::default();
//!     let output = generate_article(&Source::document("paper.pdf"), &config).await?;
//!     println!("{}", output.article);
//!     eprintln!("{} chunks, {} words", output.stats.total_chunks, output.stats.fetched_words);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `research-article` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! research-article = { version = "0.1", default-features = false }
//! ```
//!
//! ## Plugging in your own collaborators
//!
//! [`Pipeline::new`] takes any [`CompletionService`] and [`ContentFetcher`],
//! which is how the integration tests run fully offline.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod fetch;
pub mod generate;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod service;
pub mod stage;
pub mod stream;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ArticleConfig, ArticleConfigBuilder, RecencyWindow};
pub use error::{ArticleError, ErrorClass, ServiceError};
pub use fetch::{ContentFetcher, DocumentSource, Source, SourceFetcher};
pub use generate::{generate_article, generate_article_sync, generate_to_file, Pipeline};
pub use models::ModelCatalog;
pub use output::{ArticleOutput, ArticleStats, Fragment, SourceKind};
pub use pipeline::chunk::chunk_words;
pub use pipeline::llm::run_stage;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use service::{CompletionRequest, CompletionService, LlmCompletionService};
pub use stage::{StageRole, StageSet, StageSpec};
pub use stream::{generate_article_stream, generate_stream, FragmentStream};
pub use tools::{Tool, ToolSet};
