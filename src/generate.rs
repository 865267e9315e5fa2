//! Top-level article generation.
//!
//! [`Pipeline`] sequences the run: fetch raw text, chunk it, put every chunk
//! through its analysis stage and then the writing stage, tidy each fragment
//! and join them. Chunks are processed one at a time in order and the first
//! error aborts the run; there is no partial article.
//!
//! The free functions build a [`Pipeline`] from an [`ArticleConfig`] and run
//! it once. Build the pipeline yourself to reuse it across runs or to plug in
//! a different [`CompletionService`] or [`ContentFetcher`].

use crate::config::ArticleConfig;
use crate::error::{ArticleError, ServiceError};
use crate::fetch::{ContentFetcher, DocumentSource, Source, SourceFetcher};
use crate::output::{merge_fragments, ArticleOutput, ArticleStats, Fragment, SourceKind};
use crate::pipeline::chunk::{chunk_words, word_count};
use crate::pipeline::extract::{DocumentExtractor, PdfiumExtractor};
use crate::pipeline::llm::run_stage;
use crate::pipeline::postprocess::tidy_fragment;
use crate::pipeline::search::{SearchClient, TavilySearchClient};
use crate::progress::ProgressCallback;
use crate::service::{CompletionService, LlmCompletionService};
use crate::stage::{StageSet, StageSpec};
use crate::tools::{DocumentReadTool, ToolSet, WebSearchTool};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Default chunk size in words.
pub const DEFAULT_MAX_WORDS: usize = 5000;

/// A ready-to-run pipeline. Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct Pipeline {
    service: Arc<dyn CompletionService>,
    fetcher: Arc<dyn ContentFetcher>,
    stages: Arc<StageSet>,
    max_words: usize,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .field("max_words", &self.max_words)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        service: Arc<dyn CompletionService>,
        fetcher: Arc<dyn ContentFetcher>,
        stages: StageSet,
    ) -> Self {
        Self {
            service,
            fetcher,
            stages: Arc::new(stages),
            max_words: DEFAULT_MAX_WORDS,
            progress: None,
        }
    }

    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words.max(1);
        self
    }

    pub fn with_progress(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    pub fn stages(&self) -> &StageSet {
        &self.stages
    }

    /// Wire the real collaborators described by `config` for runs on `source`.
    ///
    /// Providers are built here and, for document sources, pdfium is bound
    /// here, so credential and library problems are reported before anything
    /// is fetched. Whether the provider actually serves the model id is not
    /// checked; call [`crate::ModelCatalog::ensure_model_available`] first
    /// for that (the CLI does so unless `--skip-model-check` is given).
    ///
    /// The search client is mandatory for query sources only. For documents
    /// a missing key just means the synthesis stage gets no `search_web`
    /// tool. `read_document` may open the source's own location and the
    /// entries of [`ArticleConfig::readable_documents`], nothing else.
    pub fn from_config(config: &ArticleConfig, source: &Source) -> Result<Self, ArticleError> {
        let search: Option<Arc<dyn SearchClient>> = match TavilySearchClient::from_key_or_env(
            config.search_api_key.as_deref(),
            config.search_timeout_secs,
        ) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) if source.kind() == SourceKind::Query => return Err(e),
            Err(e) => {
                debug!("Search disabled: {}", e);
                None
            }
        };

        let pdfium = PdfiumExtractor::from_env();
        if source.kind() == SourceKind::Document {
            pdfium.ensure_bound()?;
        }
        let extractor: Arc<dyn DocumentExtractor> = Arc::new(pdfium);

        let mut extraction_tools = ToolSet::new();
        let mut synthesis_tools = ToolSet::new();
        if config.offer_tools {
            let readable = readable_locations(config, source);
            if !readable.is_empty() {
                extraction_tools = extraction_tools.with(Arc::new(DocumentReadTool::new(
                    Arc::clone(&extractor),
                    readable,
                    config,
                )));
            }
            if let Some(ref client) = search {
                synthesis_tools = synthesis_tools.with(Arc::new(WebSearchTool::new(
                    Arc::clone(client),
                    config.recency,
                    config.result_limit,
                )));
            }
        }

        let stages = StageSet::from_config(config, extraction_tools, synthesis_tools);
        let service = LlmCompletionService::from_config(config, stages.models())?;
        let fetcher = SourceFetcher::new(search, extractor, config);

        let mut pipeline = Self::new(Arc::new(service), Arc::new(fetcher), stages)
            .with_max_words(config.max_words);
        if let Some(ref cb) = config.progress_callback {
            pipeline = pipeline.with_progress(Arc::clone(cb));
        }
        Ok(pipeline)
    }

    /// Fetch the source text and split it into chunks.
    ///
    /// Text with no words is [`ArticleError::NoContentFound`].
    pub async fn fetch_chunks(&self, source: &Source) -> Result<(usize, Vec<String>), ArticleError> {
        let raw = self.fetcher.fetch(source).await?;
        let words = word_count(&raw);
        if words == 0 {
            return Err(ArticleError::NoContentFound {
                origin: source.describe(),
            });
        }

        let chunks = chunk_words(&raw, self.max_words);
        info!(
            "Fetched {} words from {}, {} chunk(s) of ≤{} words",
            words,
            source.describe(),
            chunks.len(),
            self.max_words
        );
        if let Some(ref cb) = self.progress {
            cb.on_fetch_complete(words, chunks.len());
        }
        Ok((words, chunks))
    }

    async fn run(
        &self,
        spec: &StageSpec,
        input: &str,
        chunk: usize,
        total_chunks: usize,
    ) -> Result<String, ArticleError> {
        match run_stage(self.service.as_ref(), spec, input).await {
            Ok(output) => {
                if let Some(ref cb) = self.progress {
                    cb.on_stage_complete(chunk, &spec.name, output.len());
                }
                Ok(output)
            }
            Err(source) => Err(self.stage_failed(spec, chunk, total_chunks, source)),
        }
    }

    fn stage_failed(
        &self,
        spec: &StageSpec,
        chunk: usize,
        total_chunks: usize,
        source: ServiceError,
    ) -> ArticleError {
        if let Some(ref cb) = self.progress {
            cb.on_chunk_error(chunk, total_chunks, &source.to_string());
        }
        ArticleError::StageFailed {
            stage: spec.name.clone(),
            chunk,
            total_chunks,
            source,
        }
    }

    /// Analyse and write one chunk (1-indexed) into a tidied fragment.
    pub(crate) async fn write_chunk(
        &self,
        kind: SourceKind,
        chunk: usize,
        total_chunks: usize,
        text: &str,
    ) -> Result<Fragment, ArticleError> {
        let start = Instant::now();
        if let Some(ref cb) = self.progress {
            cb.on_chunk_start(chunk, total_chunks);
        }

        let analysis_spec = self.stages.analysis_for(kind);
        let analysis = self.run(analysis_spec, text, chunk, total_chunks).await?;
        let written = self
            .run(&self.stages.writing, &analysis, chunk, total_chunks)
            .await?;
        let fragment_text = tidy_fragment(&written);
        // An empty fragment would leave a double blank line in the merge.
        if fragment_text.is_empty() {
            return Err(self.stage_failed(
                &self.stages.writing,
                chunk,
                total_chunks,
                ServiceError::EmptyOutput,
            ));
        }

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            "Chunk {}/{}: {} → {} → {} bytes in {}ms",
            chunk,
            total_chunks,
            analysis_spec.name,
            self.stages.writing.name,
            fragment_text.len(),
            elapsed
        );
        if let Some(ref cb) = self.progress {
            cb.on_chunk_complete(chunk, total_chunks, fragment_text.len());
        }

        Ok(Fragment {
            chunk,
            words: word_count(text),
            analysis,
            text: fragment_text,
            duration_ms: elapsed,
        })
    }

    /// Run the whole pipeline for `source`.
    pub async fn generate_article(&self, source: &Source) -> Result<ArticleOutput, ArticleError> {
        let total_start = Instant::now();
        info!("Generating article from {}", source.describe());

        let fetch_start = Instant::now();
        let (fetched_words, chunks) = self.fetch_chunks(source).await?;
        let fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;

        let kind = source.kind();
        let total_chunks = chunks.len();
        let mut fragments = Vec::with_capacity(total_chunks);
        let mut stage_duration_ms = 0u64;

        for (i, text) in chunks.iter().enumerate() {
            let fragment = self.write_chunk(kind, i + 1, total_chunks, text).await?;
            stage_duration_ms += fragment.duration_ms;
            fragments.push(fragment);
        }

        let article = merge_fragments(&fragments);
        if let Some(ref cb) = self.progress {
            cb.on_article_complete(total_chunks, article.len());
        }

        let stats = ArticleStats {
            fetched_words,
            total_chunks,
            stage_calls: total_chunks * 2,
            fetch_duration_ms,
            stage_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Article ready: {} chunk(s), {} bytes, {}ms",
            total_chunks,
            article.len(),
            stats.total_duration_ms
        );

        Ok(ArticleOutput {
            article,
            source: kind,
            fragments,
            stats,
        })
    }
}

/// Locations `read_document` may open: the configured ones plus the run's
/// own document when it has a location.
fn readable_locations(config: &ArticleConfig, source: &Source) -> Vec<String> {
    let mut readable = config.readable_documents.clone();
    if let Source::Document(DocumentSource::Location(loc)) = source {
        let loc = loc.trim();
        if !readable.iter().any(|r| r == loc) {
            readable.push(loc.to_string());
        }
    }
    readable
}

/// Generate an article from `source` using the collaborators `config`
/// describes.
///
/// # Example
/// ```rust,no_run
/// use research_article::{generate_article, ArticleConfig, Source};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ArticleConfig::default();
/// let output = generate_article(&Source::query("rust async runtimes"), &config).await?;
/// println!("{}", output.article);
/// # Ok(())
/// # }
/// ```
pub async fn generate_article(
    source: &Source,
    config: &ArticleConfig,
) -> Result<ArticleOutput, ArticleError> {
    let pipeline = Pipeline::from_config(config, source)?;
    pipeline.generate_article(source).await
}

/// Synchronous wrapper around [`generate_article`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_article_sync(
    source: &Source,
    config: &ArticleConfig,
) -> Result<ArticleOutput, ArticleError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ArticleError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_article(source, config))
}

/// Generate an article and write it to `output_path`.
///
/// The file is written to a temporary sibling first and renamed into place,
/// so a failed run never leaves a half-written article behind.
pub async fn generate_to_file(
    source: &Source,
    output_path: impl AsRef<Path>,
    config: &ArticleConfig,
) -> Result<ArticleStats, ArticleError> {
    let output = generate_article(source, config).await?;
    write_atomically(output_path.as_ref(), &output.article).await?;
    Ok(output.stats)
}

pub(crate) async fn write_atomically(path: &Path, contents: &str) -> Result<(), ArticleError> {
    let failed = |e: std::io::Error| ArticleError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(failed)?;
        }
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents).await.map_err(failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(failed)?;
    Ok(())
}
