//! CLI binary for research-article.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ArticleConfig` and prints the article.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use research_article::{
    generate_article, generate_to_file, ArticleConfig, ModelCatalog, PipelineProgressCallback,
    ProgressCallback, RecencyWindow, Source, SourceKind,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Renders a live chunk progress bar plus one log line per finished chunk.
struct CliProgressCallback {
    bar: ProgressBar,
    chunk_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner until the chunk count is known.
    fn new_dynamic(source: &Source) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Fetching");
        bar.set_message(match source.kind() {
            SourceKind::Query => "Searching news…",
            SourceKind::Document => "Reading PDF…",
        });
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            chunk_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Writing");
        self.bar.reset_eta();
    }

    fn chunk_elapsed(&self) -> f64 {
        self.chunk_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_fetch_complete(&self, words: usize, total_chunks: usize) {
        self.activate_bar(total_chunks);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{words} words fetched, {total_chunks} chunk(s) to write…"))
        ));
    }

    fn on_chunk_start(&self, chunk: usize, _total_chunks: usize) {
        if let Ok(mut t) = self.chunk_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!("chunk {chunk}: analysing"));
    }

    fn on_stage_complete(&self, chunk: usize, stage: &str, _output_len: usize) {
        self.bar
            .set_message(format!("chunk {chunk}: {stage} done"));
    }

    fn on_chunk_complete(&self, chunk: usize, total_chunks: usize, fragment_len: usize) {
        let elapsed = self.chunk_elapsed();
        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            chunk,
            total_chunks,
            dim(&format!("{fragment_len:>6} chars")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, chunk: usize, total_chunks: usize, error: &str) {
        let elapsed = self.chunk_elapsed();
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {}  {}",
            red("✗"),
            chunk,
            total_chunks,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.finish_and_clear();
    }

    fn on_article_complete(&self, total_chunks: usize, article_len: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Article written from {} chunk(s), {} chars",
            green("✔"),
            bold(&total_chunks.to_string()),
            article_len
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Article from a local PDF (stdout)
  research-article paper.pdf

  # Article from a PDF URL, written to a file
  research-article https://arxiv.org/pdf/1706.03762 -o attention.md

  # Article from this week's news
  research-article --query "rust in the linux kernel" --recency week

  # Smaller chunks, no tools, specific model
  research-article --max-words 2000 --no-tools --model gpt-4.1-mini paper.pdf

  # List the models the endpoint offers
  research-article --list-models

  # Endpoint without a model listing: skip the startup model check
  research-article --skip-model-check --models-url http://localhost:8000/v1 paper.pdf

  # JSON output with per-chunk fragments and stats
  research-article --json --query "webassembly" > article.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  TAVILY_API_KEY          Tavily search key (required for --query)
  OPENAI_BASE_URL         Base URL used by --list-models and the startup model check
  PDFIUM_LIB_PATH         Path to libpdfium (otherwise the system library is used)
"#;

/// Generate articles from PDFs or news searches using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "research-article",
    version,
    about = "Generate articles from PDFs or news searches using LLMs",
    long_about = "Generate a Markdown article from a PDF (local file or URL) or from a news \
search query. The text is split into chunks; each chunk is analysed and then written up by an \
LLM, and the fragments are joined into one article. Supports OpenAI, Anthropic, Google Gemini, \
Azure OpenAI, and any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    #[arg(conflicts_with = "query")]
    input: Option<String>,

    /// Write an article about this search query instead of a document.
    #[arg(long, short = 'Q')]
    query: Option<String>,

    /// Write the article to this file instead of stdout.
    #[arg(short, long, env = "RESEARCH_ARTICLE_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Maximum words per chunk.
    #[arg(long, env = "RESEARCH_ARTICLE_MAX_WORDS", default_value_t = 5000)]
    max_words: usize,

    /// Maximum PDF pages to read.
    #[arg(long, env = "RESEARCH_ARTICLE_MAX_PAGES", default_value_t = 10)]
    max_pages: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "RESEARCH_ARTICLE_PASSWORD")]
    password: Option<String>,

    /// How far back news searches look.
    #[arg(long, value_enum, default_value = "day")]
    recency: RecencyArg,

    /// Search results per query (1–20).
    #[arg(long, default_value_t = 10,
          value_parser = clap::value_parser!(u8).range(1..=20))]
    results: u8,

    /// Tavily search API key.
    #[arg(long, env = "TAVILY_API_KEY", hide_env_values = true)]
    search_api_key: Option<String>,

    /// Do not offer tools (read_document / search_web) to the model.
    #[arg(long)]
    no_tools: bool,

    /// Maximum tool-call rounds per stage.
    #[arg(long, default_value_t = 8)]
    max_tool_rounds: usize,

    /// Text file replacing the built-in extraction instructions.
    #[arg(long)]
    extraction_prompt: Option<PathBuf>,

    /// Text file replacing the built-in synthesis instructions.
    #[arg(long)]
    synthesis_prompt: Option<PathBuf>,

    /// Text file replacing the built-in writing instructions.
    #[arg(long)]
    writing_prompt: Option<PathBuf>,

    /// Max LLM output tokens per stage call.
    #[arg(long, env = "RESEARCH_ARTICLE_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "RESEARCH_ARTICLE_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Output structured JSON (ArticleOutput) instead of Markdown.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "RESEARCH_ARTICLE_NO_PROGRESS")]
    no_progress: bool,

    /// Print the model ids the endpoint offers and exit.
    #[arg(long)]
    list_models: bool,

    /// Do not check the model id against the endpoint's model list before fetching.
    #[arg(
        long,
        env = "RESEARCH_ARTICLE_SKIP_MODEL_CHECK",
        long_help = "Skip the startup model check. By default the model id is looked up in \
          GET {base}/models of the OpenAI-compatible endpoint and an unknown id fails before \
          anything is downloaded or searched. Use this for offline runs or endpoints without a \
          model listing."
    )]
    skip_model_check: bool,

    /// Base URL of the OpenAI-compatible models endpoint.
    #[arg(long, env = "OPENAI_BASE_URL")]
    models_url: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// Per-call LLM timeout in seconds.
    #[arg(long, default_value_t = 120)]
    api_timeout: u64,

    /// Search request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    search_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RecencyArg {
    Day,
    Week,
    Month,
    Year,
}

impl From<RecencyArg> for RecencyWindow {
    fn from(v: RecencyArg) -> Self {
        match v {
            RecencyArg::Day => RecencyWindow::Day,
            RecencyArg::Week => RecencyWindow::Week,
            RecencyArg::Month => RecencyWindow::Month,
            RecencyArg::Year => RecencyWindow::Year,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs would fight with the progress bar, so they are off while it runs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list_models;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Model listing ────────────────────────────────────────────────────
    if cli.list_models {
        let ids = catalog(&cli)?
            .list_models()
            .await
            .context("Failed to list models")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&ids).context("Failed to serialise model list")?
            );
        } else {
            for id in ids {
                println!("{id}");
            }
        }
        return Ok(());
    }

    let source = match (&cli.input, &cli.query) {
        (Some(input), None) => Source::document(input.clone()),
        (None, Some(query)) => Source::query(query.clone()),
        _ => anyhow::bail!("Provide a PDF path/URL or --query <QUERY>"),
    };

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic(&source);
        Some(cb as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Model check ──────────────────────────────────────────────────────
    let env_provider = std::env::var("EDGEQUAKE_LLM_PROVIDER").ok();
    let openai_key = std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty());
    if cli.skip_model_check {
        debug!("Model check skipped");
    } else if model_listing_applies(
        cli.provider.as_deref(),
        env_provider.as_deref(),
        openai_key,
        cli.models_url.is_some(),
    ) {
        catalog(&cli)?
            .ensure_model_available(&config.model_id())
            .await
            .context("Model check failed (pass --skip-model-check to run anyway)")?;
    } else {
        debug!("Provider has no OpenAI-compatible model listing; model check skipped");
    }

    // ── Run the pipeline ─────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let stats = generate_to_file(&source, output_path, &config)
            .await
            .context("Article generation failed")?;

        if !cli.quiet {
            eprintln!(
                "{}  {} chunk(s)  {} words in  {}ms  →  {}",
                green("✔"),
                stats.total_chunks,
                stats.fetched_words,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let output = generate_article(&source, &config)
            .await
            .context("Article generation failed")?;

        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        } else {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(output.article.as_bytes())
                .context("Failed to write to stdout")?;
            if !output.article.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }

        if !cli.quiet && !cli.json {
            eprintln!(
                "   {} chunk(s)  /  {} stage calls  —  {}ms total",
                dim(&output.stats.total_chunks.to_string()),
                dim(&output.stats.stage_calls.to_string()),
                output.stats.total_duration_ms,
            );
        }
    }

    Ok(())
}

/// Whether `GET {base}/models` describes the provider the run will use.
fn model_listing_applies(
    cli_provider: Option<&str>,
    env_provider: Option<&str>,
    openai_key: bool,
    models_url: bool,
) -> bool {
    if models_url {
        return true;
    }
    match cli_provider.or(env_provider).filter(|p| !p.is_empty()) {
        Some(provider) => provider.eq_ignore_ascii_case("openai"),
        None => openai_key,
    }
}

fn catalog(cli: &Cli) -> Result<ModelCatalog> {
    let catalog = match cli.models_url {
        Some(ref base) => ModelCatalog::new(
            base.clone(),
            std::env::var("OPENAI_API_KEY").ok(),
            cli.api_timeout,
        ),
        None => ModelCatalog::from_env(cli.api_timeout),
    };
    catalog.context("Failed to create models client")
}

async fn read_prompt(path: &Option<PathBuf>) -> Result<Option<String>> {
    match path {
        Some(p) => Ok(Some(
            tokio::fs::read_to_string(p)
                .await
                .with_context(|| format!("Failed to read prompt from {:?}", p))?,
        )),
        None => Ok(None),
    }
}

/// Map CLI args to `ArticleConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ArticleConfig> {
    let mut builder = ArticleConfig::builder()
        .max_words(cli.max_words)
        .max_pages(cli.max_pages)
        .recency(cli.recency.into())
        .result_limit(cli.results as usize)
        .offer_tools(!cli.no_tools)
        .max_tool_rounds(cli.max_tool_rounds)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout)
        .search_timeout_secs(cli.search_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(ref key) = cli.search_api_key {
        builder = builder.search_api_key(key.clone());
    }
    if let Some(text) = read_prompt(&cli.extraction_prompt).await? {
        builder = builder.extraction_instructions(text);
    }
    if let Some(text) = read_prompt(&cli.synthesis_prompt).await? {
        builder = builder.synthesis_instructions(text);
    }
    if let Some(text) = read_prompt(&cli.writing_prompt).await? {
        builder = builder.writing_instructions(text);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
