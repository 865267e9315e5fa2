//! Offline integration tests for the article pipeline.
//!
//! The completion service and the content fetcher are replaced with stubs,
//! so these run without network access, API keys or a pdfium library.

use async_trait::async_trait;
use futures::StreamExt;
use research_article::{
    chunk_words, generate_stream, ArticleConfig, ArticleError, CompletionRequest,
    CompletionService, ContentFetcher, ErrorClass, Pipeline, PipelineProgressCallback,
    ServiceError, Source, SourceKind, StageSet, ToolSet,
};
use std::error::Error as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Stubs ────────────────────────────────────────────────────────────────────

enum StubFetcher {
    Text(String),
    Missing,
}

#[async_trait]
impl ContentFetcher for StubFetcher {
    async fn fetch(&self, _source: &Source) -> Result<String, ArticleError> {
        match self {
            StubFetcher::Text(t) => Ok(t.clone()),
            StubFetcher::Missing => Err(ArticleError::FileNotFound {
                path: PathBuf::from("missing.pdf"),
            }),
        }
    }
}

/// Analysis stages upper-case their input; the writer prefixes `ARTICLE: `
/// unless it has a script of replies to return in order.
#[derive(Default)]
struct ScriptedService {
    calls: Mutex<Vec<String>>,
    analysis_calls: AtomicUsize,
    writer_calls: AtomicUsize,
    fail_analysis_call: Option<usize>,
    writer_wraps_in_fence: bool,
    writer_script: Vec<&'static str>,
}

impl ScriptedService {
    fn failing_on_analysis(n: usize) -> Self {
        Self {
            fail_analysis_call: Some(n),
            ..Self::default()
        }
    }

    fn writing(script: &[&'static str]) -> Self {
        Self {
            writer_script: script.to_vec(),
            ..Self::default()
        }
    }

    fn stages_called(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    async fn complete(&self, r: CompletionRequest<'_>) -> Result<String, ServiceError> {
        self.calls.lock().unwrap().push(r.stage.to_string());

        if r.stage == "Writer Assistant" {
            let n = self.writer_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(reply) = self.writer_script.get(n) {
                return Ok(reply.to_string());
            }
            let body = format!("ARTICLE: {}", r.message);
            return Ok(if self.writer_wraps_in_fence {
                format!("```markdown\r\n{body}\r\n\r\n\r\n```\r\n")
            } else {
                body
            });
        }

        let n = self.analysis_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_analysis_call == Some(n) {
            return Err(ServiceError::Api {
                message: "500 Internal Server Error".into(),
            });
        }
        Ok(r.message.to_uppercase())
    }
}

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    fn push(&self, e: String) {
        self.events.lock().unwrap().push(e);
    }
}

impl PipelineProgressCallback for RecordingProgress {
    fn on_fetch_complete(&self, words: usize, total_chunks: usize) {
        self.push(format!("fetch {words} {total_chunks}"));
    }
    fn on_chunk_start(&self, chunk: usize, _total: usize) {
        self.push(format!("start {chunk}"));
    }
    fn on_stage_complete(&self, chunk: usize, stage: &str, _len: usize) {
        self.push(format!("stage {chunk} {stage}"));
    }
    fn on_chunk_complete(&self, chunk: usize, _total: usize, _len: usize) {
        self.push(format!("done {chunk}"));
    }
    fn on_chunk_error(&self, chunk: usize, _total: usize, _error: &str) {
        self.push(format!("error {chunk}"));
    }
    fn on_article_complete(&self, total_chunks: usize, _len: usize) {
        self.push(format!("article {total_chunks}"));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn numbered_words(n: usize) -> String {
    (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}

fn stages() -> StageSet {
    StageSet::from_config(&ArticleConfig::default(), ToolSet::new(), ToolSet::new())
}

fn pipeline(service: Arc<ScriptedService>, fetcher: StubFetcher, max_words: usize) -> Pipeline {
    Pipeline::new(service, Arc::new(fetcher), stages()).with_max_words(max_words)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn twelve_thousand_words_become_three_fragments() {
    let text = numbered_words(12_000);
    let service = Arc::new(ScriptedService::default());
    let p = pipeline(service.clone(), StubFetcher::Text(text.clone()), 5000);

    let output = p
        .generate_article(&Source::document("paper.pdf"))
        .await
        .unwrap();

    let expected: Vec<String> = chunk_words(&text, 5000)
        .iter()
        .map(|c| format!("ARTICLE: {}", c.to_uppercase()))
        .collect();
    assert_eq!(output.article, expected.join("\n\n"));
    assert_eq!(output.source, SourceKind::Document);

    let sizes: Vec<usize> = output.fragments.iter().map(|f| f.words).collect();
    assert_eq!(sizes, vec![5000, 5000, 2000]);
    assert_eq!(output.fragments[2].chunk, 3);

    assert_eq!(output.stats.fetched_words, 12_000);
    assert_eq!(output.stats.total_chunks, 3);
    assert_eq!(output.stats.stage_calls, 6);

    assert_eq!(
        service.stages_called(),
        vec![
            "PDF Assistant",
            "Writer Assistant",
            "PDF Assistant",
            "Writer Assistant",
            "PDF Assistant",
            "Writer Assistant",
        ]
    );
}

#[tokio::test]
async fn queries_go_through_the_synthesis_stage() {
    let service = Arc::new(ScriptedService::default());
    let p = pipeline(
        service.clone(),
        StubFetcher::Text("Search results for: rust\n\n1. Title: Rust news".into()),
        5000,
    );

    let output = p.generate_article(&Source::query("rust")).await.unwrap();

    assert_eq!(output.source, SourceKind::Query);
    assert_eq!(
        output.article,
        "ARTICLE: SEARCH RESULTS FOR: RUST 1. TITLE: RUST NEWS"
    );
    assert_eq!(
        service.stages_called(),
        vec!["Research Assistant", "Writer Assistant"]
    );
}

#[tokio::test]
async fn empty_fetch_is_no_content_and_calls_no_stage() {
    for text in ["", "   \n\t  "] {
        let service = Arc::new(ScriptedService::default());
        let p = pipeline(service.clone(), StubFetcher::Text(text.into()), 5000);

        let err = p
            .generate_article(&Source::query("nothing"))
            .await
            .unwrap_err();

        assert!(matches!(err, ArticleError::NoContentFound { .. }));
        assert_eq!(err.class(), ErrorClass::Fetch);
        assert!(service.stages_called().is_empty());
    }
}

#[tokio::test]
async fn fetch_errors_propagate_unchanged() {
    let service = Arc::new(ScriptedService::default());
    let p = pipeline(service.clone(), StubFetcher::Missing, 5000);

    let err = p
        .generate_article(&Source::document("missing.pdf"))
        .await
        .unwrap_err();

    assert!(matches!(err, ArticleError::FileNotFound { .. }));
    assert!(service.stages_called().is_empty());
}

#[tokio::test]
async fn stage_failure_on_chunk_two_aborts_the_run() {
    let service = Arc::new(ScriptedService::failing_on_analysis(2));
    let p = pipeline(service.clone(), StubFetcher::Text(numbered_words(12_000)), 5000);

    let err = p
        .generate_article(&Source::document("paper.pdf"))
        .await
        .unwrap_err();

    match &err {
        ArticleError::StageFailed {
            stage,
            chunk,
            total_chunks,
            ..
        } => {
            assert_eq!(stage, "PDF Assistant");
            assert_eq!(*chunk, 2);
            assert_eq!(*total_chunks, 3);
        }
        other => panic!("expected StageFailed, got {other:?}"),
    }
    assert!(err.is_stage_failure());

    let source = err.source().expect("service error is the source");
    assert!(source.to_string().contains("500 Internal Server Error"));

    // Chunk 3 is never started.
    assert_eq!(
        service.stages_called(),
        vec!["PDF Assistant", "Writer Assistant", "PDF Assistant"]
    );
}

#[tokio::test]
async fn writer_output_is_tidied_before_merge() {
    let service = Arc::new(ScriptedService {
        writer_wraps_in_fence: true,
        ..ScriptedService::default()
    });
    let p = pipeline(service, StubFetcher::Text("a b c d".into()), 2);

    let output = p
        .generate_article(&Source::document("paper.pdf"))
        .await
        .unwrap();

    assert_eq!(output.article, "ARTICLE: A B\n\nARTICLE: C D");
}

#[tokio::test]
async fn blank_writer_output_fails_the_chunk() {
    let service = Arc::new(ScriptedService::writing(&["A", "  \n ", "C"]));
    let p = pipeline(service.clone(), StubFetcher::Text("one two three".into()), 1);

    let err = p
        .generate_article(&Source::document("paper.pdf"))
        .await
        .unwrap_err();

    match &err {
        ArticleError::StageFailed {
            stage,
            chunk,
            total_chunks,
            source,
        } => {
            assert_eq!(stage, "Writer Assistant");
            assert_eq!(*chunk, 2);
            assert_eq!(*total_chunks, 3);
            assert!(matches!(source, ServiceError::EmptyOutput));
        }
        other => panic!("expected StageFailed, got {other:?}"),
    }
    // Chunk 3 is never started.
    assert_eq!(service.stages_called().len(), 4);
}

#[tokio::test]
async fn writer_markdown_is_kept_verbatim() {
    let reply = "See ![Architecture](figures/arch.png) and the table.\n## Results\nDone.";
    let service = Arc::new(ScriptedService::writing(&[reply]));
    let p = pipeline(service, StubFetcher::Text("architecture notes".into()), 5000);

    let output = p
        .generate_article(&Source::document("paper.pdf"))
        .await
        .unwrap();

    assert_eq!(output.article, reply);
}

#[tokio::test]
async fn progress_events_follow_chunk_order() {
    let progress = Arc::new(RecordingProgress::default());
    let p = pipeline(
        Arc::new(ScriptedService::default()),
        StubFetcher::Text("one two three".into()),
        2,
    )
    .with_progress(progress.clone());

    p.generate_article(&Source::query("numbers")).await.unwrap();

    let events = progress.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "fetch 3 2",
            "start 1",
            "stage 1 Research Assistant",
            "stage 1 Writer Assistant",
            "done 1",
            "start 2",
            "stage 2 Research Assistant",
            "stage 2 Writer Assistant",
            "done 2",
            "article 2",
        ]
    );
}

#[tokio::test]
async fn stream_yields_fragments_in_order() {
    let p = pipeline(
        Arc::new(ScriptedService::default()),
        StubFetcher::Text(numbered_words(25)),
        10,
    );

    let fragments: Vec<_> = generate_stream(&p, &Source::document("paper.pdf"))
        .await
        .unwrap()
        .collect()
        .await;

    let chunks: Vec<usize> = fragments
        .iter()
        .map(|f| f.as_ref().unwrap().chunk)
        .collect();
    assert_eq!(chunks, vec![1, 2, 3]);
    assert!(fragments[2].as_ref().unwrap().text.ends_with("W24"));
}

#[tokio::test]
async fn stream_stops_after_first_error() {
    let service = Arc::new(ScriptedService::failing_on_analysis(2));
    let p = pipeline(service.clone(), StubFetcher::Text(numbered_words(30)), 10);

    let items: Vec<_> = generate_stream(&p, &Source::document("paper.pdf"))
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert!(matches!(
        items[1],
        Err(ArticleError::StageFailed { chunk: 2, .. })
    ));
    assert_eq!(service.stages_called().len(), 3);
}

#[tokio::test]
async fn stream_of_empty_source_fails_up_front() {
    let p = pipeline(
        Arc::new(ScriptedService::default()),
        StubFetcher::Text(String::new()),
        10,
    );
    let result = generate_stream(&p, &Source::query("void")).await;
    assert!(matches!(result, Err(ArticleError::NoContentFound { .. })));
}

#[test]
fn pipeline_is_reusable_across_runs() {
    let service = Arc::new(ScriptedService::default());
    let p = pipeline(service.clone(), StubFetcher::Text("alpha beta".into()), 5000);

    let first = tokio_test::block_on(p.generate_article(&Source::document("a.pdf"))).unwrap();
    let second = tokio_test::block_on(p.clone().generate_article(&Source::query("b"))).unwrap();

    assert_eq!(first.article, "ARTICLE: ALPHA BETA");
    assert_eq!(second.article, first.article);
    assert_eq!(service.stages_called().len(), 4);
}
