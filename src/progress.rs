//! Progress-callback trait for per-chunk pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::ArticleConfigBuilder::progress_callback`] to receive
//! events as the pipeline fetches content and works through each chunk.
//!
//! # Example
//!
//! ```rust
//! use research_article::{ArticleConfig, PipelineProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, chunk: usize, total_chunks: usize, fragment_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Chunk {}/{} done ({} bytes)", chunk, total_chunks, fragment_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ArticleConfig::builder()
//!     .progress_callback(counter as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it moves through a run.
///
/// Chunks are processed strictly in order, so events for chunk `n + 1`
/// never arrive before `on_chunk_complete` for chunk `n`. The trait is still
/// `Send + Sync` because the config is shared with spawned tasks. All methods
/// default to no-ops.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once the source text has been fetched and chunked.
    ///
    /// # Arguments
    /// * `words`        : words in the fetched text
    /// * `total_chunks` : number of chunks that will be processed
    fn on_fetch_complete(&self, words: usize, total_chunks: usize) {
        let _ = (words, total_chunks);
    }

    /// Called before the first stage runs on a chunk (1-indexed).
    fn on_chunk_start(&self, chunk: usize, total_chunks: usize) {
        let _ = (chunk, total_chunks);
    }

    /// Called after each stage returns for a chunk.
    ///
    /// # Arguments
    /// * `chunk`      : 1-indexed chunk number
    /// * `stage`      : stage name, e.g. "PDF Assistant"
    /// * `output_len` : byte length of the stage output
    fn on_stage_complete(&self, chunk: usize, stage: &str, output_len: usize) {
        let _ = (chunk, stage, output_len);
    }

    /// Called when a chunk's fragment is ready.
    fn on_chunk_complete(&self, chunk: usize, total_chunks: usize, fragment_len: usize) {
        let _ = (chunk, total_chunks, fragment_len);
    }

    /// Called when a stage fails; the run aborts right after.
    fn on_chunk_error(&self, chunk: usize, total_chunks: usize, error: &str) {
        let _ = (chunk, total_chunks, error);
    }

    /// Called once after the article has been assembled.
    fn on_article_complete(&self, total_chunks: usize, article_len: usize) {
        let _ = (total_chunks, article_len);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ArticleConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        stages: Mutex<Vec<String>>,
        article_len: AtomicUsize,
    }

    impl PipelineProgressCallback for TrackingCallback {
        fn on_chunk_start(&self, _chunk: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_complete(&self, chunk: usize, stage: &str, _len: usize) {
            self.stages.lock().unwrap().push(format!("{chunk}:{stage}"));
        }

        fn on_chunk_complete(&self, _chunk: usize, _total: usize, _len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_error(&self, _chunk: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_article_complete(&self, _total: usize, article_len: usize) {
            self.article_len.store(article_len, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_fetch_complete(12_000, 3);
        cb.on_chunk_start(1, 3);
        cb.on_stage_complete(1, "Writer", 42);
        cb.on_chunk_complete(1, 3, 42);
        cb.on_chunk_error(2, 3, "boom");
        cb.on_article_complete(3, 100);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_chunk_start(1, 2);
        tracker.on_stage_complete(1, "PDF Assistant", 10);
        tracker.on_stage_complete(1, "Writer", 20);
        tracker.on_chunk_complete(1, 2, 20);
        tracker.on_chunk_start(2, 2);
        tracker.on_chunk_error(2, 2, "timeout");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(
            *tracker.stages.lock().unwrap(),
            vec!["1:PDF Assistant".to_string(), "1:Writer".to_string()]
        );

        tracker.on_article_complete(2, 512);
        assert_eq!(tracker.article_len.load(Ordering::SeqCst), 512);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn PipelineProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_fetch_complete(10, 1);
        cb.on_chunk_complete(1, 1, 5);
    }
}
