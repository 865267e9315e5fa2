//! Streaming API: emit fragments as chunks complete.
//!
//! A long document or a broad query can take several minutes to write. The
//! stream lets a caller show or save each fragment as soon as its chunk is
//! done instead of waiting for the whole article.
//!
//! Fetching and chunking happen before the stream is returned, so a source
//! with no content fails up front. After that, fragments arrive strictly in
//! chunk order; a stage failure is yielded once as an `Err` and the stream
//! ends there.

use crate::config::ArticleConfig;
use crate::error::ArticleError;
use crate::fetch::Source;
use crate::generate::Pipeline;
use crate::output::{Fragment, SourceKind};
use futures::stream;
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of fragments in chunk order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, ArticleError>> + Send>>;

struct StreamState {
    pipeline: Pipeline,
    kind: SourceKind,
    chunks: std::iter::Enumerate<std::vec::IntoIter<String>>,
    total_chunks: usize,
    failed: bool,
}

/// Fetch `source` and stream one fragment per chunk.
///
/// # Returns
/// - `Ok(FragmentStream)` of `Result<Fragment, ArticleError>`
/// - `Err(ArticleError)` when nothing could be fetched
pub async fn generate_stream(
    pipeline: &Pipeline,
    source: &Source,
) -> Result<FragmentStream, ArticleError> {
    info!("Starting streaming generation from {}", source.describe());
    let (_words, chunks) = pipeline.fetch_chunks(source).await?;

    let state = StreamState {
        pipeline: pipeline.clone(),
        kind: source.kind(),
        total_chunks: chunks.len(),
        chunks: chunks.into_iter().enumerate(),
        failed: false,
    };

    let s = stream::unfold(state, |mut st| async move {
        if st.failed {
            return None;
        }
        let (i, text) = st.chunks.next()?;
        let result = st
            .pipeline
            .write_chunk(st.kind, i + 1, st.total_chunks, &text)
            .await;
        st.failed = result.is_err();
        Some((result, st))
    });

    Ok(Box::pin(s))
}

/// Build a pipeline from `config` and stream `source` through it.
pub async fn generate_article_stream(
    source: &Source,
    config: &ArticleConfig,
) -> Result<FragmentStream, ArticleError> {
    let pipeline = Pipeline::from_config(config, source)?;
    generate_stream(&pipeline, source).await
}
