//! Result types returned by the pipeline.

use serde::{Deserialize, Serialize};

/// Separator placed between fragments in the final article.
pub const FRAGMENT_SEPARATOR: &str = "\n\n";

/// What kind of source a run started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Query,
    Document,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Query => "query",
            SourceKind::Document => "document",
        }
    }
}

/// The written output for one chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    /// 1-indexed chunk number.
    pub chunk: usize,
    /// Words in the input chunk.
    pub words: usize,
    /// Output of the analysis stage (extraction or synthesis).
    pub analysis: String,
    /// Tidied output of the writing stage.
    pub text: String,
    pub duration_ms: u64,
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleStats {
    pub fetched_words: usize,
    pub total_chunks: usize,
    pub stage_calls: usize,
    pub fetch_duration_ms: u64,
    pub stage_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// A finished article and how it was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleOutput {
    /// Fragments joined by a single blank line, in chunk order.
    pub article: String,
    pub source: SourceKind,
    pub fragments: Vec<Fragment>,
    pub stats: ArticleStats,
}

/// Join fragment texts with [`FRAGMENT_SEPARATOR`], preserving order.
pub fn merge_fragments(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(FRAGMENT_SEPARATOR)
}
