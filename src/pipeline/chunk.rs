//! Word-bounded chunking of fetched text.
//!
//! Word count is used as a stand-in for token count. The ratio of tokens to
//! words varies with language and content (code and numbers tokenise densely),
//! so `max_words` is a budget heuristic, not an exact context-window limit.

/// Split `text` on whitespace into chunks of at most `max_words` words.
///
/// Every chunk but the last holds exactly `max_words` words; words inside a
/// chunk are joined by single spaces. Concatenating the chunks' words in
/// order gives back the input's word sequence. Empty (or all-whitespace)
/// input yields no chunks. A `max_words` of 0 is treated as 1.
pub fn chunk_words(text: &str, max_words: usize) -> Vec<String> {
    let max_words = max_words.max(1);
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::with_capacity(max_words.min(8192));

    for word in text.split_whitespace() {
        current.push(word);
        if current.len() >= max_words {
            chunks.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

/// Number of whitespace-separated words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
