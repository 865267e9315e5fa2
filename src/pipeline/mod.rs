//! Building blocks of the article pipeline.
//!
//! Each submodule implements one step and is testable on its own. The
//! orchestration lives in [`crate::generate`].
//!
//! ## Data Flow
//!
//! ```text
//!             ┌─ input ──▶ extract ─┐
//! source ─────┤                     ├──▶ chunk ──▶ llm (analysis) ──▶ llm (writing) ──▶ postprocess
//!             └─ search ────────────┘
//! ```
//!
//! 1. [`input`]   resolve a path, URL or byte buffer to a local PDF
//! 2. [`extract`] read the text layer via pdfium (`spawn_blocking`)
//! 3. [`search`]  run a news search and render the hits as text
//! 4. [`chunk`]   split the text into word-bounded chunks
//! 5. [`llm`]     run one stage on one payload; the only step talking to a model
//! 6. [`postprocess`] deterministic cleanup of each written fragment

pub mod chunk;
pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod search;
