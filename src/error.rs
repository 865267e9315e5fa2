//! Error types for the research-article library.
//!
//! Two error types reflect the two places a run can break:
//!
//! * [`ArticleError`] : everything returned from the top-level
//!   `generate_article*` functions. A run either produces the whole article
//!   or one of these; there is no partial-success mode.
//!
//! * [`ServiceError`] : a failure inside the completion service (API error,
//!   timeout, tool loop trouble). The stage runner never retries; it wraps
//!   the service error in [`ArticleError::StageFailed`] with the stage name
//!   and chunk index, keeping the original reachable through
//!   [`std::error::Error::source`].
//!
//! Every [`ArticleError`] variant belongs to one [`ErrorClass`] so callers
//! can branch on "could not get content" vs. "the model failed" vs. "fix
//! your configuration" without matching on every variant.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of an [`ArticleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// No text could be obtained from the source.
    Fetch,
    /// The completion service failed while running a stage.
    Stage,
    /// Invalid model, missing credential or bad setting; detected at startup.
    Configuration,
    /// Output could not be written, or an internal runtime error.
    Io,
}

/// All errors returned by the research-article library.
#[derive(Debug, Error)]
pub enum ArticleError {
    // ── Fetch errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium could not read the text layer of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// The search service returned an error.
    #[error("Search for '{query}' failed: {reason}")]
    SearchFailed { query: String, reason: String },

    /// The source yielded no usable text; no article is produced.
    #[error("No content found for {origin}\nNothing to write an article about.")]
    NoContentFound { origin: String },

    // ── Stage errors ──────────────────────────────────────────────────────
    /// A pipeline stage failed on a chunk. The service error is the source.
    #[error("Stage '{stage}' failed on chunk {chunk}/{total_chunks}: {source}")]
    StageFailed {
        stage: String,
        chunk: usize,
        total_chunks: usize,
        #[source]
        source: ServiceError,
    },

    // ── Configuration errors ──────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A credential required by the selected source or service is missing.
    #[error("Missing credential for {service}.\nSet {env_var} or pass it explicitly.")]
    MissingCredential { service: String, env_var: String },

    /// The selected model is not offered by the provider.
    #[error("Model '{model}' is not available.\nAvailable: {available}")]
    InvalidModel { model: String, available: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium on the system library path."
    )]
    PdfiumBindingFailed(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output article file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ArticleError {
    /// Which part of the run this error belongs to.
    pub fn class(&self) -> ErrorClass {
        use ArticleError::*;
        match self {
            FileNotFound { .. }
            | PermissionDenied { .. }
            | InvalidInput { .. }
            | DownloadFailed { .. }
            | DownloadTimeout { .. }
            | NotAPdf { .. }
            | CorruptPdf { .. }
            | PasswordRequired { .. }
            | WrongPassword { .. }
            | TextExtractionFailed { .. }
            | SearchFailed { .. }
            | NoContentFound { .. } => ErrorClass::Fetch,
            StageFailed { .. } => ErrorClass::Stage,
            ProviderNotConfigured { .. }
            | MissingCredential { .. }
            | InvalidModel { .. }
            | PdfiumBindingFailed(_)
            | InvalidConfig(_) => ErrorClass::Configuration,
            OutputWriteFailed { .. } | Internal(_) => ErrorClass::Io,
        }
    }

    pub fn is_fetch_failure(&self) -> bool {
        self.class() == ErrorClass::Fetch
    }

    pub fn is_stage_failure(&self) -> bool {
        self.class() == ErrorClass::Stage
    }
}

/// A failure reported by the completion service.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The LLM API returned an error (rate limit, malformed response, network).
    #[error("LLM API error: {message}")]
    Api { message: String },

    /// The request did not complete within the client timeout.
    #[error("LLM call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The model kept requesting tools past the configured round limit.
    #[error("Model still requesting tools after {rounds} rounds")]
    ToolRoundsExceeded { rounds: usize },

    /// The model asked for a tool the stage does not offer.
    #[error("Model requested unknown tool '{name}'")]
    UnknownTool { name: String },

    /// A tool was invoked and failed.
    #[error("Tool '{name}' failed: {detail}")]
    ToolFailed { name: String, detail: String },

    /// The stage answered with nothing but whitespace.
    #[error("Model returned empty output")]
    EmptyOutput,

    /// No provider was built for the stage's model.
    #[error("No provider configured for model '{model}'")]
    ModelNotConfigured { model: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn stage_failure_display_names_stage_and_chunk() {
        let e = ArticleError::StageFailed {
            stage: "Writer".into(),
            chunk: 2,
            total_chunks: 3,
            source: ServiceError::Api {
                message: "429 rate limited".into(),
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("Writer"), "got: {msg}");
        assert!(msg.contains("2/3"), "got: {msg}");
        assert!(msg.contains("429"), "got: {msg}");
    }

    #[test]
    fn stage_failure_keeps_service_error_as_source() {
        let e = ArticleError::StageFailed {
            stage: "PDF Assistant".into(),
            chunk: 1,
            total_chunks: 1,
            source: ServiceError::Timeout { secs: 30 },
        };
        let source = e.source().expect("source should be set");
        assert!(source.to_string().contains("30s"));
    }

    #[test]
    fn no_content_is_fetch_class() {
        let e = ArticleError::NoContentFound {
            origin: "query 'rust'".into(),
        };
        assert_eq!(e.class(), ErrorClass::Fetch);
        assert!(e.is_fetch_failure());
        assert!(!e.is_stage_failure());
    }

    #[test]
    fn missing_credential_is_configuration_class() {
        let e = ArticleError::MissingCredential {
            service: "Tavily search".into(),
            env_var: "TAVILY_API_KEY".into(),
        };
        assert_eq!(e.class(), ErrorClass::Configuration);
        assert!(e.to_string().contains("TAVILY_API_KEY"));
    }

    #[test]
    fn invalid_model_lists_alternatives() {
        let e = ArticleError::InvalidModel {
            model: "gpt-9".into(),
            available: "gpt-4.1-nano, gpt-4.1".into(),
        };
        assert!(e.to_string().contains("gpt-4.1-nano"));
        assert_eq!(e.class(), ErrorClass::Configuration);
    }
}
