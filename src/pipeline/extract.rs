//! PDF text extraction via pdfium.
//!
//! Only the text layer is read; no rasterisation happens here. pdfium is a
//! C++ library with thread-local state, so extraction runs inside
//! `spawn_blocking` like every other pdfium call in this crate.

use crate::error::ArticleError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable naming an explicit pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Reads the visible text of the first `max_pages` pages of a document.
///
/// Implementations are blocking; use [`extract_document_text`] from async code.
pub trait DocumentExtractor: Send + Sync {
    /// Returns the concatenated page text, or an empty string if there is none.
    fn extract_text(
        &self,
        path: &Path,
        max_pages: usize,
        password: Option<&str>,
    ) -> Result<String, ArticleError>;
}

/// [`DocumentExtractor`] backed by a pdfium shared library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    /// Bind to `PDFIUM_LIB_PATH` when set, else the system library.
    pub fn from_env() -> Self {
        Self {
            library_path: std::env::var_os(PDFIUM_LIB_PATH_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Bind to the pdfium library at `path`.
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    /// Bind once and drop the handle, so a missing library is reported as
    /// [`ArticleError::PdfiumBindingFailed`] at startup rather than on the
    /// first extraction.
    pub fn ensure_bound(&self) -> Result<(), ArticleError> {
        self.bind().map(|_| ())
    }

    fn bind(&self) -> Result<Pdfium, ArticleError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| ArticleError::PdfiumBindingFailed(format!("{:?}", e)))?;
        Ok(Pdfium::new(bindings))
    }
}

impl DocumentExtractor for PdfiumExtractor {
    fn extract_text(
        &self,
        path: &Path,
        max_pages: usize,
        password: Option<&str>,
    ) -> Result<String, ArticleError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| load_error(path, password, e))?;

        let pages = document.pages();
        info!("PDF loaded: {} pages, reading up to {}", pages.len(), max_pages);

        let mut texts = Vec::new();
        for (idx, page) in pages.iter().enumerate().take(max_pages) {
            let text = page
                .text()
                .map_err(|e| ArticleError::TextExtractionFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?
                .all();
            debug!("Page {}: {} chars of text", idx + 1, text.len());
            texts.push(text);
        }

        Ok(join_pages(texts, max_pages))
    }
}

/// Map a pdfium load failure onto the password / corruption errors.
fn load_error(path: &Path, password: Option<&str>, e: PdfiumError) -> ArticleError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            ArticleError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            ArticleError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        ArticleError::CorruptPdf {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}

/// Join at most `max_pages` page texts, one newline between pages so words
/// at a page boundary do not run together.
pub fn join_pages<I>(pages: I, max_pages: usize) -> String
where
    I: IntoIterator<Item = String>,
{
    pages
        .into_iter()
        .take(max_pages)
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run a blocking extractor on the tokio blocking pool.
pub async fn extract_document_text(
    extractor: Arc<dyn DocumentExtractor>,
    path: &Path,
    max_pages: usize,
    password: Option<&str>,
) -> Result<String, ArticleError> {
    let path = path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || extractor.extract_text(&path, max_pages, pwd.as_deref()))
        .await
        .map_err(|e| ArticleError::Internal(format!("Extraction task panicked: {}", e)))?
}
