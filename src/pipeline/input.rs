//! Document resolution: turn a path, URL or byte buffer into a local PDF file.
//!
//! pdfium opens documents from the file system, so every document source ends
//! up as a path. Downloads and in-memory uploads go to temp storage owned by
//! [`ResolvedDocument`]; it is removed when the value is dropped. The `%PDF`
//! magic is checked before returning so a wrong file type fails here with a
//! clear message instead of deep inside pdfium.

use crate::error::ArticleError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A document that is available on the local file system.
pub enum ResolvedDocument {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the PDF lives in a temp directory until drop.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
    /// Input was a byte buffer written to a managed temp file.
    Buffered(NamedTempFile),
}

impl ResolvedDocument {
    /// Path to the PDF regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedDocument::Local(p) => p,
            ResolvedDocument::Downloaded { path, .. } => path,
            ResolvedDocument::Buffered(file) => file.path(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or URL to a local PDF.
pub async fn resolve_location(
    location: &str,
    timeout_secs: u64,
) -> Result<ResolvedDocument, ArticleError> {
    let location = location.trim();
    if location.is_empty() {
        return Err(ArticleError::InvalidInput {
            input: location.to_string(),
        });
    }
    if is_url(location) {
        download_url(location, timeout_secs).await
    } else {
        resolve_local(location)
    }
}

/// Write uploaded bytes to a temp file after checking they are a PDF.
pub fn resolve_bytes(bytes: &[u8]) -> Result<ResolvedDocument, ArticleError> {
    let mut tmp = NamedTempFile::new()
        .map_err(|e| ArticleError::Internal(format!("tempfile: {e}")))?;

    if let Some(magic) = leading_magic(bytes) {
        if &magic != PDF_MAGIC {
            return Err(ArticleError::NotAPdf {
                path: tmp.path().to_path_buf(),
                magic,
            });
        }
    }

    tmp.write_all(bytes)
        .map_err(|e| ArticleError::Internal(format!("tempfile write: {e}")))?;
    debug!("Buffered {} uploaded bytes to {}", bytes.len(), tmp.path().display());
    Ok(ResolvedDocument::Buffered(tmp))
}

fn leading_magic(bytes: &[u8]) -> Option<[u8; 4]> {
    let mut magic = [0u8; 4];
    magic.copy_from_slice(bytes.get(..4)?);
    Some(magic)
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedDocument, ArticleError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(ArticleError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != PDF_MAGIC {
                return Err(ArticleError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ArticleError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ArticleError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedDocument::Local(path))
}

/// Download a URL into a temporary directory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedDocument, ArticleError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| ArticleError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ArticleError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let filename = filename_from_url(url);
    let temp_dir = TempDir::new().map_err(|e| ArticleError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    if let Some(magic) = leading_magic(&bytes) {
        if &magic != PDF_MAGIC {
            return Err(ArticleError::NotAPdf {
                path: file_path,
                magic,
            });
        }
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| ArticleError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedDocument::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
