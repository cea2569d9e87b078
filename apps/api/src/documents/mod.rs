//! Document intake: uploaded CVs and project reports on local disk, and the
//! text extracted from them before a job is created.

pub mod handlers;

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("file is empty")]
    Empty,

    #[error("file is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("unsupported file type {0:?} (allowed: pdf, txt)")]
    UnsupportedType(String),

    #[error("invalid file name {0:?}")]
    InvalidName(String),

    #[error("document {0} not found")]
    NotFound(String),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("document contains no text")]
    NoText,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    pub fn from_file_name(name: &str) -> Result<Self, DocumentError> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "txt" => Ok(DocumentKind::Text),
            _ => Err(DocumentError::UnsupportedType(extension)),
        }
    }
}

/// A file saved in the upload directory.
#[derive(Debug, Clone, Serialize)]
pub struct StoredDocument {
    /// Name to pass back to `/evaluate`.
    pub file_name: String,
    pub size: usize,
    pub kind: DocumentKind,
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    upload_dir: PathBuf,
    max_file_size: usize,
}

impl DocumentStore {
    pub fn new(upload_dir: impl Into<PathBuf>, max_file_size: usize) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_file_size,
        }
    }

    /// Validates and writes an upload as `<size>_<sanitized name>`.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<StoredDocument, DocumentError> {
        if bytes.is_empty() {
            return Err(DocumentError::Empty);
        }
        if bytes.len() > self.max_file_size {
            return Err(DocumentError::TooLarge {
                size: bytes.len(),
                max: self.max_file_size,
            });
        }

        let name = sanitize_file_name(original_name)?;
        let kind = DocumentKind::from_file_name(&name)?;
        let file_name = format!("{}_{}", bytes.len(), name);

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(self.upload_dir.join(&file_name), bytes).await?;

        info!("Stored upload {file_name} ({} bytes)", bytes.len());
        Ok(StoredDocument {
            file_name,
            size: bytes.len(),
            kind,
        })
    }

    /// Deletes a stored upload. A file that is already gone is not an error.
    pub async fn remove(&self, file_name: &str) -> Result<(), DocumentError> {
        match tokio::fs::remove_file(self.upload_dir.join(file_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads a stored document back as text.
    pub async fn read_text(&self, file_name: &str) -> Result<String, DocumentError> {
        if sanitize_file_name(file_name)? != file_name {
            return Err(DocumentError::InvalidName(file_name.to_string()));
        }
        let kind = DocumentKind::from_file_name(file_name)?;

        let bytes = match tokio::fs::read(self.upload_dir.join(file_name)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocumentError::NotFound(file_name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        extract_text(kind, bytes).await
    }
}

/// Keeps only the last path component and replaces anything outside
/// `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(name: &str) -> Result<String, DocumentError> {
    let base = Path::new(name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DocumentError::InvalidName(name.to_string()))?;

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        return Err(DocumentError::InvalidName(name.to_string()));
    }
    Ok(cleaned)
}

/// PDF parsing runs on the blocking pool; a panic inside the parser comes
/// back as an extraction error.
pub async fn extract_text(kind: DocumentKind, bytes: Vec<u8>) -> Result<String, DocumentError> {
    let text = match kind {
        DocumentKind::Text => {
            String::from_utf8(bytes).map_err(|e| DocumentError::Extraction(e.to_string()))?
        }
        DocumentKind::Pdf => tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes)
        })
        .await
        .map_err(|e| DocumentError::Extraction(e.to_string()))?
        .map_err(|e| DocumentError::Extraction(e.to_string()))?,
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(DocumentError::NoText);
    }
    Ok(text.to_string())
}
