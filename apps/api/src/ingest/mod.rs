//! Content-addressed resume ingestion.
//!
//! hash → duplicate check → extraction → unwrap/parse/normalize → persist.
//! See [`pipeline::IngestionPipeline`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::CallAborted;
use crate::store::StoreError;

pub mod extractor;
pub mod hasher;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod storage;

pub use extractor::Extractor;
pub use hasher::digest;
pub use normalize::{normalize_analysis, unwrap_payload};
pub use pipeline::{IngestOutcome, IngestionPipeline, UploadRequest};
pub use storage::{DigestLinkStorage, DocumentStorage, S3DocumentStorage};

/// Errors from one pipeline invocation. Cloneable because concurrent uploads
/// of the same content share a single invocation and its outcome.
#[derive(Debug, Clone, Error)]
pub enum IngestError {
    #[error("Invalid upload: {0}")]
    InvalidInput(String),

    #[error("Extractor output is not a structured record: {0}")]
    ExtractionFormat(String),

    #[error("Extractor call failed: {0}")]
    Extractor(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Document storage failed: {0}")]
    Storage(String),

    #[error(transparent)]
    Aborted(#[from] CallAborted),
}

/// Document formats the extractor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "application/pdf")]
    Pdf,
    #[serde(rename = "text/plain")]
    PlainText,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::PlainText => "text/plain",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaType::Pdf => "pdf",
            MediaType::PlainText => "txt",
        }
    }

    /// Resolves the media type from the declared content type, falling back to
    /// the filename extension, then checks the bytes actually match it.
    ///
    /// Generic declarations such as `application/octet-stream` are ignored.
    pub fn detect(
        declared: Option<&str>,
        filename: &str,
        bytes: &[u8],
    ) -> Result<Self, IngestError> {
        let declared = declared
            .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());

        let media_type = match (declared.as_deref(), extension.as_deref()) {
            (Some("application/pdf"), _) | (None, Some("pdf")) => MediaType::Pdf,
            (Some("text/plain"), _) | (None, Some("txt")) => MediaType::PlainText,
            (None, _) if bytes.starts_with(b"%PDF-") => MediaType::Pdf,
            (Some(other), _) => {
                return Err(IngestError::InvalidInput(format!(
                    "unsupported content type '{other}'; upload a PDF or plain text resume"
                )))
            }
            (None, _) => {
                return Err(IngestError::InvalidInput(format!(
                    "cannot tell the format of '{filename}'; upload a PDF or plain text resume"
                )))
            }
        };

        match media_type {
            MediaType::Pdf if !bytes.starts_with(b"%PDF-") => Err(IngestError::InvalidInput(
                format!("'{filename}' is not a readable PDF"),
            )),
            MediaType::PlainText if std::str::from_utf8(bytes).is_err() => Err(
                IngestError::InvalidInput(format!("'{filename}' is not valid UTF-8 text")),
            ),
            _ => Ok(media_type),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
