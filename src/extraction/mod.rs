//! Document classification and extraction boundary.
//!
//! Every uploaded file passes through a `DocumentExtractor`: classify the
//! document, then pull either a field map (forms, EOBs) or raw text
//! (written notes). The production implementation wraps a Document-AI-style
//! processor service; `MockExtractor` drives tests.

pub mod docai;

pub use docai::DocAiClient;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Document class assigned by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocClass {
    ClaimForm,
    Eob,
    WrittenNote,
    Unknown,
}

impl DocClass {
    /// Map a processor entity label to a class. Unrecognized labels are
    /// `Unknown` (still processed — as a field-bearing document).
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "claim_form" | "claim-form" | "claimform" => Self::ClaimForm,
            "eob" | "explanation_of_benefits" => Self::Eob,
            "written_note" | "written-note" | "notes" | "adjuster_note" => Self::WrittenNote,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClaimForm => "claim_form",
            Self::Eob => "eob",
            Self::WrittenNote => "written_note",
            Self::Unknown => "unknown",
        }
    }
}

/// Extraction payload — exactly one of the two shapes, by class:
/// written notes carry raw text, everything else carries a field map.
#[derive(Debug, Clone)]
pub enum ExtractionPayload {
    Fields(HashMap<String, String>),
    Text(String),
}

/// One classified + extracted upload. Immutable once produced.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub source_id: String,
    pub doc_class: DocClass,
    pub payload: ExtractionPayload,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Cannot reach document processor at {0}")]
    Connection(String),

    #[error("Extraction request timed out after {0}s")]
    Timeout(u64),

    #[error("Document processor returned HTTP {status}: {body}")]
    Processor { status: u16, body: String },

    #[error("Malformed processor response: {0}")]
    ResponseParsing(String),

    #[error("Failed to stage document: {0}")]
    Staging(String),

    #[error("Batch cancelled before this file was dispatched")]
    Cancelled,
}

// ═══════════════════════════════════════════════════════════
// Trait
// ═══════════════════════════════════════════════════════════

/// External document classification + extraction service.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn classify(&self, file_bytes: &[u8]) -> Result<DocClass, ExtractionError>;

    async fn extract_fields(
        &self,
        file_bytes: &[u8],
    ) -> Result<HashMap<String, String>, ExtractionError>;

    async fn extract_text(&self, file_bytes: &[u8]) -> Result<String, ExtractionError>;
}

// ═══════════════════════════════════════════════════════════
// Mock
// ═══════════════════════════════════════════════════════════

/// Mock extractor for testing, driven by the file content itself:
///
/// - `note:<text>`        → WrittenNote, `extract_text` returns `<text>`
/// - `form:` / `eob:` followed by `key=value` lines → field-bearing class
/// - `fail:<reason>`      → every call errors
/// - anything else        → Unknown, empty field map
///
/// Content-driven behavior keeps results deterministic no matter what order
/// concurrent extractions complete in.
pub struct MockExtractor;

impl MockExtractor {
    pub fn new() -> Self {
        Self
    }

    fn content(file_bytes: &[u8]) -> String {
        String::from_utf8_lossy(file_bytes).to_string()
    }
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentExtractor for MockExtractor {
    async fn classify(&self, file_bytes: &[u8]) -> Result<DocClass, ExtractionError> {
        let content = Self::content(file_bytes);
        if let Some(reason) = content.strip_prefix("fail:") {
            return Err(ExtractionError::Processor {
                status: 500,
                body: reason.trim().to_string(),
            });
        }
        if content.starts_with("note:") {
            Ok(DocClass::WrittenNote)
        } else if content.starts_with("form:") {
            Ok(DocClass::ClaimForm)
        } else if content.starts_with("eob:") {
            Ok(DocClass::Eob)
        } else {
            Ok(DocClass::Unknown)
        }
    }

    async fn extract_fields(
        &self,
        file_bytes: &[u8],
    ) -> Result<HashMap<String, String>, ExtractionError> {
        let content = Self::content(file_bytes);
        if let Some(reason) = content.strip_prefix("fail:") {
            return Err(ExtractionError::Processor {
                status: 500,
                body: reason.trim().to_string(),
            });
        }
        let body = content
            .strip_prefix("form:")
            .or_else(|| content.strip_prefix("eob:"))
            .unwrap_or(&content);

        Ok(body
            .lines()
            .filter_map(|line| {
                line.split_once('=')
                    .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            })
            .collect())
    }

    async fn extract_text(&self, file_bytes: &[u8]) -> Result<String, ExtractionError> {
        let content = Self::content(file_bytes);
        if let Some(reason) = content.strip_prefix("fail:") {
            return Err(ExtractionError::Processor {
                status: 500,
                body: reason.trim().to_string(),
            });
        }
        Ok(content.strip_prefix("note:").unwrap_or(&content).trim().to_string())
    }
}
