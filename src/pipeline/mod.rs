//! Batch orchestrator — drives one upload batch through the full pipeline.
//!
//! Stages: per-file extraction → aggregation → validation + fraud
//! assessment (only when structured fields exist) → summarization.
//! One file failing extraction never aborts the batch; one sub-step failing
//! degrades the response (a null field plus a log line) instead of crashing
//! the request handler.

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::claim::{self, ClaimRecord};
use crate::extraction::{
    DocClass, DocumentExtractor, ExtractedDocument, ExtractionError, ExtractionPayload,
};
use crate::fraud::{FraudAssessment, FraudEngine};
use crate::providers::{Embedder, TextGenerator};
use crate::retrieval::{PolicyRetriever, RetrievalOutcome};
use crate::summarize::Summarizer;
use crate::validation::{ValidationEngine, ValidationResult};
use crate::vector::VectorStore;

use std::sync::Arc;

/// Per-file extraction calls running at once within a batch.
const EXTRACTION_CONCURRENCY: usize = 4;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// One uploaded file, as received at the HTTP boundary.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Batch lifecycle stage. `Done` and `PartialFailure` are terminal;
/// `PartialFailure` means at least one file was skipped, not that the batch
/// aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStage {
    Idle,
    PerFileExtraction,
    Aggregating,
    Validating,
    FraudAssessing,
    Summarizing,
    Done,
    PartialFailure,
}

/// A file the batch skipped, with enough detail to diagnose without server
/// logs.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub filename: String,
    pub error: String,
}

/// Final per-batch output. `fraud_risk` and `validation` are present only
/// when the aggregated record had structured fields.
#[derive(Debug, Serialize)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    pub received_at: chrono::DateTime<chrono::Utc>,
    pub stage: BatchStage,
    pub document_count: usize,
    pub summary: Option<String>,
    pub validation: Option<ValidationResult>,
    pub fraud_risk: Option<FraudAssessment>,
    pub failed_files: Vec<FileFailure>,
}

// ═══════════════════════════════════════════════════════════
// Orchestrator
// ═══════════════════════════════════════════════════════════

/// Orchestrates one upload batch end to end.
///
/// All collaborators are injected as trait handles, so the whole pipeline
/// runs against mocks in tests. Sub-engines are built once here and share
/// the same provider handles.
pub struct BatchProcessor {
    extractor: Arc<dyn DocumentExtractor>,
    retriever: PolicyRetriever,
    validation: ValidationEngine,
    fraud: FraudEngine,
    summarizer: Summarizer,
}

impl BatchProcessor {
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        generator: Arc<dyn TextGenerator>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            extractor,
            retriever: PolicyRetriever::new(Arc::clone(&embedder), store),
            validation: ValidationEngine::new(Arc::clone(&generator)),
            fraud: FraudEngine::new(Arc::clone(&generator), embedder),
            summarizer: Summarizer::new(generator),
        }
    }

    /// Process one batch. Never fails as a whole: sub-step errors degrade
    /// the outcome and are logged.
    ///
    /// Cancelling the token stops dispatching files that have not started;
    /// in-flight extraction calls complete (or time out) normally.
    pub async fn process_batch(
        &self,
        files: Vec<UploadedFile>,
        cancel: &CancellationToken,
    ) -> BatchOutcome {
        let batch_id = Uuid::new_v4();
        let received_at = chrono::Utc::now();
        tracing::info!(
            batch_id = %batch_id,
            files = files.len(),
            stage = ?BatchStage::Idle,
            "Batch accepted"
        );

        let (documents, failed_files) = self.extract_all(&batch_id, files, cancel).await;

        tracing::debug!(batch_id = %batch_id, stage = ?BatchStage::Aggregating, documents = documents.len(), "Aggregating extractions");
        let record = claim::aggregate(&documents);

        let (validation, fraud_risk) = if record.has_structured_fields() {
            self.validate_and_assess(&batch_id, &record).await
        } else {
            tracing::info!(batch_id = %batch_id, "No structured fields — skipping validation and fraud assessment");
            (None, None)
        };

        tracing::debug!(batch_id = %batch_id, stage = ?BatchStage::Summarizing, "Summarizing batch");
        let summary = match self.summarizer.summarize(&combined_batch_text(&record)).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::error!(batch_id = %batch_id, error = %e, "Summarization step failed");
                None
            }
        };

        let stage = if failed_files.is_empty() {
            BatchStage::Done
        } else {
            BatchStage::PartialFailure
        };
        tracing::info!(batch_id = %batch_id, stage = ?stage, failed = failed_files.len(), "Batch complete");

        BatchOutcome {
            batch_id,
            received_at,
            stage,
            document_count: documents.len(),
            summary,
            validation,
            fraud_risk,
            failed_files,
        }
    }

    /// Extract every file, up to `EXTRACTION_CONCURRENCY` at a time.
    ///
    /// Completion order is arbitrary, so results are buffered and replayed
    /// in upload order before aggregation — last-write-wins stays
    /// deterministic no matter which extraction finishes first.
    async fn extract_all(
        &self,
        batch_id: &Uuid,
        files: Vec<UploadedFile>,
        cancel: &CancellationToken,
    ) -> (Vec<ExtractedDocument>, Vec<FileFailure>) {
        tracing::debug!(batch_id = %batch_id, stage = ?BatchStage::PerFileExtraction, "Extracting files");

        let mut results: Vec<(usize, String, Result<ExtractedDocument, ExtractionError>)> =
            stream::iter(files.into_iter().enumerate().map(|(index, file)| {
                let extractor = Arc::clone(&self.extractor);
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return (index, file.filename, Err(ExtractionError::Cancelled));
                    }
                    let result = extract_one(extractor.as_ref(), &file).await;
                    (index, file.filename, result)
                }
            }))
            .buffer_unordered(EXTRACTION_CONCURRENCY)
            .collect()
            .await;

        results.sort_by_key(|(index, _, _)| *index);

        let mut documents = Vec::new();
        let mut failed = Vec::new();
        for (_, filename, result) in results {
            match result {
                Ok(document) => documents.push(document),
                Err(e) => {
                    tracing::warn!(batch_id = %batch_id, file = %filename, error = %e, "File extraction failed — skipping");
                    failed.push(FileFailure {
                        filename,
                        error: e.to_string(),
                    });
                }
            }
        }

        (documents, failed)
    }

    /// Retrieve policy context once and feed it to both validation and the
    /// fraud similarity signal. A retrieval failure downgrades to "no
    /// context" rather than failing either step.
    async fn validate_and_assess(
        &self,
        batch_id: &Uuid,
        record: &ClaimRecord,
    ) -> (Option<ValidationResult>, Option<FraudAssessment>) {
        let retrieval = match self.retriever.retrieve(&record.fields_json()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(batch_id = %batch_id, error = %e, "Policy retrieval failed — validating without context");
                RetrievalOutcome::NoMatches
            }
        };
        let policy_text = retrieval.joined_passages();

        tracing::debug!(batch_id = %batch_id, stage = ?BatchStage::Validating, "Validating claim");
        let validation = match self.validation.validate(record, &retrieval).await {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::error!(batch_id = %batch_id, error = %e, "Validation step failed");
                None
            }
        };

        tracing::debug!(batch_id = %batch_id, stage = ?BatchStage::FraudAssessing, "Assessing fraud risk");
        let fraud = match self.fraud.assess(&record.narrative_text, &policy_text).await {
            Ok(assessment) => Some(assessment),
            Err(e) => {
                tracing::error!(batch_id = %batch_id, error = %e, "Fraud assessment step failed");
                None
            }
        };

        (validation, fraud)
    }
}

/// Extract one file: stage it to a temp file, classify, and dispatch to
/// field or text extraction by class. Extraction reads the staged copy, not
/// the request buffer, and the staged copy is deleted on every exit path —
/// `NamedTempFile` cleans up on drop.
async fn extract_one(
    extractor: &dyn DocumentExtractor,
    file: &UploadedFile,
) -> Result<ExtractedDocument, ExtractionError> {
    let staged =
        tempfile::NamedTempFile::new().map_err(|e| ExtractionError::Staging(e.to_string()))?;
    tokio::fs::write(staged.path(), &file.bytes)
        .await
        .map_err(|e| ExtractionError::Staging(e.to_string()))?;
    let staged_bytes = tokio::fs::read(staged.path())
        .await
        .map_err(|e| ExtractionError::Staging(e.to_string()))?;

    let doc_class = extractor.classify(&staged_bytes).await?;
    let payload = match doc_class {
        DocClass::WrittenNote => {
            ExtractionPayload::Text(extractor.extract_text(&staged_bytes).await?)
        }
        // Everything else — claim forms, EOBs, and unrecognized documents —
        // goes through the form parser.
        _ => ExtractionPayload::Fields(extractor.extract_fields(&staged_bytes).await?),
    };

    tracing::debug!(file = %file.filename, class = doc_class.as_str(), "File extracted");
    Ok(ExtractedDocument {
        source_id: file.filename.clone(),
        doc_class,
        payload,
    })
}

/// All narrative text plus the stringified structured fields — the input
/// summarization always runs over.
fn combined_batch_text(record: &ClaimRecord) -> String {
    if record.narrative_text.is_empty() {
        record.fields_json()
    } else {
        format!("{}\n\n{}", record.narrative_text, record.fields_json())
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
