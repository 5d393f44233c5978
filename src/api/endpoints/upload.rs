//! Batch upload endpoint — claim documents in, reviewer packet out.
//!
//! `POST /api/upload` — receives a multipart batch of claim documents and
//! runs the full intake pipeline synchronously: extraction, aggregation,
//! policy validation, fraud assessment, and summarization.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::{BatchOutcome, BatchStage, UploadedFile};

/// Maximum files per upload batch.
const MAX_FILES: usize = 10;
/// Maximum per-file size in bytes (8 MB).
const MAX_FILE_BYTES: usize = 8 * 1024 * 1024;

#[derive(Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub message: String,
    pub data: BatchOutcome,
}

/// `POST /api/upload` — process one batch of claim documents.
///
/// Every multipart field carrying a filename is treated as a claim
/// document; non-file fields are ignored. Per-file extraction failures do
/// not fail the request — they come back in `data.failed_files`.
pub async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut files: Vec<UploadedFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        if files.len() == MAX_FILES {
            return Err(ApiError::BadRequest(format!(
                "Maximum {MAX_FILES} files per upload"
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read '{filename}': {e}")))?;

        if bytes.len() > MAX_FILE_BYTES {
            return Err(ApiError::PayloadTooLarge(format!(
                "File '{}' exceeds 8 MB size limit ({} bytes)",
                filename,
                bytes.len()
            )));
        }

        files.push(UploadedFile {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    if files.is_empty() {
        return Err(ApiError::BadRequest("No files in upload".into()));
    }

    let outcome = ctx.processor.process_batch(files, &ctx.shutdown).await;

    let message = match outcome.stage {
        BatchStage::PartialFailure => format!(
            "{} file(s) processed, {} skipped",
            outcome.document_count,
            outcome.failed_files.len()
        ),
        _ => format!("{} file(s) processed", outcome.document_count),
    };

    Ok(Json(UploadResponse {
        status: "processed",
        message,
        data: outcome,
    }))
}
