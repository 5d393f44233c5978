//! Claim aggregation — the canonical merged view of one upload batch.
//!
//! Aggregation is a pure left-to-right fold over the ordered document
//! sequence. The ordering is explicit (a `Vec` folded in upload order),
//! never the iteration order of a map: last-write-wins for structured
//! fields depends on it.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::extraction::{ExtractedDocument, ExtractionPayload};

/// Canonical merged claim for one batch. Lifetime = one request.
///
/// `structured_fields` uses a `BTreeMap` so serialization into the
/// validation prompt is deterministic.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClaimRecord {
    pub structured_fields: BTreeMap<String, String>,
    pub narrative_text: String,
}

impl ClaimRecord {
    pub fn has_structured_fields(&self) -> bool {
        !self.structured_fields.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.structured_fields.is_empty() && self.narrative_text.is_empty()
    }

    /// Deterministic JSON of the structured fields (sorted keys).
    pub fn fields_json(&self) -> String {
        serde_json::to_string(&self.structured_fields).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Fold the ordered extraction results into one `ClaimRecord`.
///
/// Written-note text is appended in batch order with no deduplication;
/// field maps merge with last-write-wins — a later file's value overwrites
/// an earlier file's value for the same key. That overwrite policy is
/// deliberate and downstream validation depends on it.
///
/// An empty input yields an empty record, which downstream treats as
/// "nothing to validate", not a failure.
pub fn aggregate(documents: &[ExtractedDocument]) -> ClaimRecord {
    let mut record = ClaimRecord::default();

    for document in documents {
        match &document.payload {
            ExtractionPayload::Text(text) => {
                if !record.narrative_text.is_empty() {
                    record.narrative_text.push_str("\n\n");
                }
                record.narrative_text.push_str(text);
            }
            ExtractionPayload::Fields(fields) => {
                for (key, value) in fields {
                    record.structured_fields.insert(key.clone(), value.clone());
                }
            }
        }
    }

    record
}
