//! Offline policy ingestion: chunk a policy document, embed each chunk,
//! and upsert into the policy namespace. Runs from the `policy_ingest`
//! binary, never at request time.

use std::path::Path;
use std::sync::Arc;

use crate::providers::{Embedder, EmbeddingError};
use crate::vector::{PolicyChunk, VectorStore, VectorStoreError};

use super::POLICY_NAMESPACE;

/// Words per chunk.
pub const CHUNK_WORDS: usize = 300;
/// Words shared between consecutive chunks.
pub const CHUNK_OVERLAP: usize = 50;
/// Upsert is flushed every this many buffered records.
const UPSERT_BATCH: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] VectorStoreError),

    #[error("Cannot read policy file: {0}")]
    Io(#[from] std::io::Error),
}

/// Split text into overlapping word windows.
pub fn chunk_text(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return vec![];
    }

    let step = CHUNK_WORDS - CHUNK_OVERLAP;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + CHUNK_WORDS).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }

    chunks
}

pub struct PolicyIngestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    namespace: String,
}

impl PolicyIngestor {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            namespace: POLICY_NAMESPACE.to_string(),
        }
    }

    /// Ingest one policy file (plain text or markdown). Returns chunk count.
    pub async fn ingest_file(&self, path: &Path) -> Result<usize, IngestError> {
        let text = tokio::fs::read_to_string(path).await?;
        let stem = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "policy".to_string());

        self.ingest_text(&text, &stem).await
    }

    /// Chunk, embed, and upsert. Flushes every `UPSERT_BATCH` records so a
    /// large document never accumulates unbounded in memory.
    pub async fn ingest_text(&self, text: &str, source_file: &str) -> Result<usize, IngestError> {
        let chunks = chunk_text(text);
        let total = chunks.len();
        tracing::info!(source = source_file, chunks = total, "Starting policy ingestion");

        let mut buffer: Vec<PolicyChunk> = Vec::with_capacity(UPSERT_BATCH);
        for (index, content) in chunks.into_iter().enumerate() {
            let vector = self.embedder.embed(&content).await?;
            buffer.push(PolicyChunk {
                id: format!("{source_file}_chunk_{index}"),
                vector,
                source_file: source_file.to_string(),
                content,
            });

            if buffer.len() >= UPSERT_BATCH {
                self.store.upsert(&buffer, &self.namespace).await?;
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            self.store.upsert(&buffer, &self.namespace).await?;
        }

        tracing::info!(source = source_file, chunks = total, "Policy ingestion complete");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockEmbedder;
    use crate::vector::InMemoryVectorStore;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("collision coverage up to fifty thousand");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("").is_empty());
        assert!(chunk_text("   \n  ").is_empty());
    }

    #[test]
    fn long_text_overlaps_by_fifty_words() {
        let chunks = chunk_text(&words(600));
        // 600 words, window 300, step 250 → chunks at 0, 250, 500.
        assert_eq!(chunks.len(), 3);

        let first: Vec<&str> = chunks[0].split_whitespace().collect();
        let second: Vec<&str> = chunks[1].split_whitespace().collect();
        assert_eq!(first.len(), 300);
        // Last 50 words of chunk 0 == first 50 words of chunk 1.
        assert_eq!(&first[250..], &second[..50]);
    }

    #[test]
    fn exact_window_does_not_produce_empty_tail() {
        let chunks = chunk_text(&words(300));
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn ingest_writes_all_chunks_with_stable_ids() {
        let store = Arc::new(InMemoryVectorStore::new());
        let ingestor = PolicyIngestor::new(Arc::new(MockEmbedder::new()), store.clone());

        let count = ingestor.ingest_text(&words(600), "sample-policy.md").await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(store.len(POLICY_NAMESPACE), 3);

        // Re-ingesting upserts in place instead of duplicating.
        ingestor.ingest_text(&words(600), "sample-policy.md").await.unwrap();
        assert_eq!(store.len(POLICY_NAMESPACE), 3);
    }

    #[tokio::test]
    async fn ingest_propagates_embedding_failure() {
        let ingestor = PolicyIngestor::new(
            Arc::new(MockEmbedder::failing()),
            Arc::new(InMemoryVectorStore::new()),
        );
        let result = ingestor.ingest_text("some policy text", "p.md").await;
        assert!(matches!(result, Err(IngestError::Embedding(_))));
    }
}
