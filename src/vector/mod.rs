//! Vector store boundary.
//!
//! Policy chunks are produced offline (see `retrieval::ingest`) and queried
//! at request time by the policy retriever. The store is read-only from the
//! request pipeline's perspective.

pub mod pinecone;

pub use pinecone::PineconeStore;

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::fraud::similarity::cosine_similarity;

/// A pre-embedded excerpt of a policy document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyChunk {
    pub id: String,
    pub vector: Vec<f32>,
    pub source_file: String,
    pub content: String,
}

/// One query match: the chunk content plus its relevance score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredMatch {
    pub content: String,
    pub score: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("Cannot reach vector store at {0}")]
    Connection(String),

    #[error("Vector store request timed out after {0}s")]
    Timeout(u64),

    #[error("Vector store returned HTTP {status}: {body}")]
    Store { status: u16, body: String },

    #[error("Malformed vector store response: {0}")]
    ResponseParsing(String),
}

/// Managed vector database operations. `upsert` is used only by the offline
/// policy-ingestion path, never at request time.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Top-K nearest matches in a namespace, ordered by descending score.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<ScoredMatch>, VectorStoreError>;

    async fn upsert(
        &self,
        records: &[PolicyChunk],
        namespace: &str,
    ) -> Result<(), VectorStoreError>;
}

/// In-memory vector store for testing — cosine similarity over namespaced
/// chunk lists.
pub struct InMemoryVectorStore {
    namespaces: Mutex<HashMap<String, Vec<PolicyChunk>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            namespaces: Mutex::new(HashMap::new()),
        }
    }

    pub fn add(&self, namespace: &str, chunk: PolicyChunk) {
        self.namespaces
            .lock()
            .unwrap()
            .entry(namespace.to_string())
            .or_default()
            .push(chunk);
    }

    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .lock()
            .unwrap()
            .get(namespace)
            .map_or(0, Vec::len)
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<ScoredMatch>, VectorStoreError> {
        let namespaces = self.namespaces.lock().unwrap();
        let Some(chunks) = namespaces.get(namespace) else {
            return Ok(vec![]);
        };

        let mut scored: Vec<ScoredMatch> = chunks
            .iter()
            .map(|chunk| ScoredMatch {
                content: chunk.content.clone(),
                score: cosine_similarity(vector, &chunk.vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn upsert(
        &self,
        records: &[PolicyChunk],
        namespace: &str,
    ) -> Result<(), VectorStoreError> {
        let mut namespaces = self.namespaces.lock().unwrap();
        let chunks = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            // Upsert semantics: replace an existing id, append otherwise.
            match chunks.iter_mut().find(|c| c.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => chunks.push(record.clone()),
            }
        }
        Ok(())
    }
}
