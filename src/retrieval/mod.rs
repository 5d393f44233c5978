//! Policy retrieval — semantic search over the policy knowledge base.

pub mod ingest;

pub use ingest::PolicyIngestor;

use std::sync::Arc;

use crate::providers::{Embedder, EmbeddingError};
use crate::vector::{ScoredMatch, VectorStore, VectorStoreError};

/// How many passages to retrieve per query.
pub const DEFAULT_TOP_K: usize = 3;
/// Matches scoring below this floor are dropped entirely.
pub const RELEVANCE_FLOOR: f32 = 0.5;
/// Namespace the offline ingestion writes policy chunks into.
pub const POLICY_NAMESPACE: &str = "insurance_policy";

/// Retrieval result. The two empty cases are distinct on purpose: "the
/// store knows nothing" and "the store answered but nothing was relevant
/// enough" both mean the caller should short-circuit downstream reasoning
/// rather than hallucinate against empty context, but they diagnose
/// differently.
#[derive(Debug, Clone)]
pub enum RetrievalOutcome {
    /// At-or-above-floor matches, descending score order.
    Relevant(Vec<ScoredMatch>),
    /// Matches came back, but all scored below the relevance floor.
    BelowFloor,
    /// The store returned no matches at all.
    NoMatches,
}

impl RetrievalOutcome {
    pub fn passages(&self) -> &[ScoredMatch] {
        match self {
            Self::Relevant(matches) => matches,
            Self::BelowFloor | Self::NoMatches => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.passages().is_empty()
    }

    /// Ranked passage contents joined with blank-line separation — the
    /// shape both the validation prompt and the fraud similarity signal
    /// consume.
    pub fn joined_passages(&self) -> String {
        self.passages()
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] VectorStoreError),
}

/// Semantic policy retriever: embed the query, search the store, apply the
/// relevance floor.
pub struct PolicyRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
    floor: f32,
    namespace: String,
}

impl PolicyRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            top_k: DEFAULT_TOP_K,
            floor: RELEVANCE_FLOOR,
            namespace: POLICY_NAMESPACE.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_floor(mut self, floor: f32) -> Self {
        self.floor = floor;
        self
    }

    /// Retrieve up to `top_k` relevant policy passages for a query text.
    pub async fn retrieve(&self, query_text: &str) -> Result<RetrievalOutcome, RetrievalError> {
        let query_vector = self.embedder.embed(query_text).await?;
        let matches = self
            .store
            .query(&query_vector, self.top_k, &self.namespace)
            .await?;

        if matches.is_empty() {
            tracing::info!("Policy retrieval returned no matches");
            return Ok(RetrievalOutcome::NoMatches);
        }

        let total = matches.len();
        let relevant: Vec<ScoredMatch> =
            matches.into_iter().filter(|m| m.score >= self.floor).collect();

        if relevant.is_empty() {
            tracing::info!(
                dropped = total,
                floor = self.floor,
                "All retrieved passages fell below the relevance floor"
            );
            return Ok(RetrievalOutcome::BelowFloor);
        }

        tracing::debug!(kept = relevant.len(), dropped = total - relevant.len(), "Policy retrieval complete");
        Ok(RetrievalOutcome::Relevant(relevant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockEmbedder;
    use crate::vector::VectorStoreError;
    use async_trait::async_trait;

    /// Stub store returning a fixed score sequence.
    struct FixedScoreStore {
        scores: Vec<f32>,
    }

    #[async_trait]
    impl VectorStore for FixedScoreStore {
        async fn query(
            &self,
            _vector: &[f32],
            top_k: usize,
            _namespace: &str,
        ) -> Result<Vec<ScoredMatch>, VectorStoreError> {
            Ok(self
                .scores
                .iter()
                .take(top_k)
                .enumerate()
                .map(|(i, score)| ScoredMatch {
                    content: format!("passage-{i}"),
                    score: *score,
                })
                .collect())
        }

        async fn upsert(
            &self,
            _records: &[crate::vector::PolicyChunk],
            _namespace: &str,
        ) -> Result<(), VectorStoreError> {
            Ok(())
        }
    }

    fn retriever(scores: Vec<f32>) -> PolicyRetriever {
        PolicyRetriever::new(
            Arc::new(MockEmbedder::new()),
            Arc::new(FixedScoreStore { scores }),
        )
    }

    #[tokio::test]
    async fn floor_drops_low_scores_preserving_order() {
        let outcome = retriever(vec![0.9, 0.6, 0.3]).retrieve("claim query").await.unwrap();

        let RetrievalOutcome::Relevant(matches) = outcome else {
            panic!("expected relevant matches");
        };
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].score, 0.9);
        assert_eq!(matches[1].score, 0.6);
        assert_eq!(matches[0].content, "passage-0");
    }

    #[tokio::test]
    async fn all_below_floor_is_distinct_from_no_matches() {
        let below = retriever(vec![0.4, 0.2]).retrieve("q").await.unwrap();
        assert!(matches!(below, RetrievalOutcome::BelowFloor));
        assert!(below.is_empty());

        let none = retriever(vec![]).retrieve("q").await.unwrap();
        assert!(matches!(none, RetrievalOutcome::NoMatches));
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn score_exactly_at_floor_is_kept() {
        let outcome = retriever(vec![0.5]).retrieve("q").await.unwrap();
        assert_eq!(outcome.passages().len(), 1);
    }

    #[tokio::test]
    async fn embedding_failure_surfaces_as_retrieval_error() {
        let retriever = PolicyRetriever::new(
            Arc::new(MockEmbedder::failing()),
            Arc::new(FixedScoreStore { scores: vec![0.9] }),
        );
        let result = retriever.retrieve("q").await;
        assert!(matches!(result, Err(RetrievalError::Embedding(_))));
    }

    #[tokio::test]
    async fn custom_floor_applies() {
        let outcome = retriever(vec![0.9, 0.6, 0.3])
            .with_floor(0.85)
            .retrieve("q")
            .await
            .unwrap();
        assert_eq!(outcome.passages().len(), 1);
    }

    #[test]
    fn joined_passages_blank_line_separated() {
        let outcome = RetrievalOutcome::Relevant(vec![
            ScoredMatch { content: "first".into(), score: 0.9 },
            ScoredMatch { content: "second".into(), score: 0.8 },
        ]);
        assert_eq!(outcome.joined_passages(), "first\n\nsecond");
        assert_eq!(RetrievalOutcome::NoMatches.joined_passages(), "");
    }
}
