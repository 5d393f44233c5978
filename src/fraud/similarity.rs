//! Embedding-similarity signal: embed two texts independently, compare by
//! cosine similarity.

use crate::providers::{Embedder, EmbeddingError};

/// Cosine similarity between two vectors.
///
/// Defined as 0.0 (never NaN) when either vector is all-zero or the
/// dimensions disagree.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Embed both texts and return their cosine similarity. Embedding is a pure
/// function of a single text, so the result is symmetric in its arguments.
pub async fn text_similarity(
    embedder: &dyn Embedder,
    a: &str,
    b: &str,
) -> Result<f32, EmbeddingError> {
    let vec_a = embedder.embed(a).await?;
    let vec_b = embedder.embed(b).await?;
    Ok(cosine_similarity(&vec_a, &vec_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockEmbedder;

    #[test]
    fn identical_vectors_score_one() {
        let a = vec![0.3, 0.4, 0.5];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero_not_nan() {
        let zero = vec![0.0, 0.0, 0.0];
        let other = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&zero, &other), 0.0);
        assert_eq!(cosine_similarity(&other, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn dimension_mismatch_scores_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[tokio::test]
    async fn same_text_scores_one() {
        let embedder = MockEmbedder::new();
        let sim = text_similarity(&embedder, "lower back pain", "lower back pain")
            .await
            .unwrap();
        assert!((sim - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn similarity_is_symmetric() {
        let embedder = MockEmbedder::new();
        let ab = text_similarity(&embedder, "claim for surgery", "policy covers surgery")
            .await
            .unwrap();
        let ba = text_similarity(&embedder, "policy covers surgery", "claim for surgery")
            .await
            .unwrap();
        assert!((ab - ba).abs() < 1e-6);
    }

    #[tokio::test]
    async fn empty_text_scores_zero() {
        let embedder = MockEmbedder::new();
        let sim = text_similarity(&embedder, "", "some policy text").await.unwrap();
        assert_eq!(sim, 0.0);
    }
}
