//! Fraud assessment — combines the text judgment with the similarity score.

use std::sync::Arc;

use serde::Serialize;

use crate::providers::{Embedder, EmbeddingError, GenerationError, TextGenerator};

use super::analyzer::{analyze_claim_text, RiskJudgment};
use super::similarity::text_similarity;

/// Similarity scores below this floor force a high combined risk, whatever
/// the text judgment says.
pub const SIMILARITY_FLOOR: f32 = 0.7;

/// Final combined risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

/// Full assessment. Both underlying signals are carried for auditability —
/// callers must not discard them.
#[derive(Debug, Clone, Serialize)]
pub struct FraudAssessment {
    #[serde(rename = "text_analysis")]
    pub text_judgment: RiskJudgment,
    #[serde(rename = "document_similarity")]
    pub similarity_score: f32,
    pub combined_risk: RiskTier,
}

#[derive(Debug, thiserror::Error)]
pub enum FraudError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Combination rule. The checks run in this exact precedence:
///
/// 1. low similarity OR a "high" text tier → High
/// 2. a "medium" text tier → Medium (high similarity never downgrades it)
/// 3. everything else → Low
///
/// Tier strings outside low/medium/high behave as a low text signal — the
/// analyzer passes tiers through unvalidated and only these two are
/// special-cased.
pub fn combine_risk(text_judgment: &RiskJudgment, similarity_score: f32) -> RiskTier {
    if similarity_score < SIMILARITY_FLOOR || text_judgment.tier == "high" {
        RiskTier::High
    } else if text_judgment.tier == "medium" {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Fraud assessment engine. Pure orchestration over the two signals;
/// `combine_risk` holds the decision logic.
pub struct FraudEngine {
    generator: Arc<dyn TextGenerator>,
    embedder: Arc<dyn Embedder>,
}

impl FraudEngine {
    pub fn new(generator: Arc<dyn TextGenerator>, embedder: Arc<dyn Embedder>) -> Self {
        Self { generator, embedder }
    }

    /// Assess one claim narrative against the supplied policy text.
    pub async fn assess(
        &self,
        claim_narrative: &str,
        policy_text: &str,
    ) -> Result<FraudAssessment, FraudError> {
        let text_judgment = analyze_claim_text(self.generator.as_ref(), claim_narrative).await?;
        let similarity =
            text_similarity(self.embedder.as_ref(), claim_narrative, policy_text).await?;

        // Two decimals in the reported score; the combination rule uses the
        // raw value.
        let combined_risk = combine_risk(&text_judgment, similarity);

        tracing::info!(
            tier = %text_judgment.tier,
            similarity = similarity,
            combined = ?combined_risk,
            "Fraud assessment complete"
        );

        Ok(FraudAssessment {
            text_judgment,
            similarity_score: (similarity * 100.0).round() / 100.0,
            combined_risk,
        })
    }
}
