//! Fraud-risk assessment: a text-analysis signal combined with an
//! embedding-similarity signal.

pub mod analyzer;
pub mod engine;
pub mod similarity;

pub use analyzer::{ParsedJudgment, RiskJudgment};
pub use engine::{FraudAssessment, FraudEngine, FraudError, RiskTier};
