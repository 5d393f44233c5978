//! Text-risk analysis of the claim narrative.
//!
//! The model is instructed to answer with strict JSON; model output being
//! free text, the parse is defensive: extract the first brace-balanced
//! object, and fall back to a fixed medium-risk judgment when nothing
//! parses. A risk-analysis step must never abort the pipeline on malformed
//! model output, so parse failure is a value here, not an error.

use serde::{Deserialize, Serialize};

use crate::providers::{GenerationError, TextGenerator};

const RISK_TEMPERATURE: f32 = 0.0;
const RISK_MAX_TOKENS: u32 = 300;

/// Structured risk judgment parsed from the model response.
///
/// `tier` is passed through verbatim — enum membership is deliberately not
/// validated here, and callers must tolerate unexpected tier strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskJudgment {
    #[serde(rename = "fraud_risk")]
    pub tier: String,
    pub reasons: Vec<String>,
    pub verification_needed: bool,
}

impl RiskJudgment {
    /// The fallback judgment returned when the model response cannot be
    /// parsed: medium risk, flagged for human verification.
    pub fn fallback() -> Self {
        Self {
            tier: "medium".to_string(),
            reasons: vec!["parse failure".to_string()],
            verification_needed: true,
        }
    }
}

/// Tagged parse result — the rest of the system branches on this, never on
/// string content.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedJudgment {
    Parsed(RiskJudgment),
    Fallback,
}

impl ParsedJudgment {
    pub fn into_judgment(self) -> RiskJudgment {
        match self {
            Self::Parsed(judgment) => judgment,
            Self::Fallback => RiskJudgment::fallback(),
        }
    }
}

/// Run the text-risk analysis over a claim narrative.
///
/// An empty narrative is a valid degenerate input. Transport failures
/// propagate; parse failures do not (see `parse_risk_response`).
pub async fn analyze_claim_text(
    generator: &dyn TextGenerator,
    narrative: &str,
) -> Result<RiskJudgment, GenerationError> {
    let prompt = build_risk_prompt(narrative);
    let raw = generator
        .generate(&prompt, RISK_TEMPERATURE, RISK_MAX_TOKENS)
        .await?;

    let parsed = parse_risk_response(&raw);
    if matches!(parsed, ParsedJudgment::Fallback) {
        tracing::warn!("Risk analysis response did not parse — using fallback judgment");
    }
    Ok(parsed.into_judgment())
}

fn build_risk_prompt(narrative: &str) -> String {
    format!(
        r#"Analyze this insurance claim for fraud risk. Respond ONLY with valid JSON:
{{
    "fraud_risk": "low/medium/high",
    "reasons": ["list", "of", "reasons"],
    "verification_needed": bool
}}

Claim: {narrative}

JSON:"#
    )
}

/// Parse a free-text model response into a risk judgment.
///
/// Contract: extract the first brace-balanced JSON object; if none exists
/// or it fails structural parse, return `Fallback`. On success the three
/// fields pass through verbatim.
pub fn parse_risk_response(raw: &str) -> ParsedJudgment {
    let Some(json_str) = extract_json_object(raw) else {
        return ParsedJudgment::Fallback;
    };

    match serde_json::from_str::<RiskJudgment>(json_str) {
        Ok(judgment) => ParsedJudgment::Parsed(judgment),
        Err(_) => ParsedJudgment::Fallback,
    }
}

/// The first brace-balanced `{...}` substring, if any.
///
/// Scans from the first `{` tracking brace depth, honoring JSON string
/// literals and escapes so braces inside strings don't count.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}
