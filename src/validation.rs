//! Claim validation — a fixed six-point checklist judged by the LLM against
//! retrieved policy passages, plus one overall recommendation.

use std::sync::Arc;

use regex::Regex;
use serde::Serialize;

use crate::claim::ClaimRecord;
use crate::providers::{GenerationError, TextGenerator};
use crate::retrieval::RetrievalOutcome;

const VALIDATION_TEMPERATURE: f32 = 0.0;
const VALIDATION_MAX_TOKENS: u32 = 800;

/// The checklist, in fixed order. Output preserves this order — tests and
/// reviewers rely on stable indices.
pub const CHECKLIST: [&str; 6] = [
    "Is the policy number present and well-formed?",
    "Is the policy active on the treatment date?",
    "Does the diagnosis code match the treatment description?",
    "Is the claim amount reasonable according to the policy guidelines?",
    "Does the policy coverage support this treatment?",
    "Is there anything suspicious or unusual given these policies?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
    Indeterminate,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistItem {
    pub question_index: usize,
    pub answer: Answer,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Approve,
    Flag,
    Deny,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub checklist: Vec<ChecklistItem>,
    pub recommendation: Recommendation,
    pub rationale: String,
    /// True when no policy context was retrieved. The validation still ran,
    /// but consumers should treat the recommendation as lower-confidence.
    pub context_was_empty: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Validation engine. Retrieval happens upstream (the orchestrator passes
/// the outcome in) so the same policy context also feeds fraud assessment.
pub struct ValidationEngine {
    generator: Arc<dyn TextGenerator>,
}

impl ValidationEngine {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Validate a claim against retrieved policy passages.
    ///
    /// Runs even when the retrieval outcome is empty — the result then
    /// carries `context_was_empty: true` instead of being suppressed.
    pub async fn validate(
        &self,
        claim: &ClaimRecord,
        retrieval: &RetrievalOutcome,
    ) -> Result<ValidationResult, ValidationError> {
        let context_was_empty = retrieval.is_empty();
        if context_was_empty {
            tracing::warn!("Validating without policy context — recommendation is lower-confidence");
        }

        let prompt = build_validation_prompt(&claim.fields_json(), &retrieval.joined_passages());
        let raw = self
            .generator
            .generate(&prompt, VALIDATION_TEMPERATURE, VALIDATION_MAX_TOKENS)
            .await?;

        Ok(parse_validation_response(&raw, context_was_empty))
    }
}

fn build_validation_prompt(claim_json: &str, retrieved_policies: &str) -> String {
    let checks = CHECKLIST
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, q))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an expert insurance claim validator.
Below is an insurance claim JSON:
{claim_json}

Here are relevant policy guideline excerpts:
{retrieved_policies}

Please check:
{checks}

For each check, answer Yes/No with a brief explanation, one numbered line per check.
Finally, recommend one of: APPROVE, FLAG, or DENY — and explain why."#
    )
}

/// Parse the model's free-text answer into a structured result.
///
/// Lenient by contract: a checklist item the response does not address (or
/// addresses unintelligibly) becomes `Indeterminate`, and a missing
/// recommendation becomes `Flag`. Checklist order is always preserved.
pub fn parse_validation_response(raw: &str, context_was_empty: bool) -> ValidationResult {
    // One numbered line per check, e.g. "3. No — the diagnosis code ..."
    let item_re = Regex::new(r"(?m)^\s*(?:[*#>-]\s*)*(\d)[.):]\s*(.+)$").unwrap();

    let mut lines: [Option<String>; 6] = Default::default();
    for caps in item_re.captures_iter(raw) {
        let number: usize = caps[1].parse().unwrap_or(0);
        if (1..=CHECKLIST.len()).contains(&number) && lines[number - 1].is_none() {
            lines[number - 1] = Some(caps[2].trim().to_string());
        }
    }

    let checklist = lines
        .iter()
        .enumerate()
        .map(|(index, line)| match line {
            Some(text) => {
                let (answer, explanation) = split_answer(text);
                ChecklistItem {
                    question_index: index,
                    answer,
                    explanation,
                }
            }
            None => ChecklistItem {
                question_index: index,
                answer: Answer::Indeterminate,
                explanation: "Not addressed in model response".to_string(),
            },
        })
        .collect();

    let (recommendation, rationale) = parse_recommendation(raw);

    ValidationResult {
        checklist,
        recommendation,
        rationale,
        context_was_empty,
    }
}

/// Split one checklist line into its Yes/No verdict and explanation.
fn split_answer(line: &str) -> (Answer, String) {
    let cleaned = line.trim_start_matches(['*', '_', ' ']);
    let lower = cleaned.to_ascii_lowercase();

    let (answer, token_len) = if lower.starts_with("yes") {
        (Answer::Yes, 3)
    } else if lower.starts_with("no") && !lower.starts_with("not") {
        (Answer::No, 2)
    } else if lower.starts_with("indeterminate") {
        (Answer::Indeterminate, "indeterminate".len())
    } else {
        return (Answer::Indeterminate, cleaned.to_string());
    };

    let explanation = cleaned[token_len..]
        .trim_start_matches(['*', '_'])
        .trim_start_matches([':', ',', '.', ';', '-', '—', ' '])
        .trim()
        .to_string();
    (answer, explanation)
}

/// Find the overall recommendation: the last line mentioning exactly one of
/// the three verdict tokens. Lines listing several (e.g. the model echoing
/// "APPROVE, FLAG, or DENY") are skipped.
fn parse_recommendation(raw: &str) -> (Recommendation, String) {
    for line in raw.lines().rev() {
        let hits: Vec<Recommendation> = [
            ("APPROVE", Recommendation::Approve),
            ("FLAG", Recommendation::Flag),
            ("DENY", Recommendation::Deny),
        ]
        .iter()
        .filter(|(token, _)| line.contains(token))
        .map(|(_, rec)| *rec)
        .collect();

        if let [only] = hits[..] {
            return (only, line.trim().to_string());
        }
    }

    (
        Recommendation::Flag,
        "Model response did not include a recommendation".to_string(),
    )
}
