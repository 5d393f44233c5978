//! Batch summarization for the human reviewer.
//!
//! Consumes the provider's streaming chat variant; deltas are concatenated
//! inside the provider client, so the pipeline only ever sees the complete
//! summary text.

use std::sync::Arc;

use crate::providers::{ChatMessage, GenerationError, TextGenerator};

pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Summarize the combined batch text (narratives + stringified fields).
    pub async fn summarize(&self, text: &str) -> Result<String, GenerationError> {
        let prompt = build_summary_prompt(text);
        let summary = self
            .generator
            .chat_stream(&[ChatMessage::user(prompt)])
            .await?;

        tracing::info!(chars = summary.len(), "Batch summary generated");
        Ok(summary)
    }
}

fn build_summary_prompt(text: &str) -> String {
    format!(
        r#"Below is a set of text data from insurance claim documents, including OCR-extracted text and structured data.
Please generate a clear summary with the following sections:
1. Patient Background (age, medical history, occupation)
2. Reason for the Claim (incident or illness details)
3. Additional Background (family situation, dependents, financial status)

Text:
{text}

Summary:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockGenerator;

    #[tokio::test]
    async fn summarize_returns_chat_output() {
        let generator =
            MockGenerator::new("unused").with_chat_response("1. Patient Background: ...");
        let summarizer = Summarizer::new(Arc::new(generator));

        let summary = summarizer.summarize("claim text").await.unwrap();
        assert_eq!(summary, "1. Patient Background: ...");
    }

    #[tokio::test]
    async fn summarize_propagates_transport_error() {
        let summarizer = Summarizer::new(Arc::new(MockGenerator::failing()));
        assert!(summarizer.summarize("claim text").await.is_err());
    }

    #[test]
    fn prompt_names_all_three_sections() {
        let prompt = build_summary_prompt("combined claim text");
        assert!(prompt.contains("Patient Background"));
        assert!(prompt.contains("Reason for the Claim"));
        assert!(prompt.contains("Additional Background"));
        assert!(prompt.contains("combined claim text"));
    }
}
