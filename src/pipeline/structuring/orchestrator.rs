use std::sync::Arc;

use uuid::Uuid;

use super::parser::parse_report_response;
use super::prompt::build_report_prompt;
use super::types::{LlmClient, ModelPrompt, StructuringOutcome};
use super::StructuringError;

/// Turns consent-filtered bill text into a report:
/// prompt → one model call → parse (raw fallback).
pub struct BillStructurer {
    llm: Arc<dyn LlmClient + Send + Sync>,
    model_name: String,
}

impl BillStructurer {
    pub fn new(llm: Arc<dyn LlmClient + Send + Sync>, model_name: &str) -> Self {
        Self {
            llm,
            model_name: model_name.to_string(),
        }
    }

    /// Model and network failures propagate; an unreadable answer does not.
    pub fn structure(
        &self,
        bill_id: &Uuid,
        bill_text: &str,
    ) -> Result<StructuringOutcome, StructuringError> {
        let prompt = build_report_prompt(bill_text);

        tracing::info!(
            bill_id = %bill_id,
            model = %self.model_name,
            prompt_chars = prompt.chars().count(),
            "Requesting structured report"
        );

        let response = self
            .llm
            .generate(&self.model_name, &ModelPrompt::Text(&prompt))?;

        let outcome = parse_report_response(&response);
        if let StructuringOutcome::Unparsed { reason, .. } = &outcome {
            tracing::warn!(
                bill_id = %bill_id,
                reason = %reason,
                "Model response was not JSON, keeping raw text"
            );
        }
        Ok(outcome)
    }
}
