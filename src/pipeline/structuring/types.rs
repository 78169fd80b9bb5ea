use crate::models::{BillReport, StructuredReport};

use super::StructuringError;

/// One request to the generative model.
#[derive(Debug, Clone, Copy)]
pub enum ModelPrompt<'a> {
    /// Plain text prompt
    Text(&'a str),
    /// A document sent inline alongside an instruction
    Document {
        mime_type: &'a str,
        data: &'a [u8],
        instruction: &'a str,
    },
}

/// Generative model client abstraction (allows mocking)
pub trait LlmClient {
    fn generate(&self, model: &str, prompt: &ModelPrompt<'_>) -> Result<String, StructuringError>;
}

/// Outcome of a structuring call that reached the model.
///
/// `Unparsed` is a degraded success: the model answered but no JSON object
/// could be read from its response.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuringOutcome {
    Structured(StructuredReport),
    Unparsed { raw: String, reason: String },
}

impl StructuringOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Unparsed { .. })
    }

    pub fn into_report(self) -> BillReport {
        match self {
            Self::Structured(report) => BillReport::Structured(report),
            Self::Unparsed { raw, .. } => BillReport::Unparsed { raw },
        }
    }
}
