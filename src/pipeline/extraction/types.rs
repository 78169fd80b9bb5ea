use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ExtractionError;
use crate::models::enums::ExtractionMethod;

/// Raw upload handed to a text source.
#[derive(Debug, Clone, Copy)]
pub struct SourceDocument<'a> {
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

/// One way of turning document bytes into text (allows mocking for tests)
pub trait BillTextSource {
    fn method(&self) -> ExtractionMethod;

    fn extract_text(&self, document: &SourceDocument<'_>) -> Result<String, ExtractionError>;
}

/// Which sources run, and in what order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Local PDF parsing only
    Local,
    /// Generative-model OCR only
    Model,
    /// Local parsing, then model OCR when it yields no text
    #[default]
    LocalThenModel,
}

impl ExtractionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Model => "model",
            Self::LocalThenModel => "local_then_model",
        }
    }
}

impl FromStr for ExtractionStrategy {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "model" => Ok(Self::Model),
            "local_then_model" => Ok(Self::LocalThenModel),
            other => Err(ExtractionError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Result of an extraction run. Extraction never fails outright: when every
/// source comes up empty the outcome is `Degraded` and the text is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Extracted { text: String, method: ExtractionMethod },
    Degraded { reasons: Vec<String> },
}

impl ExtractionOutcome {
    pub fn text(&self) -> &str {
        match self {
            Self::Extracted { text, .. } => text,
            Self::Degraded { .. } => "",
        }
    }

    pub fn method(&self) -> ExtractionMethod {
        match self {
            Self::Extracted { method, .. } => *method,
            Self::Degraded { .. } => ExtractionMethod::Failed,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}
