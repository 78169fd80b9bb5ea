use std::sync::Arc;

use super::types::{BillTextSource, SourceDocument};
use super::ExtractionError;
use crate::models::enums::ExtractionMethod;
use crate::pipeline::structuring::{LlmClient, ModelPrompt};

pub const OCR_INSTRUCTION: &str =
    "Extract all text content from this PDF document. Return only the extracted text without any additional commentary.";

/// Sends the raw document inline to the generative model and asks for its text.
pub struct ModelOcrExtractor {
    llm: Arc<dyn LlmClient + Send + Sync>,
    model_name: String,
}

impl ModelOcrExtractor {
    pub fn new(llm: Arc<dyn LlmClient + Send + Sync>, model_name: &str) -> Self {
        Self {
            llm,
            model_name: model_name.to_string(),
        }
    }
}

/// Bills without a recognizable extension are sent as PDF.
fn mime_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "application/pdf".to_string())
}

impl BillTextSource for ModelOcrExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::ModelOcr
    }

    fn extract_text(&self, document: &SourceDocument<'_>) -> Result<String, ExtractionError> {
        let mime_type = mime_type_for(document.filename);
        let text = self.llm.generate(
            &self.model_name,
            &ModelPrompt::Document {
                mime_type: &mime_type,
                data: document.bytes,
                instruction: OCR_INSTRUCTION,
            },
        )?;

        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::structuring::MockLlmClient;

    #[test]
    fn returns_model_text() {
        let mock = Arc::new(MockLlmClient::new("  Water Co\nTotal 12.00  "));
        let ocr = ModelOcrExtractor::new(mock.clone(), "gemini-1.5-flash");
        let text = ocr
            .extract_text(&SourceDocument { filename: "scan.pdf", bytes: b"%PDF" })
            .unwrap();
        assert_eq!(text, "Water Co\nTotal 12.00");
        assert_eq!(mock.prompts(), vec![OCR_INSTRUCTION.to_string()]);
        assert_eq!(mock.models_called(), vec!["gemini-1.5-flash".to_string()]);
    }

    #[test]
    fn blank_model_answer_is_no_text() {
        let ocr = ModelOcrExtractor::new(Arc::new(MockLlmClient::new("   ")), "m");
        let result = ocr.extract_text(&SourceDocument { filename: "a.pdf", bytes: b"x" });
        assert!(matches!(result, Err(ExtractionError::NoText)));
    }

    #[test]
    fn model_failure_is_an_error() {
        let ocr = ModelOcrExtractor::new(Arc::new(MockLlmClient::failing("down")), "m");
        let result = ocr.extract_text(&SourceDocument { filename: "a.pdf", bytes: b"x" });
        assert!(matches!(result, Err(ExtractionError::ModelOcr(_))));
    }

    #[test]
    fn mime_type_follows_extension() {
        assert_eq!(mime_type_for("bill.pdf"), "application/pdf");
        assert_eq!(mime_type_for("photo.png"), "image/png");
        assert_eq!(mime_type_for("noext"), "application/pdf");
    }
}
