use uuid::Uuid;

use super::types::{BillTextSource, ExtractionOutcome, ExtractionStrategy, SourceDocument};

/// Concrete implementation of the text extractor.
/// Uses trait objects for each source, enabling dependency injection.
pub struct BillTextExtractor {
    strategy: ExtractionStrategy,
    local: Box<dyn BillTextSource + Send + Sync>,
    model: Option<Box<dyn BillTextSource + Send + Sync>>,
}

impl BillTextExtractor {
    pub fn new(strategy: ExtractionStrategy, local: Box<dyn BillTextSource + Send + Sync>) -> Self {
        Self {
            strategy,
            local,
            model: None,
        }
    }

    /// Add the model OCR source used by the `model` and `local_then_model` strategies.
    pub fn with_model_ocr(mut self, model: Box<dyn BillTextSource + Send + Sync>) -> Self {
        self.model = Some(model);
        self
    }

    fn sources(&self) -> Vec<&(dyn BillTextSource + Send + Sync)> {
        let local = Some(self.local.as_ref());
        let model = self.model.as_deref();
        match self.strategy {
            ExtractionStrategy::Local => local.into_iter().collect(),
            ExtractionStrategy::Model => model.into_iter().collect(),
            ExtractionStrategy::LocalThenModel => local.into_iter().chain(model).collect(),
        }
    }

    /// Try each configured source in order; the first non-blank text wins.
    /// Never fails: exhausting the sources yields a degraded outcome.
    pub fn extract(&self, bill_id: &Uuid, document: &SourceDocument<'_>) -> ExtractionOutcome {
        tracing::info!(
            bill_id = %bill_id,
            strategy = self.strategy.as_str(),
            size = document.bytes.len(),
            "Starting text extraction"
        );

        let mut reasons = Vec::new();
        for source in self.sources() {
            let method = source.method();
            match source.extract_text(document) {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::info!(
                        bill_id = %bill_id,
                        method = method.as_str(),
                        chars = text.chars().count(),
                        "Text extracted"
                    );
                    return ExtractionOutcome::Extracted { text, method };
                }
                Ok(_) => reasons.push(format!("{}: no text found", method.as_str())),
                Err(e) => {
                    tracing::debug!(
                        bill_id = %bill_id,
                        method = method.as_str(),
                        error = %e,
                        "Extraction source failed"
                    );
                    reasons.push(format!("{}: {e}", method.as_str()));
                }
            }
        }

        if reasons.is_empty() {
            reasons.push("no extraction source configured".to_string());
        }
        tracing::warn!(bill_id = %bill_id, reasons = ?reasons, "Extraction degraded to empty text");
        ExtractionOutcome::Degraded { reasons }
    }
}
