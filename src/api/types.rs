//! Shared types for the bill API layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::enums::{BillState, ExtractionMethod};
use crate::models::{Bill, BillReport, PiiMatch};
use crate::pipeline::processor::{BillProcessor, ProcessingError};

use super::error::ApiError;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub processor: Arc<BillProcessor>,
    pub max_upload_bytes: usize,
}

impl ApiContext {
    pub fn new(processor: Arc<BillProcessor>, max_upload_bytes: usize) -> Self {
        Self {
            processor,
            max_upload_bytes,
        }
    }

    /// Run a synchronous pipeline operation on the blocking pool.
    pub async fn run_blocking<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&BillProcessor) -> Result<T, ProcessingError> + Send + 'static,
        T: Send + 'static,
    {
        let processor = self.processor.clone();
        tokio::task::spawn_blocking(move || op(&processor))
            .await
            .map_err(|e| ApiError::Internal(format!("Pipeline task failed: {e}")))?
            .map_err(ApiError::from)
    }
}

/// Public path of a bill's rendered report.
pub fn report_url(id: &Uuid) -> String {
    format!("/api/bills/{id}/report")
}

/// Bill as returned by `GET /api/bills/:id`.
#[derive(Debug, Serialize)]
pub struct BillView {
    pub id: Uuid,
    pub owner_id: String,
    pub filename: String,
    pub state: BillState,
    pub uploaded_at: DateTime<Utc>,
    pub text_extract: String,
    pub redacted_text: String,
    pub pii: Vec<PiiMatch>,
    pub include_pii: bool,
    pub extraction_method: Option<ExtractionMethod>,
    pub extracted_at: Option<DateTime<Utc>>,
    pub processed_report: Option<BillReport>,
    pub processed_at: Option<DateTime<Utc>>,
    pub report_pdf: Option<String>,
}

impl From<Bill> for BillView {
    fn from(bill: Bill) -> Self {
        let state = bill.state();
        let report_pdf = bill.processed_report.as_ref().map(|_| report_url(&bill.id));
        Self {
            id: bill.id,
            owner_id: bill.owner_id,
            filename: bill.filename,
            state,
            uploaded_at: bill.uploaded_at,
            text_extract: bill.text_extract,
            redacted_text: bill.redacted_text,
            pii: bill.pii,
            include_pii: bill.include_pii,
            extraction_method: bill.extraction_method,
            extracted_at: bill.extracted_at,
            processed_report: bill.processed_report,
            processed_at: bill.processed_at,
            report_pdf,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::Path;
    use std::sync::Arc;

    use super::ApiContext;
    use crate::config::ServiceConfig;
    use crate::pipeline::extraction::{
        BillTextExtractor, ExtractionStrategy, ModelOcrExtractor, PdfTextExtractor,
    };
    use crate::pipeline::import::UploadStore;
    use crate::pipeline::processor::BillProcessor;
    use crate::pipeline::report::ReportStore;
    use crate::pipeline::structuring::{BillStructurer, MockLlmClient};

    pub(crate) const TEST_UPLOAD_LIMIT: usize = 64 * 1024;

    /// Context over a temp data dir. Non-PDF uploads OCR to `ocr_text`;
    /// the report model answers `report_json`.
    pub(crate) fn test_context(dir: &Path, ocr_text: &str, report_json: &str) -> ApiContext {
        let config = ServiceConfig::with_data_dir(dir);
        let extractor =
            BillTextExtractor::new(ExtractionStrategy::LocalThenModel, Box::new(PdfTextExtractor))
                .with_model_ocr(Box::new(ModelOcrExtractor::new(
                    Arc::new(MockLlmClient::new(ocr_text)),
                    "ocr-model",
                )));
        let processor = BillProcessor::new(
            config.database_path(),
            UploadStore::new(&config.uploads_dir(), TEST_UPLOAD_LIMIT),
            ReportStore::new(&config.reports_dir()),
            extractor,
            BillStructurer::new(Arc::new(MockLlmClient::new(report_json)), "report-model"),
        );
        ApiContext::new(Arc::new(processor), TEST_UPLOAD_LIMIT)
    }
}
