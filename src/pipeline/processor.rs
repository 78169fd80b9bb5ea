//! Bill processing orchestrator.
//!
//! Drives each bill through its states:
//! upload → extract (text + redaction) → consent → process (model + report).
//!
//! Uses trait-based DI for the text sources and the model client so the
//! orchestrator stays testable with mock implementations. Every operation
//! opens its own database connection.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::db::{self, repository, DatabaseError};
use crate::models::enums::ExtractionMethod;
use crate::models::{Bill, BillReport, PiiMatch};
use crate::pipeline::extraction::{
    BillTextExtractor, ModelOcrExtractor, PdfTextExtractor, SourceDocument,
};
use crate::pipeline::import::{UploadError, UploadStore};
use crate::pipeline::redaction::redact_pii;
use crate::pipeline::report::{render_report, ReportError, ReportStore};
use crate::pipeline::structuring::{BillStructurer, LlmClient, StructuringError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("An owner id is required to upload a bill")]
    MissingOwner,

    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Bill not found: {0}")]
    BillNotFound(Uuid),

    #[error("Bill {0} is already being extracted or processed")]
    BillBusy(Uuid),

    #[error("Model call failed: {0}")]
    Model(#[from] StructuringError),

    #[error("No report has been generated for bill {0}")]
    ReportNotGenerated(Uuid),

    #[error("Report failed: {0}")]
    Report(#[from] ReportError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

/// An upload as received from the transport; any part may be missing.
#[derive(Debug, Default)]
pub struct IncomingBill {
    pub owner_id: Option<String>,
    pub filename: Option<String>,
    pub bytes: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub id: Uuid,
    pub filename: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub id: Uuid,
    pub text: String,
    pub redacted: String,
    pub pii: Vec<PiiMatch>,
    pub method: ExtractionMethod,
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsentReceipt {
    pub id: Uuid,
    pub include_pii: bool,
}

#[derive(Debug, Clone)]
pub struct ProcessReceipt {
    pub id: Uuid,
    pub report: BillReport,
    pub processed_at: DateTime<Utc>,
    pub report_path: PathBuf,
}

// ---------------------------------------------------------------------------
// Per-bill guard
// ---------------------------------------------------------------------------

/// Held while a bill is being extracted or processed; released on drop.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<Uuid>>,
    id: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.id);
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct BillProcessor {
    db_path: PathBuf,
    uploads: UploadStore,
    reports: ReportStore,
    extractor: BillTextExtractor,
    structurer: BillStructurer,
    in_flight: Mutex<HashSet<Uuid>>,
}

impl BillProcessor {
    pub fn new(
        db_path: PathBuf,
        uploads: UploadStore,
        reports: ReportStore,
        extractor: BillTextExtractor,
        structurer: BillStructurer,
    ) -> Self {
        Self {
            db_path,
            uploads,
            reports,
            extractor,
            structurer,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Wire the production pipeline from settings and a model client.
    pub fn from_config(config: &ServiceConfig, llm: Arc<dyn LlmClient + Send + Sync>) -> Self {
        let extractor = BillTextExtractor::new(config.extraction, Box::new(PdfTextExtractor))
            .with_model_ocr(Box::new(ModelOcrExtractor::new(
                llm.clone(),
                &config.gemini_ocr_model,
            )));
        let structurer = BillStructurer::new(llm, &config.gemini_model);

        Self::new(
            config.database_path(),
            UploadStore::new(&config.uploads_dir(), config.max_upload_bytes),
            ReportStore::new(&config.reports_dir()),
            extractor,
            structurer,
        )
    }

    fn connect(&self) -> Result<Connection, ProcessingError> {
        Ok(db::open_database(&self.db_path)?)
    }

    fn claim(&self, id: Uuid) -> Result<InFlightGuard<'_>, ProcessingError> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(id) {
            tracing::warn!(bill_id = %id, "Rejected concurrent pipeline run");
            return Err(ProcessingError::BillBusy(id));
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            id,
        })
    }

    fn load_bill(&self, conn: &Connection, id: &Uuid) -> Result<Bill, ProcessingError> {
        repository::get_bill(conn, id)?.ok_or(ProcessingError::BillNotFound(*id))
    }

    /// Store the raw bytes and create the bill record.
    pub fn upload(&self, incoming: IncomingBill) -> Result<UploadReceipt, ProcessingError> {
        let owner_id = incoming
            .owner_id
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .ok_or(ProcessingError::MissingOwner)?;
        let bytes = incoming.bytes.ok_or(UploadError::MissingFile)?;
        let filename = incoming
            .filename
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| "bill".to_string());

        let conn = self.connect()?;
        let stored = self.uploads.store(&filename, &bytes)?;
        let bill = Bill::new(owner_id, &filename, &stored.to_string_lossy());

        if let Err(e) = repository::insert_bill(&conn, &bill) {
            if let Err(cleanup) = std::fs::remove_file(&stored) {
                tracing::warn!(error = %cleanup, "Could not remove orphaned upload");
            }
            return Err(e.into());
        }

        tracing::info!(bill_id = %bill.id, size = bytes.len(), "Bill uploaded");
        Ok(UploadReceipt {
            id: bill.id,
            filename: bill.filename,
            path: bill.path,
        })
    }

    /// Extract text from the stored bytes, redact it, and overwrite the
    /// derived fields. Extraction failures degrade to empty text.
    pub fn extract(&self, id: &Uuid) -> Result<ExtractionReport, ProcessingError> {
        let _guard = self.claim(*id)?;
        let conn = self.connect()?;
        let bill = self.load_bill(&conn, id)?;

        let bytes = self.uploads.read(bill.path.as_ref())?;
        let outcome = self.extractor.extract(
            id,
            &SourceDocument {
                filename: &bill.filename,
                bytes: &bytes,
            },
        );
        let redaction = redact_pii(Some(outcome.text()));
        let method = outcome.method();

        repository::update_bill_extraction(
            &conn,
            id,
            outcome.text(),
            &redaction.redacted,
            &redaction.pii,
            method,
            Utc::now(),
        )
        .map_err(|e| not_found_as_bill(e, id))?;

        Ok(ExtractionReport {
            id: *id,
            degraded: outcome.is_degraded(),
            text: outcome.text().to_string(),
            redacted: redaction.redacted,
            pii: redaction.pii,
            method,
        })
    }

    /// Upload then extract in one call.
    pub fn upload_and_extract(
        &self,
        incoming: IncomingBill,
    ) -> Result<(UploadReceipt, ExtractionReport), ProcessingError> {
        let receipt = self.upload(incoming)?;
        let extraction = self.extract(&receipt.id)?;
        Ok((receipt, extraction))
    }

    /// Record the consent decision. Allowed in any state.
    pub fn set_consent(
        &self,
        id: &Uuid,
        include_pii: bool,
    ) -> Result<ConsentReceipt, ProcessingError> {
        let conn = self.connect()?;
        repository::update_bill_consent(&conn, id, include_pii)
            .map_err(|e| not_found_as_bill(e, id))?;
        Ok(ConsentReceipt {
            id: *id,
            include_pii,
        })
    }

    /// Ask the model for a structured report, render it and persist it.
    ///
    /// Consent is read at call time. Without it only redacted text is sent.
    /// A failed model call leaves the bill and its artifact untouched.
    pub fn process(&self, id: &Uuid) -> Result<ProcessReceipt, ProcessingError> {
        let _guard = self.claim(*id)?;
        let mut conn = self.connect()?;
        let bill = self.load_bill(&conn, id)?;

        let prompt_text = if !bill.text_extract.is_empty() {
            if bill.include_pii {
                bill.text_extract.clone()
            } else {
                bill.redacted_text.clone()
            }
        } else {
            let fallback = self.raw_text_fallback(&bill);
            if bill.include_pii {
                fallback
            } else {
                redact_pii(Some(&fallback)).redacted
            }
        };

        let outcome = self.structurer.structure(id, &prompt_text)?;
        let report = outcome.into_report();
        let processed_at = Utc::now();

        // Record and artifact change together or not at all
        let pdf = render_report(id, &bill.filename, &report, processed_at)?;
        let staged = self.reports.stage(id, &pdf)?;

        let tx = conn.transaction().map_err(DatabaseError::from)?;
        repository::update_bill_report(&tx, id, &report, processed_at)
            .map_err(|e| not_found_as_bill(e, id))?;
        let published = staged.publish()?;
        if let Err(e) = tx.commit() {
            if let Err(rollback) = published.rollback() {
                tracing::error!(
                    bill_id = %id,
                    error = %rollback,
                    "Could not roll back report artifact"
                );
            }
            return Err(DatabaseError::from(e).into());
        }
        let report_path = published.commit();

        tracing::info!(bill_id = %id, structured = report.is_structured(), "Bill processed");
        Ok(ProcessReceipt {
            id: *id,
            report,
            processed_at,
            report_path,
        })
    }

    /// Raw upload bytes read as text, for bills that were never extracted.
    fn raw_text_fallback(&self, bill: &Bill) -> String {
        match self.uploads.read(bill.path.as_ref()) {
            Ok(bytes) => {
                tracing::warn!(bill_id = %bill.id, "No extracted text, using raw upload bytes");
                String::from_utf8_lossy(&bytes).into_owned()
            }
            Err(e) => {
                tracing::warn!(
                    bill_id = %bill.id,
                    error = %e,
                    "No extracted text and raw upload unreadable"
                );
                String::new()
            }
        }
    }

    /// The rendered report for a bill.
    pub fn fetch_report(&self, id: &Uuid) -> Result<Vec<u8>, ProcessingError> {
        let conn = self.connect()?;
        self.load_bill(&conn, id)?;
        self.reports.open(id).map_err(|e| match e {
            ReportError::NotGenerated(id) => ProcessingError::ReportNotGenerated(id),
            other => other.into(),
        })
    }

    pub fn get_bill(&self, id: &Uuid) -> Result<Bill, ProcessingError> {
        let conn = self.connect()?;
        self.load_bill(&conn, id)
    }
}

fn not_found_as_bill(e: DatabaseError, id: &Uuid) -> ProcessingError {
    match e {
        DatabaseError::NotFound { .. } => ProcessingError::BillNotFound(*id),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::models::enums::{BillState, PiiKind};
    use crate::pipeline::extraction::pdf::fixtures::text_pdf;
    use crate::pipeline::extraction::ExtractionStrategy;
    use crate::pipeline::structuring::{MockLlmClient, ModelPrompt};

    const PII_TEXT: &str = "Contact jane@x.com, acct 12345678";
    const STUB_JSON: &str = r#"{"vendor": "City Power", "total_amount": 88.2, "currency": "EUR"}"#;

    /// Non-PDF uploads fall through to model OCR, which answers `ocr_text`.
    fn processor(dir: &Path, ocr_text: &str, llm: Arc<MockLlmClient>) -> BillProcessor {
        let config = ServiceConfig::with_data_dir(dir);
        let local = Box::new(PdfTextExtractor);
        let extractor = BillTextExtractor::new(ExtractionStrategy::LocalThenModel, local)
            .with_model_ocr(Box::new(ModelOcrExtractor::new(
                Arc::new(MockLlmClient::new(ocr_text)),
                "ocr-model",
            )));
        BillProcessor::new(
            config.database_path(),
            UploadStore::new(&config.uploads_dir(), 1024 * 1024),
            ReportStore::new(&config.reports_dir()),
            extractor,
            BillStructurer::new(llm, "report-model"),
        )
    }

    fn incoming(bytes: &[u8]) -> IncomingBill {
        IncomingBill {
            owner_id: Some("user-1".into()),
            filename: Some("march.txt".into()),
            bytes: Some(bytes.to_vec()),
        }
    }

    #[test]
    fn upload_creates_record_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = processor(dir.path(), "", Arc::new(MockLlmClient::new(STUB_JSON)));

        let receipt = p.upload(incoming(b"bill bytes")).unwrap();

        assert_eq!(receipt.filename, "march.txt");
        assert_eq!(std::fs::read(&receipt.path).unwrap(), b"bill bytes");
        let bill = p.get_bill(&receipt.id).unwrap();
        assert_eq!(bill.owner_id, "user-1");
        assert_eq!(bill.state(), BillState::Uploaded);
        assert!(!bill.include_pii);
    }

    #[test]
    fn upload_rejects_missing_owner_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = processor(dir.path(), "", Arc::new(MockLlmClient::new(STUB_JSON)));

        let anonymous = IncomingBill {
            owner_id: Some("  ".into()),
            ..incoming(b"x")
        };
        assert!(matches!(p.upload(anonymous), Err(ProcessingError::MissingOwner)));

        let no_file = IncomingBill {
            bytes: None,
            ..incoming(b"")
        };
        assert!(matches!(
            p.upload(no_file),
            Err(ProcessingError::Upload(UploadError::MissingFile))
        ));

        assert!(matches!(
            p.upload(incoming(b"")),
            Err(ProcessingError::Upload(UploadError::EmptyFile))
        ));
    }

    #[test]
    fn extract_redacts_email_and_account() {
        let dir = tempfile::tempdir().unwrap();
        let p = processor(dir.path(), PII_TEXT, Arc::new(MockLlmClient::new(STUB_JSON)));
        let receipt = p.upload(incoming(b"scanned bill")).unwrap();

        let extraction = p.extract(&receipt.id).unwrap();

        assert_eq!(extraction.text, PII_TEXT);
        assert_eq!(extraction.redacted, "Contact [[REDACTED_EMAIL]], acct [[REDACTED_ACCOUNT]]");
        assert_eq!(
            extraction.pii,
            vec![
                PiiMatch::new(PiiKind::Email, "jane@x.com"),
                PiiMatch::new(PiiKind::Account, "12345678"),
            ]
        );
        assert_eq!(extraction.method, ExtractionMethod::ModelOcr);

        let bill = p.get_bill(&receipt.id).unwrap();
        assert_eq!(bill.state(), BillState::Extracted);
        assert_eq!(bill.redacted_text, extraction.redacted);
        assert_eq!(bill.pii, extraction.pii);
    }

    #[test]
    fn digital_pdf_uses_local_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let p = processor(dir.path(), "unused ocr", Arc::new(MockLlmClient::new(STUB_JSON)));
        let pdf = text_pdf(&["City Power invoice"]);
        let receipt = p
            .upload(IncomingBill {
                filename: Some("march.pdf".into()),
                ..incoming(&pdf)
            })
            .unwrap();

        let extraction = p.extract(&receipt.id).unwrap();
        assert_eq!(extraction.method, ExtractionMethod::PdfDirect);
        assert!(extraction.text.contains("City Power"));
    }

    #[test]
    fn failed_extraction_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let p = processor(dir.path(), "", Arc::new(MockLlmClient::new(STUB_JSON)));
        let receipt = p.upload(incoming(b"unreadable")).unwrap();

        let extraction = p.extract(&receipt.id).unwrap();

        assert!(extraction.degraded);
        assert_eq!(extraction.text, "");
        assert_eq!(extraction.redacted, "");
        assert!(extraction.pii.is_empty());
        assert_eq!(extraction.method, ExtractionMethod::Failed);
    }

    #[test]
    fn re_extraction_overwrites_pii() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlmClient::new(STUB_JSON));
        let first = processor(dir.path(), PII_TEXT, llm.clone());
        let receipt = first.upload(incoming(b"scan")).unwrap();
        assert_eq!(first.extract(&receipt.id).unwrap().pii.len(), 2);

        // Same store, but the second run finds no text at all
        let second = processor(dir.path(), "", llm);
        second.extract(&receipt.id).unwrap();

        let bill = second.get_bill(&receipt.id).unwrap();
        assert!(bill.pii.is_empty());
        assert_eq!(bill.text_extract, "");
        assert_eq!(bill.redacted_text, "");
    }

    #[test]
    fn no_pii_reaches_model_without_consent() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlmClient::new(STUB_JSON));
        let p = processor(dir.path(), PII_TEXT, llm.clone());
        let receipt = p.upload(incoming(b"scan")).unwrap();
        p.extract(&receipt.id).unwrap();

        p.process(&receipt.id).unwrap();

        let prompt = &llm.prompts()[0];
        assert!(!prompt.contains("jane@x.com"));
        assert!(!prompt.contains("12345678"));
        assert!(prompt.contains("[[REDACTED_EMAIL]]"));
    }

    #[test]
    fn consent_sends_original_text() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlmClient::new(STUB_JSON));
        let p = processor(dir.path(), PII_TEXT, llm.clone());
        let receipt = p.upload(incoming(b"scan")).unwrap();
        p.extract(&receipt.id).unwrap();

        let consent = p.set_consent(&receipt.id, true).unwrap();
        assert!(consent.include_pii);
        p.process(&receipt.id).unwrap();

        assert!(llm.prompts()[0].contains("jane@x.com"));
    }

    #[test]
    fn processing_before_extraction_uses_redacted_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlmClient::new(STUB_JSON));
        let p = processor(dir.path(), "", llm.clone());
        let receipt = p.upload(incoming(PII_TEXT.as_bytes())).unwrap();

        let processed = p.process(&receipt.id).unwrap();

        assert!(processed.report.is_structured());
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("Contact [[REDACTED_EMAIL]], acct [[REDACTED_ACCOUNT]]"));
        assert!(!prompt.contains("jane@x.com"));
    }

    #[test]
    fn invalid_utf8_raw_bytes_do_not_crash() {
        let dir = tempfile::tempdir().unwrap();
        let p = processor(dir.path(), "", Arc::new(MockLlmClient::new(STUB_JSON)));
        let receipt = p.upload(incoming(&[0xff, 0xfe, 0x00, 0x41])).unwrap();
        assert!(p.process(&receipt.id).is_ok());
    }

    #[test]
    fn non_json_response_still_produces_report() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlmClient::new("I cannot parse this"));
        let p = processor(dir.path(), PII_TEXT, llm);
        let receipt = p.upload(incoming(b"scan")).unwrap();
        p.extract(&receipt.id).unwrap();

        let processed = p.process(&receipt.id).unwrap();

        assert_eq!(
            processed.report,
            BillReport::Unparsed {
                raw: "I cannot parse this".into()
            }
        );
        let bill = p.get_bill(&receipt.id).unwrap();
        assert_eq!(bill.state(), BillState::Processed);
        assert!(bill.processed_at.is_some());
        let pdf = p.fetch_report(&receipt.id).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn model_failure_mutates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlmClient::failing("simulated network error"));
        let p = processor(dir.path(), PII_TEXT, llm);
        let receipt = p.upload(incoming(b"scan")).unwrap();
        p.extract(&receipt.id).unwrap();

        let result = p.process(&receipt.id);

        assert!(matches!(result, Err(ProcessingError::Model(_))));
        let bill = p.get_bill(&receipt.id).unwrap();
        assert!(bill.processed_report.is_none());
        assert!(bill.processed_at.is_none());
        assert!(matches!(
            p.fetch_report(&receipt.id),
            Err(ProcessingError::ReportNotGenerated(_))
        ));
    }

    /// Answers like the stub model, but makes the next report write fail.
    struct FailingStoreLlm {
        db_path: PathBuf,
    }

    impl LlmClient for FailingStoreLlm {
        fn generate(
            &self,
            _model: &str,
            _prompt: &ModelPrompt<'_>,
        ) -> Result<String, StructuringError> {
            let conn = db::open_database(&self.db_path).unwrap();
            conn.execute_batch(
                "CREATE TRIGGER reject_report BEFORE UPDATE OF processed_report ON bills
                 BEGIN SELECT RAISE(ABORT, 'storage down'); END;",
            )
            .unwrap();
            Ok(STUB_JSON.to_string())
        }
    }

    fn failing_store_processor(dir: &Path) -> BillProcessor {
        let mut p = processor(dir, PII_TEXT, Arc::new(MockLlmClient::new(STUB_JSON)));
        let llm = FailingStoreLlm {
            db_path: ServiceConfig::with_data_dir(dir).database_path(),
        };
        p.structurer = BillStructurer::new(Arc::new(llm), "report-model");
        p
    }

    #[test]
    fn record_failure_publishes_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let p = failing_store_processor(dir.path());
        let receipt = p.upload(incoming(b"scan")).unwrap();

        let result = p.process(&receipt.id);

        assert!(matches!(result, Err(ProcessingError::Database(_))));
        assert!(p.get_bill(&receipt.id).unwrap().processed_report.is_none());
        assert!(matches!(
            p.fetch_report(&receipt.id),
            Err(ProcessingError::ReportNotGenerated(_))
        ));
        let reports_dir = ServiceConfig::with_data_dir(dir.path()).reports_dir();
        assert_eq!(std::fs::read_dir(reports_dir).unwrap().count(), 0);
    }

    #[test]
    fn record_failure_on_reprocess_keeps_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let first = processor(dir.path(), PII_TEXT, Arc::new(MockLlmClient::new("plain answer")));
        let receipt = first.upload(incoming(b"scan")).unwrap();
        first.process(&receipt.id).unwrap();
        let published = first.fetch_report(&receipt.id).unwrap();

        let second = failing_store_processor(dir.path());
        assert!(matches!(second.process(&receipt.id), Err(ProcessingError::Database(_))));

        let bill = second.get_bill(&receipt.id).unwrap();
        assert_eq!(
            bill.processed_report,
            Some(BillReport::Unparsed {
                raw: "plain answer".into()
            })
        );
        assert_eq!(second.fetch_report(&receipt.id).unwrap(), published);
    }

    #[test]
    fn reprocessing_overwrites_report() {
        let dir = tempfile::tempdir().unwrap();
        let p = processor(dir.path(), PII_TEXT, Arc::new(MockLlmClient::new(STUB_JSON)));
        let receipt = p.upload(incoming(b"scan")).unwrap();
        let first = p.process(&receipt.id).unwrap();
        let second = p.process(&receipt.id).unwrap();
        assert_eq!(first.report_path, second.report_path);
        assert!(second.processed_at >= first.processed_at);
    }

    #[test]
    fn unknown_bill_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let p = processor(dir.path(), "", Arc::new(MockLlmClient::new(STUB_JSON)));
        let id = Uuid::new_v4();
        assert!(matches!(p.extract(&id), Err(ProcessingError::BillNotFound(_))));
        assert!(matches!(p.process(&id), Err(ProcessingError::BillNotFound(_))));
        assert!(matches!(p.set_consent(&id, true), Err(ProcessingError::BillNotFound(_))));
        assert!(matches!(p.fetch_report(&id), Err(ProcessingError::BillNotFound(_))));
    }

    #[test]
    fn concurrent_run_on_same_bill_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = processor(dir.path(), PII_TEXT, Arc::new(MockLlmClient::new(STUB_JSON)));
        let receipt = p.upload(incoming(b"scan")).unwrap();

        let held = p.claim(receipt.id).unwrap();
        assert!(matches!(p.extract(&receipt.id), Err(ProcessingError::BillBusy(_))));
        assert!(matches!(p.process(&receipt.id), Err(ProcessingError::BillBusy(_))));
        // Consent is not serialized
        assert!(p.set_consent(&receipt.id, true).is_ok());
        drop(held);

        assert!(p.extract(&receipt.id).is_ok());
    }

    #[test]
    fn upload_and_extract_returns_both() {
        let dir = tempfile::tempdir().unwrap();
        let p = processor(dir.path(), PII_TEXT, Arc::new(MockLlmClient::new(STUB_JSON)));
        let (receipt, extraction) = p.upload_and_extract(incoming(b"scan")).unwrap();
        assert_eq!(receipt.id, extraction.id);
        assert_eq!(extraction.pii.len(), 2);
    }
}
