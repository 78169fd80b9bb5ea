use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{BillState, ExtractionMethod, PiiKind};
use super::report::BillReport;

/// One detected personal-data span, in the order it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiiMatch {
    #[serde(rename = "type")]
    pub kind: PiiKind,
    #[serde(rename = "match")]
    pub matched: String,
}

impl PiiMatch {
    pub fn new(kind: PiiKind, matched: impl Into<String>) -> Self {
        Self {
            kind,
            matched: matched.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    pub owner_id: String,
    pub filename: String,
    pub path: String,
    pub uploaded_at: DateTime<Utc>,
    pub text_extract: String,
    pub redacted_text: String,
    pub pii: Vec<PiiMatch>,
    pub include_pii: bool,
    pub extraction_method: Option<ExtractionMethod>,
    pub extracted_at: Option<DateTime<Utc>>,
    pub processed_report: Option<BillReport>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Bill {
    /// A freshly uploaded bill: no text, no PII, no consent, no report.
    pub fn new(owner_id: &str, filename: &str, path: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            filename: filename.to_string(),
            path: path.to_string(),
            uploaded_at: Utc::now(),
            text_extract: String::new(),
            redacted_text: String::new(),
            pii: Vec::new(),
            include_pii: false,
            extraction_method: None,
            extracted_at: None,
            processed_report: None,
            processed_at: None,
        }
    }

    pub fn state(&self) -> BillState {
        if self.processed_report.is_some() {
            BillState::Processed
        } else if self.extracted_at.is_some() {
            BillState::Extracted
        } else {
            BillState::Uploaded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_bill_starts_uploaded() {
        let bill = Bill::new("user-1", "march.pdf", "/tmp/uploads/1-a-march.pdf");
        assert_eq!(bill.state(), BillState::Uploaded);
        assert!(!bill.include_pii);
        assert!(bill.pii.is_empty());
        assert!(bill.text_extract.is_empty());
    }

    #[test]
    fn state_follows_derived_fields() {
        let mut bill = Bill::new("user-1", "march.pdf", "/p");
        bill.extracted_at = Some(Utc::now());
        assert_eq!(bill.state(), BillState::Extracted);
        bill.processed_report = Some(BillReport::Unparsed { raw: "x".into() });
        assert_eq!(bill.state(), BillState::Processed);
    }

    #[test]
    fn pii_match_serializes_with_wire_names() {
        let m = PiiMatch::new(PiiKind::Email, "jane@x.com");
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json, serde_json::json!({"type": "email", "match": "jane@x.com"}));
    }
}
