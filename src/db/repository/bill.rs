use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::ExtractionMethod;
use crate::models::*;

pub fn insert_bill(conn: &Connection, bill: &Bill) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO bills (id, owner_id, filename, path, uploaded_at, text_extract,
         redacted_text, pii, include_pii, extraction_method, extracted_at,
         processed_report, processed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            bill.id.to_string(),
            bill.owner_id,
            bill.filename,
            bill.path,
            bill.uploaded_at.to_rfc3339(),
            bill.text_extract,
            bill.redacted_text,
            serde_json::to_string(&bill.pii)?,
            bill.include_pii as i32,
            bill.extraction_method.map(|m| m.as_str()),
            bill.extracted_at.map(|t| t.to_rfc3339()),
            bill.processed_report
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            bill.processed_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    tracing::info!(bill_id = %bill.id, "Bill record created");
    Ok(())
}

pub fn get_bill(conn: &Connection, id: &Uuid) -> Result<Option<Bill>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, filename, path, uploaded_at, text_extract, redacted_text,
         pii, include_pii, extraction_method, extracted_at, processed_report, processed_at
         FROM bills WHERE id = ?1"
    )?;

    let result = stmt.query_row(params![id.to_string()], |row| {
        Ok(BillRow {
            id: row.get::<_, String>(0)?,
            owner_id: row.get::<_, String>(1)?,
            filename: row.get::<_, String>(2)?,
            path: row.get::<_, String>(3)?,
            uploaded_at: row.get::<_, String>(4)?,
            text_extract: row.get::<_, String>(5)?,
            redacted_text: row.get::<_, String>(6)?,
            pii: row.get::<_, String>(7)?,
            include_pii: row.get::<_, i32>(8)?,
            extraction_method: row.get::<_, Option<String>>(9)?,
            extracted_at: row.get::<_, Option<String>>(10)?,
            processed_report: row.get::<_, Option<String>>(11)?,
            processed_at: row.get::<_, Option<String>>(12)?,
        })
    });

    match result {
        Ok(row) => Ok(Some(bill_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Overwrite every extraction-derived column in one statement.
/// Previous PII entries never survive a re-run.
pub fn update_bill_extraction(
    conn: &Connection,
    id: &Uuid,
    text_extract: &str,
    redacted_text: &str,
    pii: &[PiiMatch],
    method: ExtractionMethod,
    extracted_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE bills SET text_extract = ?1, redacted_text = ?2, pii = ?3,
         extraction_method = ?4, extracted_at = ?5 WHERE id = ?6",
        params![
            text_extract,
            redacted_text,
            serde_json::to_string(pii)?,
            method.as_str(),
            extracted_at.to_rfc3339(),
            id.to_string(),
        ],
    )?;
    ensure_updated(updated, id)?;
    tracing::info!(
        bill_id = %id,
        method = method.as_str(),
        pii_count = pii.len(),
        "Bill extraction stored"
    );
    Ok(())
}

pub fn update_bill_consent(
    conn: &Connection,
    id: &Uuid,
    include_pii: bool,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE bills SET include_pii = ?1 WHERE id = ?2",
        params![include_pii as i32, id.to_string()],
    )?;
    ensure_updated(updated, id)?;
    tracing::info!(bill_id = %id, include_pii, "Bill consent recorded");
    Ok(())
}

pub fn update_bill_report(
    conn: &Connection,
    id: &Uuid,
    report: &BillReport,
    processed_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE bills SET processed_report = ?1, processed_at = ?2 WHERE id = ?3",
        params![
            serde_json::to_string(report)?,
            processed_at.to_rfc3339(),
            id.to_string(),
        ],
    )?;
    ensure_updated(updated, id)?;
    tracing::info!(bill_id = %id, structured = report.is_structured(), "Bill report stored");
    Ok(())
}

fn ensure_updated(updated: usize, id: &Uuid) -> Result<(), DatabaseError> {
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Bill".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

// Internal row type for Bill mapping
struct BillRow {
    id: String,
    owner_id: String,
    filename: String,
    path: String,
    uploaded_at: String,
    text_extract: String,
    redacted_text: String,
    pii: String,
    include_pii: i32,
    extraction_method: Option<String>,
    extracted_at: Option<String>,
    processed_report: Option<String>,
    processed_at: Option<String>,
}

fn bill_from_row(row: BillRow) -> Result<Bill, DatabaseError> {
    Ok(Bill {
        id: Uuid::parse_str(&row.id).map_err(|e| DatabaseError::CorruptColumn {
            column: "id",
            reason: e.to_string(),
        })?,
        owner_id: row.owner_id,
        filename: row.filename,
        path: row.path,
        uploaded_at: parse_timestamp("uploaded_at", &row.uploaded_at)?,
        text_extract: row.text_extract,
        redacted_text: row.redacted_text,
        pii: serde_json::from_str(&row.pii)?,
        include_pii: row.include_pii != 0,
        extraction_method: row
            .extraction_method
            .as_deref()
            .map(ExtractionMethod::from_str)
            .transpose()?,
        extracted_at: row
            .extracted_at
            .as_deref()
            .map(|t| parse_timestamp("extracted_at", t))
            .transpose()?,
        processed_report: row
            .processed_report
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
        processed_at: row
            .processed_at
            .as_deref()
            .map(|t| parse_timestamp("processed_at", t))
            .transpose()?,
    })
}

fn parse_timestamp(column: &'static str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptColumn {
            column,
            reason: e.to_string(),
        })
}
