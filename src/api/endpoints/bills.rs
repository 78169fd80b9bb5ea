//! Bill endpoints: upload, extraction, consent, processing and report download.
//!
//! Handlers only translate HTTP into `BillProcessor` calls. The pipeline is
//! synchronous (SQLite, blocking model client) and runs on the blocking pool.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{report_url, ApiContext, BillView};
use crate::models::enums::ExtractionMethod;
use crate::models::PiiMatch;
use crate::pipeline::processor::{ConsentReceipt, ExtractionReport, IncomingBill, UploadReceipt};

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub id: Uuid,
    pub filename: String,
    pub path: String,
    pub text: String,
    pub redacted: String,
    pub pii: Vec<PiiMatch>,
    pub method: ExtractionMethod,
    pub degraded: bool,
}

#[derive(Debug, Deserialize)]
pub struct ConsentRequest {
    #[serde(default, alias = "includePII")]
    pub include_pii: bool,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub id: Uuid,
    pub report_pdf: String,
    pub structured: bool,
    pub processed_at: DateTime<Utc>,
}

/// `POST /api/bills`: store the upload and create the bill record.
pub async fn upload(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<UploadReceipt>, ApiError> {
    let incoming = read_upload(multipart).await?;
    let receipt = ctx.run_blocking(move |p| p.upload(incoming)).await?;
    Ok(Json(receipt))
}

/// `POST /api/bills/ingest`: upload and extract in one request.
pub async fn ingest(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<IngestResponse>, ApiError> {
    let incoming = read_upload(multipart).await?;
    let (receipt, extraction) = ctx
        .run_blocking(move |p| p.upload_and_extract(incoming))
        .await?;

    Ok(Json(IngestResponse {
        id: receipt.id,
        filename: receipt.filename,
        path: receipt.path,
        text: extraction.text,
        redacted: extraction.redacted,
        pii: extraction.pii,
        method: extraction.method,
        degraded: extraction.degraded,
    }))
}

/// `GET /api/bills/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<BillView>, ApiError> {
    let id = parse_bill_id(&id)?;
    let bill = ctx.run_blocking(move |p| p.get_bill(&id)).await?;
    Ok(Json(BillView::from(bill)))
}

/// `POST /api/bills/:id/extract`
pub async fn extract(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ExtractionReport>, ApiError> {
    let id = parse_bill_id(&id)?;
    let report = ctx.run_blocking(move |p| p.extract(&id)).await?;
    Ok(Json(report))
}

/// `POST /api/bills/:id/consent`
pub async fn consent(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    body: Result<Json<ConsentRequest>, JsonRejection>,
) -> Result<Json<ConsentReceipt>, ApiError> {
    let id = parse_bill_id(&id)?;
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let receipt = ctx
        .run_blocking(move |p| p.set_consent(&id, request.include_pii))
        .await?;
    Ok(Json(receipt))
}

/// `POST /api/bills/:id/process`
pub async fn process(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let id = parse_bill_id(&id)?;
    let receipt = ctx.run_blocking(move |p| p.process(&id)).await?;
    Ok(Json(ProcessResponse {
        id: receipt.id,
        report_pdf: report_url(&receipt.id),
        structured: receipt.report.is_structured(),
        processed_at: receipt.processed_at,
    }))
}

/// `GET /api/bills/:id/report`: the rendered PDF.
pub async fn report(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_bill_id(&id)?;
    let pdf = ctx.run_blocking(move |p| p.fetch_report(&id)).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"report-{id}.pdf\""),
            ),
        ],
        pdf,
    )
        .into_response())
}

fn parse_bill_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid bill id: {raw}")))
}

/// Collect the `file` and `owner_id` parts. Unknown parts are skipped.
async fn read_upload(mut multipart: Multipart) -> Result<IncomingBill, ApiError> {
    let mut incoming = IncomingBill::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                incoming.filename = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                incoming.bytes = Some(data.to_vec());
            }
            "owner_id" | "ownerId" => {
                incoming.owner_id = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    Ok(incoming)
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Upload exceeds the size limit".into())
    } else {
        ApiError::BadRequest(format!("Malformed multipart body: {}", e.body_text()))
    }
}
