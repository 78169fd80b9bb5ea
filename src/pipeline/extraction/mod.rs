pub mod types;
pub mod pdf;
pub mod model_ocr;
pub mod orchestrator;

pub use types::*;
pub use pdf::*;
pub use model_ocr::*;
pub use orchestrator::*;

use thiserror::Error;

use crate::pipeline::structuring::StructuringError;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("Model OCR failed: {0}")]
    ModelOcr(#[from] StructuringError),

    #[error("No text found in document")]
    NoText,

    #[error("Unknown extraction strategy: {0}")]
    UnknownStrategy(String),
}
