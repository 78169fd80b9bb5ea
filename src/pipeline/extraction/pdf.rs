use std::panic::{self, AssertUnwindSafe};

use super::types::{BillTextSource, SourceDocument};
use super::ExtractionError;
use crate::models::enums::ExtractionMethod;

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers; pages are joined with newlines.
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        // pdf-extract panics on some malformed inputs instead of returning Err
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        }));

        match result {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(ExtractionError::PdfParsing(e.to_string())),
            Err(_) => Err(ExtractionError::PdfParsing("parser aborted on malformed input".into())),
        }
    }
}

impl BillTextSource for PdfTextExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::PdfDirect
    }

    fn extract_text(&self, document: &SourceDocument<'_>) -> Result<String, ExtractionError> {
        let pages = self.extract_pages(document.bytes)?;
        let text = pages
            .iter()
            .map(|p| p.trim_end())
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }
        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::dictionary;
    use lopdf::{Document, Object, Stream};

    /// A digital PDF with one Helvetica text line per page.
    pub(crate) fn text_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let kids: Vec<Object> = pages
            .iter()
            .map(|line| {
                let content = format!("BT /F1 11 Tf 72 720 Td ({line}) Tj ET");
                let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                    "Contents" => content_id,
                    "Resources" => dictionary! {
                        "Font" => dictionary! { "F1" => font_id },
                    },
                })
                .into()
            })
            .collect();

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::text_pdf;
    use super::*;

    fn source(bytes: &[u8]) -> SourceDocument<'_> {
        SourceDocument {
            filename: "bill.pdf",
            bytes,
        }
    }

    #[test]
    fn extract_text_from_digital_pdf() {
        let pdf = text_pdf(&["City Power invoice 2024"]);
        let text = PdfTextExtractor.extract_text(&source(&pdf)).unwrap();
        assert!(text.contains("City Power"), "got: {text}");
    }

    #[test]
    fn pages_joined_with_newlines() {
        let pdf = text_pdf(&["First page", "Second page"]);
        let pages = PdfTextExtractor.extract_pages(&pdf).unwrap();
        assert_eq!(pages.len(), 2);

        let text = PdfTextExtractor.extract_text(&source(&pdf)).unwrap();
        let first = text.find("First").unwrap();
        let second = text.find("Second").unwrap();
        assert!(first < second);
        assert!(text[first..second].contains('\n'));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let result = PdfTextExtractor.extract_text(&source(b"not a pdf"));
        assert!(matches!(result, Err(ExtractionError::PdfParsing(_))));
    }

    #[test]
    fn reports_pdf_direct_method() {
        assert_eq!(PdfTextExtractor.method(), ExtractionMethod::PdfDirect);
    }
}
