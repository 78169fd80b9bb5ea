use std::io::BufWriter;

use chrono::{DateTime, SecondsFormat, Utc};
use printpdf::*;
use uuid::Uuid;

use super::ReportError;
use crate::models::BillReport;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const LEFT: Mm = Mm(20.0);
const TOP: Mm = Mm(280.0);
const BOTTOM: Mm = Mm(20.0);

/// Courier 9pt across the 170mm text column
const BODY_CHARS: usize = 88;
const BODY_LINE: Mm = Mm(4.0);

/// Render the ESG report for one bill as an A4 PDF. Returns PDF bytes.
pub fn render_report(
    bill_id: &Uuid,
    filename: &str,
    report: &BillReport,
    processed_at: DateTime<Utc>,
) -> Result<Vec<u8>, ReportError> {
    let (doc, page1, layer1) =
        PdfDocument::new("ESG Bill Report", PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Render(format!("PDF font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Render(format!("PDF font error: {e}")))?;
    let courier = doc
        .add_builtin_font(BuiltinFont::Courier)
        .map_err(|e| ReportError::Render(format!("PDF font error: {e}")))?;

    let mut layer = doc.get_page(page1).get_layer(layer1);
    let mut y = TOP;

    layer.use_text("ESG Bill Report", 18.0, LEFT, y, &bold);
    y -= Mm(10.0);

    for line in wrap_text(&format!("Bill: {filename}"), 80) {
        layer.use_text(line, 12.0, LEFT, y, &font);
        y -= Mm(5.5);
    }
    layer.use_text(format!("Bill ID: {bill_id}"), 10.0, LEFT, y, &font);
    y -= Mm(5.0);
    layer.use_text(
        format!(
            "Processed At: {}",
            processed_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        ),
        10.0,
        LEFT,
        y,
        &font,
    );
    y -= Mm(10.0);

    layer.use_text("Extracted Report:", 14.0, LEFT, y, &bold);
    y -= Mm(7.0);

    let mut pages = 1;
    for line in report.display_json().lines().flat_map(|l| wrap_preformatted(l, BODY_CHARS)) {
        if y < BOTTOM {
            let (page, page_layer) = doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
            layer = doc.get_page(page).get_layer(page_layer);
            y = TOP;
            pages += 1;
        }
        layer.use_text(line, 9.0, LEFT, y, &courier);
        y -= BODY_LINE;
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ReportError::Render(format!("PDF save error: {e}")))?;
    let bytes = buf
        .into_inner()
        .map_err(|e| ReportError::Render(format!("PDF buffer error: {e}")))?;

    tracing::debug!(bill_id = %bill_id, pages, size = bytes.len(), "Report rendered");
    Ok(bytes)
}

/// Word-wrap prose to at most `max_chars` characters per line.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.chars().count() + word.chars().count() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Hard-wrap one line of pretty JSON, keeping its indentation on continuation lines.
fn wrap_preformatted(line: &str, max_chars: usize) -> Vec<String> {
    let indent: String = line.chars().take_while(|c| *c == ' ').collect();
    let body: Vec<char> = line.chars().skip(indent.len()).collect();
    let width = max_chars.saturating_sub(indent.len()).max(16);

    if body.len() <= width {
        return vec![line.to_string()];
    }
    body.chunks(width)
        .map(|chunk| format!("{indent}{}", chunk.iter().collect::<String>()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LineItem, StructuredReport};

    fn page_count(pdf: &[u8]) -> usize {
        lopdf::Document::load_mem(pdf).unwrap().get_pages().len()
    }

    #[test]
    fn short_report_fits_one_page() {
        let report = BillReport::Structured(StructuredReport {
            vendor: Some("City Power".into()),
            total_amount: Some(88.2),
            ..Default::default()
        });
        let pdf = render_report(&Uuid::new_v4(), "march.pdf", &report, Utc::now()).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert_eq!(page_count(&pdf), 1);
    }

    #[test]
    fn long_report_spans_pages() {
        let items = (0..120)
            .map(|i| LineItem {
                description: Some(format!("Meter reading {i}")),
                amount: Some(i as f64),
                ..Default::default()
            })
            .collect();
        let report = BillReport::Structured(StructuredReport {
            line_items: items,
            ..Default::default()
        });
        let pdf = render_report(&Uuid::new_v4(), "year.pdf", &report, Utc::now()).unwrap();
        assert!(page_count(&pdf) > 1);
    }

    #[test]
    fn unparsed_report_renders() {
        let report = BillReport::Unparsed {
            raw: "I cannot parse this ".repeat(40),
        };
        let pdf = render_report(&Uuid::new_v4(), "x.pdf", &report, Utc::now()).unwrap();
        assert_eq!(page_count(&pdf), 1);
    }

    #[test]
    fn wrap_text_breaks_on_words() {
        let lines = wrap_text("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn preformatted_wrap_keeps_indent() {
        let line = format!("    \"raw\": \"{}\"", "a".repeat(100));
        let wrapped = wrap_preformatted(&line, 40);
        assert!(wrapped.len() > 1);
        assert!(wrapped.iter().all(|l| l.starts_with("    ") && l.chars().count() <= 40));
        assert_eq!(wrap_preformatted("  short", 40), vec!["  short".to_string()]);
    }
}
