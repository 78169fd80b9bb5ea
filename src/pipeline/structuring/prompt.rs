use crate::config::MAX_PROMPT_CHARS;

/// Build the ESG extraction prompt around (already consent-filtered) bill text.
/// Text beyond `MAX_PROMPT_CHARS` characters is dropped.
pub fn build_report_prompt(bill_text: &str) -> String {
    let text = truncate_chars(bill_text, MAX_PROMPT_CHARS);
    format!(
        r#"You are Gaia, an assistant that extracts billing data for ESG reporting.
Input bill text:
"""
{text}
"""

OUTPUT JSON with fields: vendor, invoice_date, invoice_number, total_amount, currency, line_items [{{description, quantity, unit_price, amount, category}}], estimated_co2_kg (if possible), notes.
Return only valid JSON."#
    )
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
