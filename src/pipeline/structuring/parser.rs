use serde_json::Value;

use super::types::StructuringOutcome;
use super::StructuringError;
use crate::models::StructuredReport;

/// Read the model's answer as a report, falling back to the raw text.
pub fn parse_report_response(response: &str) -> StructuringOutcome {
    match parse_structured_report(response) {
        Ok(report) => StructuringOutcome::Structured(report),
        Err(e) => StructuringOutcome::Unparsed {
            raw: response.to_string(),
            reason: e.to_string(),
        },
    }
}

/// Deserialize the span from the first `{` to the last `}` as a JSON object.
pub fn parse_structured_report(response: &str) -> Result<StructuredReport, StructuringError> {
    let json_str = extract_json_span(response)?;

    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| StructuringError::JsonParsing(e.to_string()))?;

    if !value.is_object() {
        return Err(StructuringError::MalformedResponse("JSON span is not an object".into()));
    }

    serde_json::from_value(value).map_err(|e| StructuringError::JsonParsing(e.to_string()))
}

fn extract_json_span(response: &str) -> Result<&str, StructuringError> {
    let start = response
        .find('{')
        .ok_or_else(|| StructuringError::MalformedResponse("No JSON object found".into()))?;
    let end = response
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| StructuringError::MalformedResponse("Unclosed JSON object".into()))?;
    Ok(&response[start..=end])
}
