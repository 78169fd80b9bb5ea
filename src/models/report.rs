use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of a structuring call: either the JSON object the model returned,
/// or its raw response when no object could be recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BillReport {
    Structured(StructuredReport),
    Unparsed { raw: String },
}

impl BillReport {
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// Pretty-printed JSON as shown in the rendered report.
    pub fn display_json(&self) -> String {
        let value = match self {
            Self::Structured(report) => serde_json::to_value(report),
            Self::Unparsed { raw } => Ok(serde_json::json!({ "raw": raw })),
        };
        value
            .and_then(|v| serde_json::to_string_pretty(&v))
            .unwrap_or_else(|_| "{}".to_string())
    }
}

/// The model's JSON object. Known keys are coerced to their field type; a
/// value that cannot be coerced stays in `extra` under its own key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct StructuredReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_co2_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for StructuredReport {
    fn from(mut map: Map<String, Value>) -> Self {
        Self {
            vendor: take_coerced(&mut map, "vendor", string_from_value),
            invoice_date: take_coerced(&mut map, "invoice_date", string_from_value),
            invoice_number: take_coerced(&mut map, "invoice_number", string_from_value),
            total_amount: take_coerced(&mut map, "total_amount", number_from_value),
            currency: take_coerced(&mut map, "currency", string_from_value),
            line_items: take_line_items(&mut map),
            estimated_co2_kg: take_coerced(&mut map, "estimated_co2_kg", number_from_value),
            notes: take_coerced(&mut map, "notes", string_from_value),
            extra: map,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct LineItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for LineItem {
    fn from(mut map: Map<String, Value>) -> Self {
        Self {
            description: take_coerced(&mut map, "description", string_from_value),
            quantity: take_coerced(&mut map, "quantity", number_from_value),
            unit_price: take_coerced(&mut map, "unit_price", number_from_value),
            amount: take_coerced(&mut map, "amount", number_from_value),
            category: take_coerced(&mut map, "category", string_from_value),
            extra: map,
        }
    }
}

/// Remove `key` and coerce it. Nulls are dropped; values that fail to
/// coerce are put back.
fn take_coerced<T>(
    map: &mut Map<String, Value>,
    key: &str,
    coerce: fn(&Value) -> Option<T>,
) -> Option<T> {
    let value = map.remove(key)?;
    if value.is_null() {
        return None;
    }
    let coerced = coerce(&value);
    if coerced.is_none() {
        map.insert(key.to_string(), value);
    }
    coerced
}

/// An array of objects becomes line items. Any other shape is left in place.
fn take_line_items(map: &mut Map<String, Value>) -> Vec<LineItem> {
    match map.remove("line_items") {
        Some(Value::Array(items)) if items.iter().all(Value::is_object) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(fields) => Some(LineItem::from(fields)),
                _ => None,
            })
            .collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            map.insert("line_items".to_string(), other);
            Vec::new()
        }
    }
}

fn string_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹'];

/// Parse the leading number of strings like "$1,204.50", "1.204,50 EUR" or
/// "12.5 kg CO2". Returns None unless the number itself is unambiguous.
fn parse_amount(raw: &str) -> Option<f64> {
    let mut rest = raw.trim();
    let mut negative = false;
    if let Some(stripped) = rest.strip_prefix('-') {
        negative = true;
        rest = stripped;
    }
    rest = strip_currency_prefix(rest);
    if !negative {
        if let Some(stripped) = rest.strip_prefix('-') {
            negative = true;
            rest = stripped;
        }
    }

    let token_len = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(rest.len());
    let (token, suffix) = rest.split_at(token_len);
    if !suffix.is_empty() && !suffix.starts_with(valid_suffix_start) {
        return None;
    }

    let value: f64 = normalize_number(token)?.parse().ok()?;
    Some(if negative { -value } else { value })
}

fn strip_currency_prefix(s: &str) -> &str {
    if let Some(stripped) = s.strip_prefix(CURRENCY_SYMBOLS) {
        return stripped.trim_start();
    }
    let code_len = s.find(|c: char| !c.is_ascii_uppercase()).unwrap_or(s.len());
    if code_len == 3 {
        return s[3..].trim_start();
    }
    s
}

fn valid_suffix_start(c: char) -> bool {
    c.is_whitespace() || c.is_alphabetic() || c == '%' || CURRENCY_SYMBOLS.contains(&c)
}

/// Resolve decimal and thousands separators into a plain `1234.5` literal.
fn normalize_number(token: &str) -> Option<String> {
    if !token.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let decimal = match (token.rfind('.'), token.rfind(',')) {
        (Some(dot), Some(comma)) => Some(if dot > comma { '.' } else { ',' }),
        (None, Some(_)) if is_grouped(token, ',') => None,
        (None, Some(_)) => Some(','),
        (Some(_), None) if token.matches('.').count() > 1 => None,
        (Some(_), None) => Some('.'),
        (None, None) => None,
    };

    let (int_part, frac_part) = match decimal {
        Some(sep) => {
            let (int_part, frac_part) = token.rsplit_once(sep)?;
            (int_part, Some(frac_part))
        }
        None => (token, None),
    };

    let thousands = if decimal == Some(',') { '.' } else { ',' };
    let digits = if int_part.contains(thousands) {
        if !is_grouped(int_part, thousands) {
            return None;
        }
        int_part.replace(thousands, "")
    } else if int_part.chars().all(|c| c.is_ascii_digit()) {
        int_part.to_string()
    } else if decimal.is_none() && is_grouped(int_part, '.') {
        int_part.replace('.', "")
    } else {
        return None;
    };

    match frac_part {
        Some(frac) if !frac.is_empty() && frac.chars().all(|c| c.is_ascii_digit()) => {
            Some(format!("{digits}.{frac}"))
        }
        Some(_) => None,
        None => Some(digits),
    }
}

/// "1,204" or "12,345,678": a 1-3 digit head followed by 3-digit groups.
fn is_grouped(s: &str, sep: char) -> bool {
    let mut groups = s.split(sep);
    let head_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && g.chars().all(|c| c.is_ascii_digit()));
    let mut tail = groups.peekable();
    head_ok
        && tail.peek().is_some()
        && tail.all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}
