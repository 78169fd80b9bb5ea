use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::models::enums::PiiKind;
use crate::models::PiiMatch;

pub const EMAIL_PLACEHOLDER: &str = "[[REDACTED_EMAIL]]";
pub const PHONE_PLACEHOLDER: &str = "[[REDACTED_PHONE]]";
pub const ACCOUNT_PLACEHOLDER: &str = "[[REDACTED_ACCOUNT]]";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap()
});

// Permissive: also spans long numeric codes; see `has_phone_marker`.
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?[0-9][0-9 ()-]{6,}[0-9]").unwrap());

static ACCOUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9]{8,}\b").unwrap());

/// Redacted text plus every span that was replaced, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionResult {
    pub redacted: String,
    pub pii: Vec<PiiMatch>,
}

/// Detect and replace emails, then phone numbers, then account numbers.
///
/// Each pass runs over the output of the previous one. Absent or empty input
/// yields an empty result; this never fails.
pub fn redact_pii(text: Option<&str>) -> RedactionResult {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => return RedactionResult::default(),
    };

    let mut pii = Vec::new();

    let after_email = replace_pass(
        text,
        &EMAIL_PATTERN,
        PiiKind::Email,
        EMAIL_PLACEHOLDER,
        &mut pii,
        |_| true,
    );
    let after_phone = replace_pass(
        &after_email,
        &PHONE_PATTERN,
        PiiKind::Phone,
        PHONE_PLACEHOLDER,
        &mut pii,
        has_phone_marker,
    );
    let redacted = replace_pass(
        &after_phone,
        &ACCOUNT_PATTERN,
        PiiKind::Account,
        ACCOUNT_PLACEHOLDER,
        &mut pii,
        |_| true,
    );

    RedactionResult { redacted, pii }
}

/// A phone candidate needs a leading `+` or a separator. Bare digit runs are
/// left for the account pass.
fn has_phone_marker(candidate: &str) -> bool {
    candidate.starts_with('+') || candidate.contains([' ', '(', ')', '-'])
}

fn replace_pass(
    text: &str,
    pattern: &Regex,
    kind: PiiKind,
    placeholder: &str,
    found: &mut Vec<PiiMatch>,
    accept: fn(&str) -> bool,
) -> String {
    pattern
        .replace_all(text, |caps: &Captures| {
            let matched = &caps[0];
            if accept(matched) {
                found.push(PiiMatch::new(kind, matched));
                placeholder.to_string()
            } else {
                matched.to_string()
            }
        })
        .into_owned()
}
