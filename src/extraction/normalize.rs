//! Per-field cleanup of OCR and model noise, applied before capping.
//!
//! Phone numbers are left as read: formats vary too much to rewrite safely.

use super::fallback::EMAIL_RE;
use super::ContactField;

/// Characters OCR commonly inserts into card text.
const OCR_ARTIFACTS: [char; 3] = ['|', '_', '^'];

/// Normalize `raw` according to the kind of `field`.
pub fn normalize_field(field: ContactField, raw: &str) -> String {
    match field {
        ContactField::Email => normalize_email(raw),
        ContactField::Website | ContactField::Linkedin => normalize_url(raw),
        ContactField::Phone => raw.trim().to_owned(),
        ContactField::Name
        | ContactField::Title
        | ContactField::Company
        | ContactField::Address
        | ContactField::AdditionalNotes => clean_text(raw),
    }
}

/// Collapse whitespace runs to one space and drop OCR artifacts.
pub fn clean_text(raw: &str) -> String {
    collapse_whitespace(raw)
        .chars()
        .filter(|c| !OCR_ARTIFACTS.contains(c))
        .collect::<String>()
        .trim()
        .to_owned()
}

/// First address-shaped token, lowercased; otherwise the cleaned text.
pub fn normalize_email(raw: &str) -> String {
    let found = EMAIL_RE
        .as_ref()
        .and_then(|re| re.find(raw))
        .map(|m| m.as_str().to_lowercase());
    found.unwrap_or_else(|| clean_text(raw))
}

/// Collapse whitespace and add `https://` to dotted values without a scheme.
///
/// Underscores are kept; they are legal in URL paths.
pub fn normalize_url(raw: &str) -> String {
    let url: String = collapse_whitespace(raw)
        .chars()
        .filter(|c| *c != '|' && *c != '^')
        .collect();
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    if url.is_empty() || lower.starts_with("http://") || lower.starts_with("https://") {
        return url.to_owned();
    }
    if url.contains('.') {
        format!("https://{url}")
    } else {
        url.to_owned()
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
