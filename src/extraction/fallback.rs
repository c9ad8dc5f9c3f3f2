//! Regex-only recovery of contact details from unstructured model text.
//!
//! Used as the last resort when no JSON can be recovered from a response.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::ContactFields;
use crate::text::cap_chars;

/// Cap applied to every regex-recovered value.
pub const FALLBACK_FIELD_MAX_CHARS: usize = 200;

/// Length of the source snippet carried in `additional_notes`.
pub const FALLBACK_SNIPPET_CHARS: usize = 500;

pub(super) static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").ok());

static PHONE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"[+]?[1-9]?[0-9]{0,3}[-.\s]?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}").ok()
});

static WEBSITE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?[a-z0-9-]+\.[a-z]{2,}(?:/[^\s]*)?").ok()
});

static LINKEDIN_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)linkedin\.com/in/[a-z0-9-]+").ok());

/// Recover whatever contact details fixed patterns can find in `text`.
///
/// Returns `None` when none of email, phone or website matched; LinkedIn
/// alone is not considered recoverable.
pub fn extract_fallback(text: &str) -> Option<ContactFields> {
    let email = first_match(&EMAIL_RE, text);
    let phone = first_match(&PHONE_RE, text).map(|(m, _)| m.trim().to_owned());
    let email_span = email.as_ref().map(|(_, span)| span.clone());
    let website = first_website(text, email_span.as_ref());
    let linkedin = first_match(&LINKEDIN_RE, text).map(|(m, _)| m);

    let mut fields = ContactFields {
        email: email.map(|(m, _)| m).unwrap_or_default(),
        phone: phone.unwrap_or_default(),
        website: website.unwrap_or_default(),
        linkedin: linkedin.unwrap_or_default(),
        ..ContactFields::default()
    };

    if fields.email.is_empty() && fields.phone.is_empty() && fields.website.is_empty() {
        debug!("fallback extraction found nothing recoverable");
        return None;
    }

    for value in [
        &mut fields.email,
        &mut fields.phone,
        &mut fields.website,
        &mut fields.linkedin,
    ] {
        let capped = cap_chars(value, FALLBACK_FIELD_MAX_CHARS).to_owned();
        *value = capped;
    }
    fields.additional_notes = cap_chars(text, FALLBACK_SNIPPET_CHARS).to_owned();

    debug!(
        email = !fields.email.is_empty(),
        phone = !fields.phone.is_empty(),
        website = !fields.website.is_empty(),
        linkedin = !fields.linkedin.is_empty(),
        "fallback extraction recovered fields"
    );
    Some(fields)
}

fn first_match(pattern: &LazyLock<Option<Regex>>, text: &str) -> Option<(String, Range<usize>)> {
    let regex = pattern.as_ref()?;
    regex
        .find(text)
        .map(|m| (m.as_str().to_owned(), m.range()))
        .filter(|(m, _)| !m.trim().is_empty())
}

/// First website-like match that is not the domain part of the email.
fn first_website(text: &str, email_span: Option<&Range<usize>>) -> Option<String> {
    let regex = WEBSITE_RE.as_ref()?;
    regex
        .find_iter(text)
        .find(|m| match email_span {
            Some(span) => m.end() <= span.start || m.start() >= span.end,
            None => true,
        })
        .map(|m| m.as_str().to_owned())
}
