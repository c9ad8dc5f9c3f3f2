//! Regex fallback extraction.

use cardsync::extraction::fallback::{
    extract_fallback, FALLBACK_FIELD_MAX_CHARS, FALLBACK_SNIPPET_CHARS,
};

#[test]
fn recovers_all_patterns_from_card_text() {
    let text = "Jane Roe\nSales Lead\nPhone: +1 (415) 555-0199\nEmail: jane.roe@acme.io\nwww.acme.io/contact\nlinkedin.com/in/jane-roe";
    let fields = match extract_fallback(text) {
        Some(fields) => fields,
        None => panic!("card text should be recoverable"),
    };
    assert_eq!(fields.email, "jane.roe@acme.io");
    assert!(fields.phone.contains("555-0199"), "phone was {:?}", fields.phone);
    assert_eq!(fields.website, "www.acme.io/contact");
    assert_eq!(fields.linkedin, "linkedin.com/in/jane-roe");
    assert_eq!(fields.additional_notes, text);
    assert!(fields.name.is_empty());
}

#[test]
fn short_digit_runs_are_not_phones() {
    assert!(extract_fallback("Room 12, floor 3, desk 4501").is_none());
}

#[test]
fn email_domain_is_not_reported_as_website() {
    let fields = match extract_fallback("write to bob@example.org today") {
        Some(fields) => fields,
        None => panic!("email should be recoverable"),
    };
    assert_eq!(fields.email, "bob@example.org");
    assert_eq!(fields.website, "");
}

#[test]
fn values_and_snippet_are_capped() {
    let long_path = "a".repeat(400);
    let text = format!("see https://example.com/{long_path} {}", "z ".repeat(400));
    let fields = match extract_fallback(&text) {
        Some(fields) => fields,
        None => panic!("website should be recoverable"),
    };
    assert_eq!(fields.website.chars().count(), FALLBACK_FIELD_MAX_CHARS);
    assert_eq!(fields.additional_notes.chars().count(), FALLBACK_SNIPPET_CHARS);
}
