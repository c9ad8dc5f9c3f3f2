//! Data-quality review and coverage summary.

use cardsync::extraction::review::{
    review_records, summarize_coverage, DEFAULT_LOW_CONFIDENCE_THRESHOLD,
};
use cardsync::extraction::{ContactFields, ValidatedRecord};

fn record(confidence: f64, fields: ContactFields) -> ValidatedRecord {
    ValidatedRecord {
        card_number: 1,
        confidence,
        fields,
        fallback: false,
    }
}

#[test]
fn complete_record_is_clean() {
    let report = review_records(
        &[record(
            0.95,
            ContactFields {
                name: "Ada".to_owned(),
                company: "Engines Ltd".to_owned(),
                email: "ada@engines.io".to_owned(),
                ..ContactFields::default()
            },
        )],
        DEFAULT_LOW_CONFIDENCE_THRESHOLD,
    );
    assert!(report.is_clean());
    assert_eq!(report.warning_count(), 0);
}

#[test]
fn warnings_name_their_rows() {
    let records = [
        record(
            0.9,
            ContactFields {
                name: "Ada".to_owned(),
                phone: "555".to_owned(),
                ..ContactFields::default()
            },
        ),
        record(
            0.3,
            ContactFields {
                email: "jane@x.com".to_owned(),
                ..ContactFields::default()
            },
        ),
    ];
    let report = review_records(&records, DEFAULT_LOW_CONFIDENCE_THRESHOLD);

    assert_eq!(
        report.missing_key_info,
        vec!["Row 2: Missing both name and company".to_owned()]
    );
    assert_eq!(report.low_confidence, vec!["Row 2: Low confidence (0.30)".to_owned()]);
    assert_eq!(report.empty_fields, vec!["Row 2: Missing name".to_owned()]);
    assert!(report.invalid_emails.is_empty());
    assert_eq!(report.warning_count(), 3);
}

#[test]
fn caller_edited_email_is_flagged() {
    let report = review_records(
        &[record(
            1.0,
            ContactFields {
                name: "Ada".to_owned(),
                company: "X".to_owned(),
                email: "ada at engines".to_owned(),
                ..ContactFields::default()
            },
        )],
        DEFAULT_LOW_CONFIDENCE_THRESHOLD,
    );
    assert_eq!(report.invalid_emails, vec!["Row 1: Invalid email format".to_owned()]);
}

#[test]
fn coverage_bands_and_field_counts() {
    let with = |email: &str, phone: &str, website: &str| ContactFields {
        name: "n".to_owned(),
        email: email.to_owned(),
        phone: phone.to_owned(),
        website: website.to_owned(),
        ..ContactFields::default()
    };
    let summary = summarize_coverage(&[
        record(0.95, with("a@b.c", "", "")),
        record(0.8, with("", "1", "")),
        record(0.6, with("", "", "w.io")),
        record(0.1, with("a@b.c", "1", "w.io")),
    ]);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.high_confidence, 1);
    assert_eq!(summary.medium_confidence, 2);
    assert_eq!(summary.low_confidence, 1);
    assert_eq!(summary.with_email, 2);
    assert_eq!(summary.with_phone, 2);
    assert_eq!(summary.with_website, 2);
}
