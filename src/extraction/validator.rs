//! Record validator: sanitizes candidates into [`ValidatedRecord`]s.

use tracing::debug;

use super::normalize::normalize_field;
use super::{CandidateRecord, ContactField, ContactFields, ValidatedRecord};
use crate::text::trim_and_cap;

/// Confidence substituted when a candidate's confidence is not a finite number.
pub const DEFAULT_VALIDATED_CONFIDENCE: f64 = 0.5;

/// Sanitize candidates and drop those without useful data.
///
/// Pure transform: never fails, and the worst case is an empty vec.
pub fn validate_records(candidates: &[CandidateRecord]) -> Vec<ValidatedRecord> {
    let validated: Vec<ValidatedRecord> = candidates
        .iter()
        .enumerate()
        .filter_map(|(idx, candidate)| {
            let position = u32::try_from(idx).unwrap_or(u32::MAX).saturating_add(1);
            validate_record(candidate, position)
        })
        .collect();

    debug!(
        candidates = candidates.len(),
        kept = validated.len(),
        "validated candidate records"
    );
    validated
}

/// Sanitize a single candidate.
///
/// `position` is the 1-based index used when the card number is not positive.
/// Returns `None` when name, email, phone and company are all empty.
pub fn validate_record(candidate: &CandidateRecord, position: u32) -> Option<ValidatedRecord> {
    let card_number = if candidate.card_number > 0 {
        candidate.card_number
    } else {
        position.max(1)
    };

    let confidence = if candidate.confidence.is_finite() {
        candidate.confidence.clamp(0.0, 1.0)
    } else {
        DEFAULT_VALIDATED_CONFIDENCE
    };

    let mut fields = ContactFields::default();
    for field in ContactField::ALL {
        fields.set(field, sanitize_field(field, candidate.fields.get(field)));
    }

    if !fields.has_useful_data() {
        debug!(card_number, "dropping record without name, email, phone or company");
        return None;
    }

    Some(ValidatedRecord {
        card_number,
        confidence,
        fields,
        fallback: candidate.fallback,
    })
}

/// Normalize, trim and cap one field value; emails without `@` become empty.
pub fn sanitize_field(field: ContactField, raw: &str) -> String {
    let value = trim_and_cap(&normalize_field(field, raw), field.max_chars());
    if field == ContactField::Email && !value.contains('@') {
        if !value.is_empty() {
            debug!("discarding email value without '@'");
        }
        return String::new();
    }
    value
}
