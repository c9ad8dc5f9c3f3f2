//! Data-quality review of validated records.
//!
//! Produces operator-facing warnings only; nothing here filters records.

use serde::Serialize;

use super::ValidatedRecord;

/// Default confidence below which a record is flagged for review.
pub const DEFAULT_LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Warnings grouped by category. Every entry names its 1-based row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewReport {
    /// Rows missing required contact details.
    pub empty_fields: Vec<String>,
    /// Rows whose email has no `@`.
    pub invalid_emails: Vec<String>,
    /// Rows below the confidence threshold.
    pub low_confidence: Vec<String>,
    /// Rows with neither name nor company.
    pub missing_key_info: Vec<String>,
}

impl ReviewReport {
    /// Whether no warnings were raised.
    pub fn is_clean(&self) -> bool {
        self.empty_fields.is_empty()
            && self.invalid_emails.is_empty()
            && self.low_confidence.is_empty()
            && self.missing_key_info.is_empty()
    }

    /// Total number of warnings across categories.
    pub fn warning_count(&self) -> usize {
        self.empty_fields
            .len()
            .saturating_add(self.invalid_emails.len())
            .saturating_add(self.low_confidence.len())
            .saturating_add(self.missing_key_info.len())
    }
}

/// Check every record and collect warnings.
pub fn review_records(records: &[ValidatedRecord], low_confidence_threshold: f64) -> ReviewReport {
    let mut report = ReviewReport::default();

    for (idx, record) in records.iter().enumerate() {
        let row = idx.saturating_add(1);
        let fields = &record.fields;

        if fields.name.is_empty() && fields.company.is_empty() {
            report
                .missing_key_info
                .push(format!("Row {row}: Missing both name and company"));
        }

        if !fields.email.is_empty() && !fields.email.contains('@') {
            report
                .invalid_emails
                .push(format!("Row {row}: Invalid email format"));
        }

        if record.confidence < low_confidence_threshold {
            report.low_confidence.push(format!(
                "Row {row}: Low confidence ({:.2})",
                record.confidence
            ));
        }

        let mut missing: Vec<&str> = Vec::new();
        if fields.name.is_empty() {
            missing.push("name");
        }
        if fields.email.is_empty() && fields.phone.is_empty() {
            missing.push("contact info");
        }
        if !missing.is_empty() {
            report
                .empty_fields
                .push(format!("Row {row}: Missing {}", missing.join(", ")));
        }
    }

    report
}

/// Confidence distribution and field coverage for a set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoverageSummary {
    /// Total records.
    pub total: usize,
    /// Confidence above 0.8.
    pub high_confidence: usize,
    /// Confidence between 0.6 and 0.8 inclusive.
    pub medium_confidence: usize,
    /// Confidence below 0.6.
    pub low_confidence: usize,
    /// Records with an email.
    pub with_email: usize,
    /// Records with a phone number.
    pub with_phone: usize,
    /// Records with a website.
    pub with_website: usize,
}

/// Summarize confidence bands and field coverage.
pub fn summarize_coverage(records: &[ValidatedRecord]) -> CoverageSummary {
    let mut summary = CoverageSummary {
        total: records.len(),
        ..CoverageSummary::default()
    };

    for record in records {
        let band = if record.confidence > 0.8 {
            &mut summary.high_confidence
        } else if record.confidence >= 0.6 {
            &mut summary.medium_confidence
        } else {
            &mut summary.low_confidence
        };
        *band = band.saturating_add(1);

        if !record.fields.email.is_empty() {
            summary.with_email = summary.with_email.saturating_add(1);
        }
        if !record.fields.phone.is_empty() {
            summary.with_phone = summary.with_phone.saturating_add(1);
        }
        if !record.fields.website.is_empty() {
            summary.with_website = summary.with_website.saturating_add(1);
        }
    }

    summary
}
