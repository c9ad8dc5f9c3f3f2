//! Extraction & validation pipeline.
//!
//! Raw model text flows through three stages:
//! - [`interpreter::interpret`] recovers candidate records from arbitrary text,
//!   degrading to [`fallback::extract_fallback`] when no JSON can be found
//! - [`validator::validate_records`] normalizes ([`normalize`]) and caps every
//!   field and drops records without useful data
//! - [`review::review_records`] reports data-quality warnings for operators

use serde::{Deserialize, Serialize};

pub mod fallback;
pub mod interpreter;
pub mod normalize;
pub mod review;
pub mod validator;

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// One of the nine named text fields of a contact record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    /// Person's full name.
    Name,
    /// Job title or role.
    Title,
    /// Company or organisation.
    Company,
    /// Email address.
    Email,
    /// Phone number, verbatim.
    Phone,
    /// Website URL.
    Website,
    /// Postal address.
    Address,
    /// LinkedIn profile.
    Linkedin,
    /// Anything else printed on the card.
    AdditionalNotes,
}

impl ContactField {
    /// Every field, in canonical order.
    pub const ALL: [Self; 9] = [
        Self::Name,
        Self::Title,
        Self::Company,
        Self::Email,
        Self::Phone,
        Self::Website,
        Self::Address,
        Self::Linkedin,
        Self::AdditionalNotes,
    ];

    /// JSON key used by model output for this field.
    pub fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Title => "title",
            Self::Company => "company",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Website => "website",
            Self::Address => "address",
            Self::Linkedin => "linkedin",
            Self::AdditionalNotes => "additional_notes",
        }
    }

    /// Maximum length, in characters, of a validated value.
    pub fn max_chars(self) -> usize {
        match self {
            Self::Phone => 50,
            Self::Website | Self::Address => 200,
            Self::AdditionalNotes => 500,
            Self::Name | Self::Title | Self::Company | Self::Email | Self::Linkedin => 100,
        }
    }
}

/// The nine text fields of a contact, each possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFields {
    /// Person's full name.
    #[serde(default)]
    pub name: String,
    /// Job title or role.
    #[serde(default)]
    pub title: String,
    /// Company or organisation.
    #[serde(default)]
    pub company: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Phone number.
    #[serde(default)]
    pub phone: String,
    /// Website URL.
    #[serde(default)]
    pub website: String,
    /// Postal address.
    #[serde(default)]
    pub address: String,
    /// LinkedIn profile.
    #[serde(default)]
    pub linkedin: String,
    /// Free-form notes.
    #[serde(default)]
    pub additional_notes: String,
}

impl ContactFields {
    /// Borrow the value of one field.
    pub fn get(&self, field: ContactField) -> &str {
        match field {
            ContactField::Name => &self.name,
            ContactField::Title => &self.title,
            ContactField::Company => &self.company,
            ContactField::Email => &self.email,
            ContactField::Phone => &self.phone,
            ContactField::Website => &self.website,
            ContactField::Address => &self.address,
            ContactField::Linkedin => &self.linkedin,
            ContactField::AdditionalNotes => &self.additional_notes,
        }
    }

    /// Replace the value of one field.
    pub fn set(&mut self, field: ContactField, value: String) {
        let slot = match field {
            ContactField::Name => &mut self.name,
            ContactField::Title => &mut self.title,
            ContactField::Company => &mut self.company,
            ContactField::Email => &mut self.email,
            ContactField::Phone => &mut self.phone,
            ContactField::Website => &mut self.website,
            ContactField::Address => &mut self.address,
            ContactField::Linkedin => &mut self.linkedin,
            ContactField::AdditionalNotes => &mut self.additional_notes,
        };
        *slot = value;
    }

    /// Whether at least one of name, email, phone or company is non-empty.
    pub fn has_useful_data(&self) -> bool {
        !(self.name.is_empty()
            && self.email.is_empty()
            && self.phone.is_empty()
            && self.company.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Unvalidated structured guess at one card's fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRecord {
    /// 1-based card number.
    pub card_number: u32,
    /// Model confidence in `[0, 1]`.
    pub confidence: f64,
    /// Field values as read from the model output.
    #[serde(flatten)]
    pub fields: ContactFields,
    /// Set when the record came from regex fallback extraction.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

/// A candidate after sanitation, capping, and invariant checking.
///
/// Every field is within its cap, `email` is empty or contains `@`, and at
/// least one of name, email, phone or company is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedRecord {
    /// Positive card number.
    pub card_number: u32,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Sanitized field values.
    #[serde(flatten)]
    pub fields: ContactFields,
    /// Set when the record came from regex fallback extraction.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}
