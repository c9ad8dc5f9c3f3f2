//! Static field-alias table.
//!
//! Destination schemas are user-defined, so each internal field accepts
//! several spellings. The first alias (in table order) that exists in the
//! schema, compared case-insensitively, wins.

use serde::Serialize;

use super::{SchemaDefinition, SchemaProperty};
use crate::extraction::ContactField;

/// Anything the mapper can place into a destination property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappedField {
    /// One of the nine contact text fields.
    Contact(ContactField),
    /// Record confidence.
    Confidence,
    /// Processing timestamp.
    ExtractedDate,
}

/// Accepted destination spellings for a field, in priority order.
pub fn aliases(field: MappedField) -> &'static [&'static str] {
    match field {
        MappedField::Contact(ContactField::Name) => {
            &["Name", "Full Name", "Contact Name", "Contact"]
        }
        MappedField::Contact(ContactField::Title) => {
            &["Title", "Job Title", "Position", "Role"]
        }
        MappedField::Contact(ContactField::Company) => {
            &["Company", "Organization", "Organisation", "Employer", "Business"]
        }
        MappedField::Contact(ContactField::Email) => {
            &["Email", "E-mail", "Email Address", "Mail"]
        }
        MappedField::Contact(ContactField::Phone) => {
            &["Phone", "Phone Number", "Telephone", "Mobile", "Tel"]
        }
        MappedField::Contact(ContactField::Website) => {
            &["Website", "Web", "URL", "Site", "Homepage"]
        }
        MappedField::Contact(ContactField::Address) => {
            &["Address", "Location", "Office Address", "Mailing Address"]
        }
        MappedField::Contact(ContactField::Linkedin) => {
            &["LinkedIn", "LinkedIn URL", "LinkedIn Profile", "Linkedin Url"]
        }
        MappedField::Contact(ContactField::AdditionalNotes) => {
            &["Notes", "Additional Notes", "Comments", "Remarks", "Tags"]
        }
        MappedField::Confidence => &["Confidence", "Confidence Score", "Score"],
        MappedField::ExtractedDate => &[
            "Extracted Date",
            "Extraction Date",
            "Date Extracted",
            "Date Added",
            "Scanned",
        ],
    }
}

/// Resolve a field to a schema property via its aliases.
///
/// A property named `exclude` is passed over so the next alias still gets a
/// chance; the mapper uses this to keep fields off the title property.
pub fn resolve<'a>(
    schema: &'a SchemaDefinition,
    field: MappedField,
    exclude: Option<&str>,
) -> Option<&'a SchemaProperty> {
    aliases(field)
        .iter()
        .filter_map(|alias| schema.get(alias))
        .find(|property| exclude != Some(property.name.as_str()))
}
