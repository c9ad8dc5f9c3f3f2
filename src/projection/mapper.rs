//! Property mapper: one [`ValidatedRecord`] + [`SchemaDefinition`] in, one
//! [`ExternalPayload`] out.
//!
//! Never fails. Unusable schemas degrade to the legacy mapping and fields
//! that cannot be coerced are omitted.

use tracing::debug;

use super::aliases::{self, MappedField};
use super::coerce::{self, coerce, iso_timestamp, round2};
use super::{
    ExternalPayload, MappingContext, MappingMode, PropertyType, PropertyValue, SchemaDefinition,
    SchemaProperty,
};
use crate::extraction::{ContactField, ValidatedRecord};

/// Fields tried, in order, for the title when the name is empty.
pub const TITLE_FALLBACK_ORDER: [ContactField; 8] = [
    ContactField::Company,
    ContactField::Email,
    ContactField::Phone,
    ContactField::Website,
    ContactField::Title,
    ContactField::Linkedin,
    ContactField::Address,
    ContactField::AdditionalNotes,
];

/// Everything except the name, which always feeds the title property.
const MAPPED_FIELDS: [MappedField; 10] = [
    MappedField::Contact(ContactField::Title),
    MappedField::Contact(ContactField::Company),
    MappedField::Contact(ContactField::Email),
    MappedField::Contact(ContactField::Phone),
    MappedField::Contact(ContactField::Website),
    MappedField::Contact(ContactField::Address),
    MappedField::Contact(ContactField::Linkedin),
    MappedField::Contact(ContactField::AdditionalNotes),
    MappedField::Confidence,
    MappedField::ExtractedDate,
];

/// Project `record` onto `schema`.
///
/// Deterministic in `(record, schema, ctx)`.
pub fn map_record(
    record: &ValidatedRecord,
    schema: &SchemaDefinition,
    ctx: &MappingContext,
) -> ExternalPayload {
    let Some(title) = title_property(schema) else {
        if schema.is_empty() {
            debug!("destination schema unavailable, using legacy mapping");
        } else {
            debug!(
                properties = schema.len(),
                "destination schema has no title property, using legacy mapping"
            );
        }
        return map_legacy(record, ctx);
    };

    let mut payload = ExternalPayload::new(MappingMode::Schema);
    payload.insert(
        &title.name,
        PropertyValue::Title(coerce::text_runs(title_text(record))),
    );

    for field in MAPPED_FIELDS {
        let Some(property) = aliases::resolve(schema, field, Some(title.name.as_str())) else {
            continue;
        };
        let value = field_value(record, field, ctx);
        match coerce(&property.kind, &value, ctx) {
            Ok(coerced) => {
                if !payload.insert(&property.name, coerced) {
                    debug!(property = %property.name, "property already set, keeping first value");
                }
            }
            Err(e) => {
                debug!(
                    property = %property.name,
                    property_type = property.kind.as_str(),
                    reason = %e,
                    "omitting property"
                );
            }
        }
    }

    payload
}

/// The title-typed property that receives the name.
///
/// When a schema declares several, the first matching name alias wins;
/// otherwise the first in name order.
pub fn title_property(schema: &SchemaDefinition) -> Option<&SchemaProperty> {
    aliases::aliases(MappedField::Contact(ContactField::Name))
        .iter()
        .filter_map(|alias| schema.get(alias))
        .find(|property| property.kind == PropertyType::Title)
        .or_else(|| schema.title_property())
}

/// Static mapping used when the destination schema cannot be relied on.
///
/// Empty values are omitted, including the name.
pub fn map_legacy(record: &ValidatedRecord, ctx: &MappingContext) -> ExternalPayload {
    let mut payload = ExternalPayload::new(MappingMode::Legacy);
    let fields = std::iter::once(MappedField::Contact(ContactField::Name)).chain(MAPPED_FIELDS);

    for field in fields {
        let (name, kind) = legacy_property(field);
        let value = field_value(record, field, ctx);
        if let Ok(coerced) = coerce(&kind, &value, ctx) {
            payload.insert(name, coerced);
        }
    }

    payload
}

/// Fixed destination property for each field under the legacy mapping.
pub fn legacy_property(field: MappedField) -> (&'static str, PropertyType) {
    match field {
        MappedField::Contact(ContactField::Name) => ("Name", PropertyType::Title),
        MappedField::Contact(ContactField::Title) => ("Title", PropertyType::RichText),
        MappedField::Contact(ContactField::Company) => ("Company", PropertyType::RichText),
        MappedField::Contact(ContactField::Email) => ("Email", PropertyType::Email),
        MappedField::Contact(ContactField::Phone) => ("Phone", PropertyType::PhoneNumber),
        MappedField::Contact(ContactField::Website) => ("Website", PropertyType::Url),
        MappedField::Contact(ContactField::Address) => ("Address", PropertyType::RichText),
        MappedField::Contact(ContactField::Linkedin) => ("LinkedIn", PropertyType::Url),
        MappedField::Contact(ContactField::AdditionalNotes) => ("Notes", PropertyType::RichText),
        MappedField::Confidence => ("Confidence", PropertyType::Number),
        MappedField::ExtractedDate => ("Extracted Date", PropertyType::Date),
    }
}

/// Text for the title property: the name, else the first populated field in
/// [`TITLE_FALLBACK_ORDER`], else empty.
pub fn title_text(record: &ValidatedRecord) -> &str {
    let fields = &record.fields;
    if !fields.name.is_empty() {
        return &fields.name;
    }
    TITLE_FALLBACK_ORDER
        .iter()
        .map(|field| fields.get(*field))
        .find(|value| !value.trim().is_empty())
        .unwrap_or("")
}

fn field_value(record: &ValidatedRecord, field: MappedField, ctx: &MappingContext) -> String {
    match field {
        MappedField::Contact(contact) => record.fields.get(contact).to_owned(),
        MappedField::Confidence => format!("{:.2}", round2(record.confidence)),
        MappedField::ExtractedDate => iso_timestamp(ctx.processed_at),
    }
}
