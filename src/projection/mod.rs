//! Schema-aware projection engine.
//!
//! Maps [`ValidatedRecord`](crate::extraction::ValidatedRecord)s onto a live,
//! externally-defined destination schema:
//! - [`schema::BatchSchemaCache`] fetches each destination's property map once
//!   per batch and hands out read-only [`SchemaDefinition`]s
//! - [`aliases`] resolves internal fields to destination property names
//! - [`coerce`] converts a value to the declared property type
//! - [`mapper::map_record`] assembles the [`ExternalPayload`], degrading to a
//!   static legacy mapping when the schema is unusable

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

pub mod aliases;
pub mod coerce;
pub mod mapper;
pub mod schema;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Declared type of a destination property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyType {
    /// The destination's primary title column.
    Title,
    /// Formatted text.
    RichText,
    /// Email address.
    Email,
    /// Phone number.
    PhoneNumber,
    /// URL.
    Url,
    /// Single choice.
    Select,
    /// Multiple choices.
    MultiSelect,
    /// Numeric value.
    Number,
    /// Date or timestamp.
    Date,
    /// Any type this crate does not coerce natively; carries the raw name.
    Other(String),
}

impl PropertyType {
    /// Parse a destination type name. Unknown names map to [`PropertyType::Other`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "title" => Self::Title,
            "rich_text" | "text" => Self::RichText,
            "email" => Self::Email,
            "phone_number" => Self::PhoneNumber,
            "url" => Self::Url,
            "select" => Self::Select,
            "multi_select" => Self::MultiSelect,
            "number" => Self::Number,
            "date" => Self::Date,
            _ => Self::Other(raw.trim().to_owned()),
        }
    }

    /// Canonical type name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Title => "title",
            Self::RichText => "rich_text",
            Self::Email => "email",
            Self::PhoneNumber => "phone_number",
            Self::Url => "url",
            Self::Select => "select",
            Self::MultiSelect => "multi_select",
            Self::Number => "number",
            Self::Date => "date",
            Self::Other(name) => name,
        }
    }
}

/// One property of a destination schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaProperty {
    /// Property name exactly as the destination spells it.
    pub name: String,
    /// Declared type.
    pub kind: PropertyType,
}

/// Case-insensitive map from destination property name to declared type.
///
/// Immutable once built; share it with `Arc` for the lifetime of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDefinition {
    properties: BTreeMap<String, SchemaProperty>,
}

impl SchemaDefinition {
    /// Build a schema from `(name, type)` pairs.
    ///
    /// Names differing only by case collapse to the first occurrence.
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, PropertyType)>,
        S: Into<String>,
    {
        let mut properties = BTreeMap::new();
        for (name, kind) in pairs {
            let name = name.into();
            properties
                .entry(name.to_lowercase())
                .or_insert(SchemaProperty { name, kind });
        }
        Self { properties }
    }

    /// Build a schema from `(name, type name)` string pairs.
    pub fn from_type_names<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: AsRef<str>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, kind)| (name, PropertyType::parse(kind.as_ref()))),
        )
    }

    /// A schema with no properties (destination could not be inspected).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the schema has no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Case-insensitive property lookup.
    pub fn get(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.get(&name.to_lowercase())
    }

    /// The property declared with type `title`, if any.
    ///
    /// A well-formed destination has exactly one; if several exist the first
    /// in case-insensitive name order is used.
    pub fn title_property(&self) -> Option<&SchemaProperty> {
        self.properties
            .values()
            .find(|p| p.kind == PropertyType::Title)
    }

    /// Iterate properties in case-insensitive name order.
    pub fn iter(&self) -> impl Iterator<Item = &SchemaProperty> {
        self.properties.values()
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Text content of a rich-text run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextContent {
    /// The text.
    pub content: String,
}

/// One rich-text run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RichTextRun {
    /// Run content.
    pub text: TextContent,
}

impl RichTextRun {
    /// A plain run holding `content`.
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            text: TextContent {
                content: content.into(),
            },
        }
    }
}

/// A select option referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    /// Option label.
    pub name: String,
}

/// Start of a date property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateValue {
    /// ISO-8601 date or timestamp.
    pub start: String,
}

/// A type-coerced property value in destination wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    /// `{"title": [...]}`
    Title(Vec<RichTextRun>),
    /// `{"rich_text": [...]}`
    RichText(Vec<RichTextRun>),
    /// `{"email": "..."}`
    Email(String),
    /// `{"phone_number": "..."}`
    PhoneNumber(String),
    /// `{"url": "..."}`
    Url(String),
    /// `{"select": {"name": "..."}}`
    Select(SelectOption),
    /// `{"multi_select": [{"name": "..."}]}`
    MultiSelect(Vec<SelectOption>),
    /// `{"number": 0.0}`
    Number(f64),
    /// `{"date": {"start": "..."}}`
    Date(DateValue),
}

impl PropertyValue {
    /// Flatten the value to display text (runs and options joined).
    pub fn plain_text(&self) -> String {
        match self {
            Self::Title(runs) | Self::RichText(runs) => {
                runs.iter().map(|r| r.text.content.as_str()).collect()
            }
            Self::Email(s) | Self::PhoneNumber(s) | Self::Url(s) => s.clone(),
            Self::Select(option) => option.name.clone(),
            Self::MultiSelect(options) => options
                .iter()
                .map(|o| o.name.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            Self::Number(n) => n.to_string(),
            Self::Date(date) => date.start.clone(),
        }
    }
}

/// Which mapping produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMode {
    /// Properties resolved against the live schema.
    Schema,
    /// Static legacy mapping (schema empty or without a title property).
    Legacy,
}

/// Destination-ready record: property name → coerced value.
///
/// Serializes as a JSON object ordered by property name, so identical inputs
/// always produce byte-identical output.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalPayload {
    properties: BTreeMap<String, PropertyValue>,
    mode: MappingMode,
}

impl ExternalPayload {
    /// An empty payload built under `mode`.
    pub fn new(mode: MappingMode) -> Self {
        Self {
            properties: BTreeMap::new(),
            mode,
        }
    }

    /// Insert a property unless one with the same name is already set.
    ///
    /// Returns `true` when the value was inserted.
    pub fn insert(&mut self, name: &str, value: PropertyValue) -> bool {
        if self.properties.contains_key(name) {
            return false;
        }
        self.properties.insert(name.to_owned(), value);
        true
    }

    /// Look up a property by its exact name.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Whether a property with this exact name is set.
    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether no properties are set.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Mapping mode that produced this payload.
    pub fn mode(&self) -> MappingMode {
        self.mode
    }

    /// Iterate properties in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.properties.iter()
    }
}

impl Serialize for ExternalPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.properties.serialize(serializer)
    }
}

/// Inputs to mapping that are not part of the record or schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingContext {
    /// Processing timestamp used for synthesized and unparseable dates.
    pub processed_at: DateTime<Utc>,
}

impl MappingContext {
    /// Context stamped with the current time.
    pub fn now() -> Self {
        Self {
            processed_at: Utc::now(),
        }
    }

    /// Context with an explicit processing time.
    pub fn at(processed_at: DateTime<Utc>) -> Self {
        Self { processed_at }
    }
}
