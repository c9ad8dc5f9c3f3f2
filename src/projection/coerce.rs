//! Type-directed coercion of one text value into a [`PropertyValue`].
//!
//! One arm per [`PropertyType`]; unknown types reuse rich-text coercion so
//! data is never dropped just because the type is unsupported.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use tracing::debug;

use super::{DateValue, MappingContext, PropertyType, PropertyValue, RichTextRun, SelectOption};
use crate::text::cap_chars;

/// Cap for title and rich-text runs.
pub const TEXT_MAX_CHARS: usize = 2000;

/// Cap for select and multi-select option names.
pub const OPTION_MAX_CHARS: usize = 100;

/// Why a value could not be coerced. The property is omitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoercionError {
    /// Value was empty after trimming.
    #[error("value is empty")]
    Empty,
    /// Email without `@`.
    #[error("value is not an email address")]
    NotEmail,
    /// Not parseable as a finite number.
    #[error("value is not numeric: {0:?}")]
    NotNumeric(String),
    /// Multi-select had no non-empty tokens.
    #[error("no options after splitting")]
    NoOptions,
}

/// Coerce `value` to the destination type `kind`.
///
/// # Errors
///
/// Returns [`CoercionError`] when the value cannot be represented; callers
/// omit the property and carry on.
pub fn coerce(
    kind: &PropertyType,
    value: &str,
    ctx: &MappingContext,
) -> Result<PropertyValue, CoercionError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoercionError::Empty);
    }

    match kind {
        PropertyType::Title => Ok(PropertyValue::Title(text_runs(value))),
        PropertyType::RichText => Ok(PropertyValue::RichText(text_runs(value))),
        PropertyType::Email => {
            if value.contains('@') {
                Ok(PropertyValue::Email(value.to_owned()))
            } else {
                Err(CoercionError::NotEmail)
            }
        }
        PropertyType::PhoneNumber => Ok(PropertyValue::PhoneNumber(value.to_owned())),
        PropertyType::Url => Ok(PropertyValue::Url(with_scheme(value))),
        PropertyType::Select => Ok(PropertyValue::Select(option(value))),
        PropertyType::MultiSelect => {
            let options: Vec<SelectOption> = value
                .split(';')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(option)
                .filter(|o| !o.name.is_empty())
                .collect();
            if options.is_empty() {
                Err(CoercionError::NoOptions)
            } else {
                Ok(PropertyValue::MultiSelect(options))
            }
        }
        PropertyType::Number => parse_number(value)
            .map(PropertyValue::Number)
            .ok_or_else(|| CoercionError::NotNumeric(value.to_owned())),
        PropertyType::Date => Ok(PropertyValue::Date(DateValue {
            start: parse_date(value).unwrap_or_else(|| {
                debug!("unparseable date, substituting processing time");
                iso_timestamp(ctx.processed_at)
            }),
        })),
        PropertyType::Other(name) => {
            debug!(property_type = %name, "unsupported property type, writing as rich text");
            Ok(PropertyValue::RichText(text_runs(value)))
        }
    }
}

/// Single plain run capped to [`TEXT_MAX_CHARS`].
pub fn text_runs(value: &str) -> Vec<RichTextRun> {
    vec![RichTextRun::plain(cap_chars(value, TEXT_MAX_CHARS))]
}

/// Prefix `https://` unless the value already has an http(s) scheme.
pub fn with_scheme(value: &str) -> String {
    let lower = value.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        value.to_owned()
    } else {
        format!("https://{value}")
    }
}

/// Finite number, tolerating surrounding whitespace.
pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Render a timestamp as ISO-8601 in UTC with second precision.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse common timestamp spellings into ISO-8601.
///
/// Full timestamps are normalised to UTC; bare dates stay dates.
pub fn parse_date(value: &str) -> Option<String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(iso_timestamp(parsed.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(iso_timestamp(naive.and_utc()));
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    None
}

fn option(value: &str) -> SelectOption {
    SelectOption {
        name: cap_chars(value.trim(), OPTION_MAX_CHARS).trim_end().to_owned(),
    }
}
