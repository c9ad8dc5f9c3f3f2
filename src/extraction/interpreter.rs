//! Response interpreter: recovers candidate records from raw model text.
//!
//! Model output is treated as adversarial. Extra prose, markdown fences and
//! truncation are all common, so an ordered chain of recovery strategies is
//! tried before degrading to regex fallback extraction. [`interpret`] never
//! fails; it always returns one of the two [`Interpretation`] shapes.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::fallback::extract_fallback;
use super::{CandidateRecord, ContactField, ContactFields};
use crate::text::cap_chars;

/// Confidence assigned to records recovered by fallback extraction.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Confidence used when a card's confidence cannot be coerced.
pub const DEFAULT_CANDIDATE_CONFIDENCE: f64 = 1.0;

/// How much of the raw response is echoed back on total failure.
pub const RAW_RESPONSE_PREVIEW_CHARS: usize = 500;

/// Error message for an empty or whitespace-only response.
pub const EMPTY_RESPONSE_ERROR: &str = "empty response";

/// Error message when neither JSON nor fallback extraction found anything.
pub const UNPARSEABLE_RESPONSE_ERROR: &str =
    "failed to parse response as JSON and fallback extraction found no contact details";

// ---------------------------------------------------------------------------
// Output shapes
// ---------------------------------------------------------------------------

/// How a successful interpretation was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// A JSON strategy succeeded.
    Parsed(ParseStrategy),
    /// JSON recovery failed; regex fallback produced one record.
    Fallback,
}

/// Result of interpreting one raw response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Interpretation {
    /// Candidate records were recovered.
    Cards {
        /// Recovered candidates, possibly empty if the model reported no cards.
        cards: Vec<CandidateRecord>,
        /// Which path produced them.
        recovered_by: Recovery,
    },
    /// Nothing could be recovered.
    Failed {
        /// Human-readable reason.
        error: String,
        /// Always empty; present so the shape matches the success case.
        cards: Vec<CandidateRecord>,
        /// First characters of the response, for operator display.
        raw_response: String,
    },
}

impl Interpretation {
    /// Borrow the recovered candidates (empty on failure).
    pub fn cards(&self) -> &[CandidateRecord] {
        match self {
            Self::Cards { cards, .. } | Self::Failed { cards, .. } => cards,
        }
    }

    /// Take ownership of the recovered candidates.
    pub fn into_cards(self) -> Vec<CandidateRecord> {
        match self {
            Self::Cards { cards, .. } | Self::Failed { cards, .. } => cards,
        }
    }

    /// The failure reason, if nothing was recovered.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Cards { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    /// Whether the records came from regex fallback extraction.
    pub fn used_fallback(&self) -> bool {
        matches!(
            self,
            Self::Cards {
                recovered_by: Recovery::Fallback,
                ..
            }
        )
    }

    fn failed(error: &str, raw: &str) -> Self {
        Self::Failed {
            error: error.to_owned(),
            cards: Vec::new(),
            raw_response: cap_chars(raw, RAW_RESPONSE_PREVIEW_CHARS).to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// One JSON recovery strategy. Strategies are pure text transforms tried in
/// [`ParseStrategy::ORDER`]; the first that yields an object with a `cards`
/// key wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    /// Parse the trimmed text as-is.
    Direct,
    /// Remove markdown code fences, then parse.
    CodeFence,
    /// First `{...}` region found by a greedy regex.
    FirstObject,
    /// Slice from the first `{` to the last `}`.
    OuterBraces,
    /// Strip narrative before and after a `{...}` blob.
    StripNarrative,
    /// Locate a `{"cards": [...]}`-shaped region specifically.
    CardsEnvelope,
}

static FENCE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?\n?(.*?)\n?```").ok());

static OBJECT_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").ok());

static NARRATIVE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)^.*?(\{.*\}).*?$").ok());

static ENVELOPE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?s)\{[^{]*"cards"[^{]*\[.*?\]\s*\}"#).ok());

impl ParseStrategy {
    /// Fixed order in which strategies are attempted.
    pub const ORDER: [Self; 6] = [
        Self::Direct,
        Self::CodeFence,
        Self::FirstObject,
        Self::OuterBraces,
        Self::StripNarrative,
        Self::CardsEnvelope,
    ];

    /// Produce the candidate JSON text for this strategy, if any.
    pub fn candidate<'a>(self, text: &'a str) -> Option<Cow<'a, str>> {
        match self {
            Self::Direct => Some(Cow::Borrowed(text.trim())),
            Self::CodeFence => {
                let regex = FENCE_RE.as_ref()?;
                let stripped = regex.replace_all(text, "$1");
                Some(Cow::Owned(stripped.trim().to_owned()))
            }
            Self::FirstObject => {
                let regex = OBJECT_RE.as_ref()?;
                regex.find(text).map(|m| Cow::Borrowed(m.as_str()))
            }
            Self::OuterBraces => {
                let start = text.find('{')?;
                let end = text.rfind('}')?;
                if end < start {
                    return None;
                }
                text.get(start..=end).map(Cow::Borrowed)
            }
            Self::StripNarrative => {
                let regex = NARRATIVE_RE.as_ref()?;
                regex
                    .captures(text)
                    .and_then(|caps| caps.get(1))
                    .map(|m| Cow::Borrowed(m.as_str()))
            }
            Self::CardsEnvelope => {
                let regex = ENVELOPE_RE.as_ref()?;
                regex.find(text).map(|m| Cow::Borrowed(m.as_str()))
            }
        }
    }

    /// Apply the strategy: transform, parse, and require a `cards` key.
    pub fn apply(self, text: &str) -> Option<Map<String, Value>> {
        let candidate = self.candidate(text)?;
        match serde_json::from_str::<Value>(&candidate) {
            Ok(Value::Object(object)) if object.contains_key("cards") => Some(object),
            Ok(_) => {
                debug!(strategy = ?self, "parsed JSON lacks a cards key");
                None
            }
            Err(e) => {
                debug!(strategy = ?self, error = %e, "strategy failed to parse");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Interpret raw model text as a set of candidate records.
///
/// Tries every [`ParseStrategy`] in order, then regex fallback extraction.
/// Never panics and never returns an error: total failure is reported through
/// [`Interpretation::Failed`].
pub fn interpret(raw: &str) -> Interpretation {
    if raw.trim().is_empty() {
        warn!("model returned an empty response");
        return Interpretation::failed(EMPTY_RESPONSE_ERROR, raw);
    }

    for strategy in ParseStrategy::ORDER {
        if let Some(object) = strategy.apply(raw) {
            let cards = candidates_from_object(&object);
            debug!(strategy = ?strategy, count = cards.len(), "interpreted model response");
            return Interpretation::Cards {
                cards,
                recovered_by: Recovery::Parsed(strategy),
            };
        }
    }

    match extract_fallback(raw) {
        Some(fields) => {
            warn!("response was not valid JSON, used fallback extraction");
            Interpretation::Cards {
                cards: vec![CandidateRecord {
                    card_number: 1,
                    confidence: FALLBACK_CONFIDENCE,
                    fields,
                    fallback: true,
                }],
                recovered_by: Recovery::Fallback,
            }
        }
        None => {
            warn!(
                preview = cap_chars(raw, 200),
                "could not recover any contact data from response"
            );
            Interpretation::failed(UNPARSEABLE_RESPONSE_ERROR, raw)
        }
    }
}

/// Convert the `cards` array of a parsed response into candidates.
///
/// Non-object elements are dropped. A non-array `cards` value yields no
/// candidates.
fn candidates_from_object(object: &Map<String, Value>) -> Vec<CandidateRecord> {
    let Some(Value::Array(elements)) = object.get("cards") else {
        debug!("cards value is not an array, treating as empty");
        return Vec::new();
    };

    let mut cards: Vec<CandidateRecord> = Vec::with_capacity(elements.len());
    for element in elements {
        let Value::Object(card) = element else {
            debug!("dropping non-object card element");
            continue;
        };
        let position = u32::try_from(cards.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        cards.push(candidate_from_card(card, position));
    }
    cards
}

fn candidate_from_card(card: &Map<String, Value>, position: u32) -> CandidateRecord {
    let card_number = card
        .get("card_number")
        .and_then(coerce_card_number)
        .unwrap_or(position);

    let confidence = card
        .get("confidence")
        .and_then(coerce_float)
        .map_or(DEFAULT_CANDIDATE_CONFIDENCE, |c| c.clamp(0.0, 1.0));

    // Fields normally live under `extracted_data`; some models flatten them.
    let source = match card.get("extracted_data") {
        Some(Value::Object(data)) => data,
        _ => card,
    };

    let mut fields = ContactFields::default();
    for field in ContactField::ALL {
        fields.set(field, source.get(field.key()).map(text_value).unwrap_or_default());
    }

    CandidateRecord {
        card_number,
        confidence,
        fields,
        fallback: false,
    }
}

/// Positive integer from a JSON number or numeric string.
fn coerce_card_number(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).and_then(f64_to_u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(number).ok().filter(|n| *n > 0)
}

fn f64_to_u64(value: f64) -> Option<u64> {
    format!("{value:.0}").parse::<u64>().ok()
}

/// Finite float from a JSON number or numeric string.
pub(crate) fn coerce_float(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Stringify scalar JSON; null and containers become empty.
fn text_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}
