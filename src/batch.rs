//! Batch orchestration: many model responses in, destination records out.
//!
//! Extraction never stops on a bad response. Upload stops only when a
//! credential is rejected; every other failure is counted and reported.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::destinations::{DestinationError, RecordSink, SchemaSource};
use crate::extraction::interpreter::{interpret, Interpretation};
use crate::extraction::validator::validate_records;
use crate::extraction::ValidatedRecord;
use crate::projection::mapper::map_record;
use crate::projection::schema::BatchSchemaCache;
use crate::projection::MappingContext;
use crate::verification::CredentialCheck;

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Token counts reported by the model for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Completion tokens.
    #[serde(default)]
    pub completion_tokens: u64,
    /// Total tokens.
    #[serde(default)]
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Add `other` into `self`.
    pub fn accumulate(&mut self, other: TokenUsage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self
            .completion_tokens
            .saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

/// Raw text returned by the vision model for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Label of the source image (file name or similar).
    pub source: String,
    /// Raw response text.
    pub text: String,
    /// Token usage for the call.
    #[serde(default)]
    pub usage: TokenUsage,
}

/// A validated record tagged with the image it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Source image label.
    pub source: String,
    /// The record.
    #[serde(flatten)]
    pub record: ValidatedRecord,
}

/// A response that yielded nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    /// Source image label.
    pub source: String,
    /// Interpreter error.
    pub error: String,
    /// Preview of the raw response.
    pub raw_response: String,
}

/// Result of extracting a whole batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionBatch {
    /// All validated records, in response order.
    pub records: Vec<ExtractedRecord>,
    /// Responses the interpreter could not recover.
    pub failures: Vec<SourceFailure>,
    /// Summed token usage.
    pub usage: TokenUsage,
}

/// Interpret and validate every response in order.
pub fn extract_batch(responses: &[ModelResponse]) -> ExtractionBatch {
    let mut batch = ExtractionBatch::default();

    for response in responses {
        batch.usage.accumulate(response.usage);

        let interpretation = interpret(&response.text);
        if let Interpretation::Failed {
            error,
            raw_response,
            ..
        } = interpretation
        {
            warn!(source = %response.source, error = %error, "no records recovered from response");
            batch.failures.push(SourceFailure {
                source: response.source.clone(),
                error,
                raw_response,
            });
            continue;
        }

        let validated = validate_records(interpretation.cards());
        debug!(
            source = %response.source,
            candidates = interpretation.cards().len(),
            records = validated.len(),
            fallback = interpretation.used_fallback(),
            "extracted records"
        );
        batch
            .records
            .extend(validated.into_iter().map(|record| ExtractedRecord {
                source: response.source.clone(),
                record,
            }));
    }

    info!(
        responses = responses.len(),
        records = batch.records.len(),
        failures = batch.failures.len(),
        total_tokens = batch.usage.total_tokens,
        "batch extraction complete"
    );
    batch
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// Errors that halt a batch.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The model API credential is not usable.
    #[error("credential not accepted: {0}")]
    Authentication(String),
    /// The destination rejected its credentials mid-batch.
    #[error("destination rejected credentials after {} created: {source}", partial.created)]
    DestinationAuthentication {
        /// The 401/403 response.
        source: DestinationError,
        /// Outcomes for the records handled before the halt.
        partial: UploadSummary,
    },
}

/// Refuse to proceed unless `check` accepted the credential.
///
/// # Errors
///
/// Returns `BatchError::Authentication` carrying the advisory message.
pub fn authorize(check: &CredentialCheck) -> Result<(), BatchError> {
    if check.valid {
        Ok(())
    } else {
        Err(BatchError::Authentication(check.message.clone()))
    }
}

/// One record queued for upload with its duplicate flags.
///
/// Duplicate detection happens upstream; this only carries the verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadCandidate {
    /// Record to upload.
    pub record: ValidatedRecord,
    /// Flagged as a likely duplicate.
    pub is_duplicate: bool,
    /// Operator confirmed the record should be uploaded anyway.
    pub verified: bool,
}

impl UploadCandidate {
    /// A candidate not flagged as duplicate.
    pub fn new(record: ValidatedRecord) -> Self {
        Self {
            record,
            is_duplicate: false,
            verified: false,
        }
    }
}

/// Outcome counts for one upload batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    /// Records created.
    pub created: usize,
    /// Records skipped as unverified duplicates.
    pub skipped: usize,
    /// Records the destination refused.
    pub failed: usize,
    /// Identifiers of created records.
    pub record_ids: Vec<String>,
    /// One line per skipped or failed record.
    pub messages: Vec<String>,
}

/// Projects and uploads records to one destination.
pub struct BatchUploader<'a> {
    schema_source: &'a dyn SchemaSource,
    sink: &'a dyn RecordSink,
    destination_id: String,
}

impl std::fmt::Debug for BatchUploader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchUploader")
            .field("destination_id", &self.destination_id)
            .finish_non_exhaustive()
    }
}

impl<'a> BatchUploader<'a> {
    /// Uploader writing to `destination_id`.
    pub fn new(
        schema_source: &'a dyn SchemaSource,
        sink: &'a dyn RecordSink,
        destination_id: impl Into<String>,
    ) -> Self {
        Self {
            schema_source,
            sink,
            destination_id: destination_id.into(),
        }
    }

    /// Upload `candidates` after checking the credential.
    ///
    /// A fresh schema cache is used for every call.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError`] when the credential check failed or the
    /// destination answers 401/403; the latter carries the summary of the
    /// records already handled. Other failures are counted in the summary.
    pub async fn upload(
        &self,
        check: &CredentialCheck,
        candidates: &[UploadCandidate],
        ctx: &MappingContext,
    ) -> Result<UploadSummary, BatchError> {
        authorize(check)?;

        let mut cache = BatchSchemaCache::new();
        let schema = cache
            .schema_for(self.schema_source, &self.destination_id)
            .await;

        let mut summary = UploadSummary::default();
        for (idx, candidate) in candidates.iter().enumerate() {
            let row = idx.saturating_add(1);
            if candidate.is_duplicate && !candidate.verified {
                debug!(row, "skipping unverified duplicate");
                summary.skipped = summary.skipped.saturating_add(1);
                summary
                    .messages
                    .push(format!("Row {row}: skipped duplicate entry"));
                continue;
            }

            let payload = map_record(&candidate.record, &schema, ctx);
            match self.sink.create_record(&self.destination_id, &payload).await {
                Ok(id) => {
                    summary.created = summary.created.saturating_add(1);
                    summary.record_ids.push(id);
                }
                Err(e) if e.is_authentication() => {
                    warn!(
                        row,
                        created = summary.created,
                        error = %e,
                        "destination rejected credentials, halting batch"
                    );
                    return Err(BatchError::DestinationAuthentication {
                        source: e,
                        partial: summary,
                    });
                }
                Err(e) => {
                    warn!(row, error = %e, "failed to create record");
                    summary.failed = summary.failed.saturating_add(1);
                    summary.messages.push(format!("Row {row}: {e}"));
                }
            }
        }

        info!(
            created = summary.created,
            skipped = summary.skipped,
            failed = summary.failed,
            "upload complete"
        );
        Ok(summary)
    }
}
