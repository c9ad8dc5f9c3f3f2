//! Destination collaborators.
//!
//! The projection engine and batch uploader talk to a destination through
//! two traits:
//! - [`SchemaSource`] fetches a destination schema as name/type pairs
//! - [`RecordSink`] creates one record from a payload
//!
//! [`notion::NotionClient`] implements both against a Notion-style REST API.

use async_trait::async_trait;

use crate::http::sanitize_error_body;
use crate::projection::ExternalPayload;

pub mod notion;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by destination clients.
#[derive(Debug, thiserror::Error)]
pub enum DestinationError {
    /// HTTP transport failure.
    #[error("destination request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Destination responded with a non-success status.
    #[error("destination returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// Response did not match the expected shape.
    #[error("destination response parse error: {0}")]
    Parse(String),
    /// Base URL or identifier could not form a valid endpoint.
    #[error("invalid destination endpoint: {0}")]
    InvalidEndpoint(String),
}

impl DestinationError {
    /// Whether the destination rejected the credentials (401/403).
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::HttpStatus { status: 401 | 403, .. })
    }
}

/// Check HTTP response status and return body text or a structured error.
///
/// # Errors
///
/// Returns `DestinationError::Request` on transport failure,
/// `DestinationError::HttpStatus` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, DestinationError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(DestinationError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_error_body(&body),
        });
    }
    Ok(body)
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Fetches a destination's live property map.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Return `(property name, type name)` pairs for `destination_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError`] on transport, status or parse failure.
    async fn fetch_schema(
        &self,
        destination_id: &str,
    ) -> Result<Vec<(String, String)>, DestinationError>;
}

/// Persists one projected record.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Create a record in `destination_id` and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError`] on transport, status or parse failure.
    async fn create_record(
        &self,
        destination_id: &str,
        payload: &ExternalPayload,
    ) -> Result<String, DestinationError>;
}
