//! OpenAI-style credential probe.
//!
//! Primary: `GET /v1/models`. Fallback: `GET /v1/models/{model}`.

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::{CredentialProbe, ProbeError, ProbeMethod};
use crate::http::{build_client, sanitize_error_body};

/// Default API base.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/";

/// Model retrieved by the fallback probe unless configured otherwise.
pub const DEFAULT_PROBE_MODEL: &str = "gpt-4o-mini";

/// Probe against an OpenAI-compatible models endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiKeyProbe {
    base_url: Url,
    model: String,
    client: reqwest::Client,
}

impl OpenAiKeyProbe {
    /// Create a probe for `base_url`; the fallback retrieves `model`.
    ///
    /// # Errors
    ///
    /// Returns a description if the base URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut base = base_url.trim().to_owned();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| anyhow::anyhow!("invalid OpenAI base URL {base:?}: {e}"))?;
        Ok(Self {
            base_url,
            model: model.into(),
            client: build_client(timeout)?,
        })
    }

    /// Endpoint for `method`.
    pub fn endpoint(&self, method: ProbeMethod) -> Result<Url, ProbeError> {
        let path = match method {
            ProbeMethod::Primary => "v1/models".to_owned(),
            ProbeMethod::Fallback => format!("v1/models/{}", self.model),
        };
        self.base_url
            .join(&path)
            .map_err(|e| ProbeError::Other(format!("invalid endpoint {path}: {e}")))
    }
}

#[async_trait]
impl CredentialProbe for OpenAiKeyProbe {
    async fn probe(&self, credential: &str, method: ProbeMethod) -> Result<(), ProbeError> {
        let url = self.endpoint(method)?;
        debug!(?method, "probing credential");

        let response = self
            .client
            .get(url)
            .header("authorization", format!("Bearer {credential}"))
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status.as_u16(), &body))
    }
}

/// Map a non-success HTTP status and body to a [`ProbeError`].
pub fn classify_status(status: u16, body: &str) -> ProbeError {
    let detail = format!("HTTP {status}: {}", sanitize_error_body(body));
    match status {
        401 | 403 => ProbeError::Unauthorized(detail),
        429 if body.contains("insufficient_quota") => ProbeError::QuotaExhausted(detail),
        429 => ProbeError::RateLimited(detail),
        408 | 504 => ProbeError::Timeout(detail),
        _ => ProbeError::Other(detail),
    }
}

/// Map a transport failure to a [`ProbeError`].
///
/// Certificate problems surface as connect errors, so the source chain is
/// searched for TLS markers before falling back to `Connection`.
pub fn classify_transport_error(error: &reqwest::Error) -> ProbeError {
    let chain = error_chain(error);
    if is_certificate_failure(&chain) {
        return ProbeError::Certificate(chain);
    }
    if error.is_timeout() {
        return ProbeError::Timeout(chain);
    }
    if error.is_connect() {
        return ProbeError::Connection(chain);
    }
    ProbeError::Other(chain)
}

/// Whether an error description mentions a TLS or certificate failure.
pub fn is_certificate_failure(description: &str) -> bool {
    let lower = description.to_ascii_lowercase();
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|marker| lower.contains(marker))
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}
