//! API credential validation with bounded retry and a session cache.
//!
//! [`CredentialValidator::validate`] checks the key format locally, then
//! performs a lightweight authenticated round-trip through a
//! [`CredentialProbe`]. Transient failures (rate limit, quota, timeout,
//! connection) are retried with exponential backoff; once the primary
//! method is exhausted one fallback round-trip is attempted. Successful and
//! skipped validations are cached in a [`ValidationCache`] keyed by a short
//! credential prefix, never the full secret.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

pub mod openai;

/// Characters of the credential used as the cache key.
pub const CACHE_KEY_CHARS: usize = 16;

/// Required credential prefix.
pub const CREDENTIAL_PREFIX: &str = "sk-";

/// Minimum characters after [`CREDENTIAL_PREFIX`].
pub const MIN_SUFFIX_CHARS: usize = 20;

/// Default total attempts per probe method.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry, in milliseconds.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;

/// Default cap on the retry delay, in milliseconds.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 8_000;

// ---------------------------------------------------------------------------
// Probe collaborator
// ---------------------------------------------------------------------------

/// Which lightweight round-trip to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeMethod {
    /// Default round-trip (list models).
    Primary,
    /// Alternative round-trip (retrieve one model).
    Fallback,
}

/// Failure of a single probe round-trip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// Credential rejected (401/403).
    #[error("credential rejected: {0}")]
    Unauthorized(String),
    /// Too many requests.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Account quota or billing exhausted.
    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),
    /// Request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Could not connect.
    #[error("connection failed: {0}")]
    Connection(String),
    /// TLS or certificate verification failed.
    #[error("certificate verification failed: {0}")]
    Certificate(String),
    /// Anything else.
    #[error("probe failed: {0}")]
    Other(String),
}

impl ProbeError {
    /// Whether retrying the same method may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::QuotaExhausted(_) | Self::Timeout(_) | Self::Connection(_)
        )
    }

    /// Whether validation must stop without retry or fallback.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::Certificate(_))
    }

    /// Operator-facing classification.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Unauthorized(_) => FailureKind::AuthenticationRejected,
            Self::RateLimited(_) | Self::QuotaExhausted(_) => FailureKind::RateLimited,
            Self::Timeout(_) | Self::Connection(_) => FailureKind::Transport,
            Self::Certificate(_) => FailureKind::Certificate,
            Self::Other(_) => FailureKind::Invalid,
        }
    }
}

/// Performs one authenticated round-trip with a credential.
#[async_trait]
pub trait CredentialProbe: Send + Sync {
    /// Probe `credential` using `method`.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ProbeError`] on any failure.
    async fn probe(&self, credential: &str, method: ProbeMethod) -> Result<(), ProbeError>;
}

// ---------------------------------------------------------------------------
// Results and cache
// ---------------------------------------------------------------------------

/// Why a credential was judged invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Key does not match the expected format.
    MalformedKey,
    /// Upstream rejected the key.
    AuthenticationRejected,
    /// Rate limit or quota exhausted after retries.
    RateLimited,
    /// Timeout or connection failure after retries.
    Transport,
    /// TLS/certificate failure.
    Certificate,
    /// Unclassified failure.
    Invalid,
}

impl FailureKind {
    /// Advisory text shown to the operator.
    pub fn advisory(self) -> &'static str {
        match self {
            Self::MalformedKey => {
                "API key format is invalid: expected 'sk-' followed by at least 20 characters"
            }
            Self::AuthenticationRejected => {
                "API key was rejected: check that it is correct and still active"
            }
            Self::RateLimited => {
                "rate limit or quota exhausted: check your plan limits and billing"
            }
            Self::Transport => "could not reach the API: check your network connection",
            Self::Certificate => {
                "TLS certificate verification failed: check proxy or system certificates"
            }
            Self::Invalid => "API key validation failed",
        }
    }
}

/// Outcome of validating one credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialCheck {
    /// Whether the credential may be used.
    pub valid: bool,
    /// Advisory message for the operator.
    pub message: String,
    /// Failure classification when `valid` is false.
    pub failure: Option<FailureKind>,
    /// Whether a network round-trip confirmed the credential.
    pub verified: bool,
    /// Whether this result came from the session cache.
    pub cached: bool,
}

impl CredentialCheck {
    fn success(method: ProbeMethod) -> Self {
        let message = match method {
            ProbeMethod::Primary => "API key is valid",
            ProbeMethod::Fallback => "API key is valid (confirmed via fallback check)",
        };
        Self {
            valid: true,
            message: message.to_owned(),
            failure: None,
            verified: true,
            cached: false,
        }
    }

    fn skipped() -> Self {
        Self {
            valid: true,
            message: "verification skipped: proceeding with unverified key".to_owned(),
            failure: None,
            verified: false,
            cached: false,
        }
    }

    fn failed(kind: FailureKind) -> Self {
        Self {
            valid: false,
            message: kind.advisory().to_owned(),
            failure: Some(kind),
            verified: false,
            cached: false,
        }
    }
}

/// Session-scoped cache of accepted credentials.
///
/// Keys are the first [`CACHE_KEY_CHARS`] characters of the credential.
#[derive(Debug, Default)]
pub struct ValidationCache {
    entries: HashMap<String, CredentialCheck>,
}

impl ValidationCache {
    /// An empty cache for a new session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for `credential`, if any.
    pub fn get(&self, credential: &str) -> Option<&CredentialCheck> {
        self.entries.get(&cache_key(credential))
    }

    fn insert(&mut self, credential: &str, check: &CredentialCheck) {
        self.entries.insert(cache_key(credential), check.clone());
    }

    /// Number of cached credentials.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached result.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Prefix of `credential` used as the cache key.
pub fn cache_key(credential: &str) -> String {
    credential.trim().chars().take(CACHE_KEY_CHARS).collect()
}

/// `sk-` followed by at least 20 of `[A-Za-z0-9_-]`.
pub fn is_well_formed(credential: &str) -> bool {
    let Some(suffix) = credential.strip_prefix(CREDENTIAL_PREFIX) else {
        return false;
    };
    suffix.chars().count() >= MIN_SUFFIX_CHARS
        && suffix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Retry schedule for transient probe failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per method, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Cap on the delay, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

/// Caller switches for one validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Accept a well-formed key without a network round-trip.
    pub skip_verification: bool,
    /// Start with the fallback method (no further fallback is then available).
    pub use_fallback: bool,
}

/// Validates credentials through a [`CredentialProbe`].
#[derive(Debug)]
pub struct CredentialValidator<P> {
    probe: P,
    policy: RetryPolicy,
}

impl<P: CredentialProbe> CredentialValidator<P> {
    /// Validator with the default [`RetryPolicy`].
    pub fn new(probe: P) -> Self {
        Self::with_policy(probe, RetryPolicy::default())
    }

    /// Validator with an explicit retry policy.
    pub fn with_policy(probe: P, policy: RetryPolicy) -> Self {
        Self { probe, policy }
    }

    /// The underlying probe.
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Validate `credential`, consulting and updating `cache`.
    ///
    /// Never fails; every outcome is described by the returned
    /// [`CredentialCheck`].
    pub async fn validate(
        &self,
        cache: &mut ValidationCache,
        credential: &str,
        options: ValidateOptions,
    ) -> CredentialCheck {
        let credential = credential.trim();
        if !is_well_formed(credential) {
            debug!("credential is malformed, skipping network check");
            return CredentialCheck::failed(FailureKind::MalformedKey);
        }

        if let Some(hit) = cache.get(credential) {
            debug!("credential validation cache hit");
            let mut check = hit.clone();
            check.cached = true;
            return check;
        }

        if options.skip_verification {
            info!("credential verification skipped by caller");
            let check = CredentialCheck::skipped();
            cache.insert(credential, &check);
            return check;
        }

        let first = if options.use_fallback {
            ProbeMethod::Fallback
        } else {
            ProbeMethod::Primary
        };

        let error = match self.probe_with_retry(credential, first).await {
            Ok(()) => return self.accept(cache, credential, first),
            Err(e) => e,
        };

        if error.is_terminal() || first == ProbeMethod::Fallback {
            warn!(error = %error, "credential validation failed");
            return CredentialCheck::failed(error.kind());
        }

        info!(error = %error, "primary credential check failed, trying fallback method");
        match self.probe.probe(credential, ProbeMethod::Fallback).await {
            Ok(()) => self.accept(cache, credential, ProbeMethod::Fallback),
            Err(e) => {
                warn!(error = %e, "fallback credential check failed");
                CredentialCheck::failed(e.kind())
            }
        }
    }

    fn accept(
        &self,
        cache: &mut ValidationCache,
        credential: &str,
        method: ProbeMethod,
    ) -> CredentialCheck {
        let check = CredentialCheck::success(method);
        cache.insert(credential, &check);
        check
    }

    async fn probe_with_retry(
        &self,
        credential: &str,
        method: ProbeMethod,
    ) -> Result<(), ProbeError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut backoff_ms = self.policy.initial_backoff_ms;
        let mut attempt: u32 = 1;

        loop {
            match self.probe.probe(credential, method).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(
                        error = %e,
                        attempt,
                        backoff_ms,
                        ?method,
                        "transient credential check failure, backing off"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = backoff_ms
                        .saturating_mul(2)
                        .min(self.policy.max_backoff_ms);
                    attempt = attempt.saturating_add(1);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
