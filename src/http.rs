//! HTTP helpers shared by the destination and verification clients.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

/// Longest error body surfaced to callers and logs.
pub const MAX_ERROR_BODY_CHARS: usize = 256;

/// Default per-request timeout for outbound calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static SECRET_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"sk-ant-[A-Za-z0-9_\-]{10,}",
        r"sk-(?:proj-)?[A-Za-z0-9_\-]{20,}",
        r"secret_[A-Za-z0-9]{20,}",
        r"ntn_[A-Za-z0-9]{20,}",
        r"(?i)bearer\s+[A-Za-z0-9._\-]{16,}",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Make an upstream error body safe to log.
///
/// Whitespace is collapsed, token-like strings are replaced with
/// `[REDACTED]` and the result is capped at [`MAX_ERROR_BODY_CHARS`].
pub fn sanitize_error_body(raw: &str) -> String {
    let mut sanitized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    for regex in SECRET_PATTERNS.iter() {
        sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
    }

    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

/// Build the shared `reqwest` client with a request timeout.
///
/// # Errors
///
/// Returns the builder error if the TLS backend cannot be initialised.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("cardsync/", env!("CARGO_PKG_VERSION")))
        .build()
}
