//! OpenAI probe against a local HTTP server.

use std::time::Duration;

use cardsync::verification::openai::OpenAiKeyProbe;
use cardsync::verification::{CredentialProbe, ProbeError, ProbeMethod};

use crate::http_server::{closed_port_url, serve_once};

const KEY: &str = "sk-test_abcdefghijklmnopqrstuvwxyz";

fn probe_for(base_url: &str) -> OpenAiKeyProbe {
    match OpenAiKeyProbe::new(base_url, "gpt-probe", Duration::from_secs(5)) {
        Ok(probe) => probe,
        Err(err) => panic!("probe should build: {err}"),
    }
}

#[tokio::test]
async fn primary_lists_models_with_bearer_token() {
    let (url, request) = serve_once("200 OK", r#"{"object":"list","data":[]}"#).await;
    let result = probe_for(&url).probe(KEY, ProbeMethod::Primary).await;
    assert!(result.is_ok(), "{result:?}");

    let raw = match request.await {
        Ok(raw) => raw,
        Err(err) => panic!("server should capture request: {err}"),
    };
    assert!(raw.starts_with("GET /v1/models HTTP/1.1"), "{raw}");
    let expected = format!("authorization: bearer {}", KEY.to_ascii_lowercase());
    assert!(raw.to_ascii_lowercase().contains(&expected));
}

#[tokio::test]
async fn fallback_retrieves_configured_model() {
    let (url, request) = serve_once("200 OK", r#"{"id":"gpt-probe"}"#).await;
    let result = probe_for(&url).probe(KEY, ProbeMethod::Fallback).await;
    assert!(result.is_ok(), "{result:?}");

    let raw = match request.await {
        Ok(raw) => raw,
        Err(err) => panic!("server should capture request: {err}"),
    };
    assert!(raw.starts_with("GET /v1/models/gpt-probe HTTP/1.1"), "{raw}");
}

#[tokio::test]
async fn unauthorized_status_is_classified() {
    let (url, _request) = serve_once(
        "401 Unauthorized",
        r#"{"error":{"message":"Incorrect API key provided: sk-test_abcdefghijklmnopqrstuvwxyz","code":"invalid_api_key"}}"#,
    )
    .await;
    match probe_for(&url).probe(KEY, ProbeMethod::Primary).await {
        Err(ProbeError::Unauthorized(detail)) => {
            assert!(detail.contains("401"));
            assert!(!detail.contains("sk-test_abcdefghij"));
        }
        other => panic!("expected unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn quota_and_rate_limit_are_distinguished() {
    let (url, _request) = serve_once(
        "429 Too Many Requests",
        r#"{"error":{"code":"insufficient_quota"}}"#,
    )
    .await;
    assert!(matches!(
        probe_for(&url).probe(KEY, ProbeMethod::Primary).await,
        Err(ProbeError::QuotaExhausted(_))
    ));

    let (url, _request) = serve_once(
        "429 Too Many Requests",
        r#"{"error":{"code":"rate_limit_exceeded"}}"#,
    )
    .await;
    assert!(matches!(
        probe_for(&url).probe(KEY, ProbeMethod::Primary).await,
        Err(ProbeError::RateLimited(_))
    ));
}

#[tokio::test]
async fn refused_connection_is_transport_failure() {
    let url = closed_port_url().await;
    let result = probe_for(&url).probe(KEY, ProbeMethod::Primary).await;
    assert!(
        matches!(result, Err(ProbeError::Connection(_))),
        "expected connection failure, got {result:?}"
    );
}
