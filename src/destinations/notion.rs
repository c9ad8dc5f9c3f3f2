//! Notion-style REST destination.
//!
//! `GET /v1/databases/{id}` supplies the schema and `POST /v1/pages`
//! creates one record per payload.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{check_http_response, DestinationError, RecordSink, SchemaSource};
use crate::http::build_client;
use crate::projection::ExternalPayload;

/// Default API base.
pub const NOTION_API_BASE: &str = "https://api.notion.com/";

/// API version sent in the `Notion-Version` header.
pub const NOTION_API_VERSION: &str = "2022-06-28";

/// Client for a Notion-compatible database API.
#[derive(Clone)]
pub struct NotionClient {
    base_url: Url,
    token: String,
    version: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"__REDACTED__")
            .field("version", &self.version)
            .finish()
    }
}

impl NotionClient {
    /// Create a client for `base_url` authenticated with `token`.
    ///
    /// # Errors
    ///
    /// Returns `DestinationError::InvalidEndpoint` if `base_url` does not
    /// parse, or `DestinationError::Request` if the HTTP client cannot be
    /// built.
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DestinationError> {
        let mut base = base_url.trim().to_owned();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| DestinationError::InvalidEndpoint(format!("{base_url}: {e}")))?;

        Ok(Self {
            base_url,
            token: token.into(),
            version: NOTION_API_VERSION.to_owned(),
            client: build_client(timeout)?,
        })
    }

    /// Override the `Notion-Version` header.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, DestinationError> {
        self.base_url
            .join(path)
            .map_err(|e| DestinationError::InvalidEndpoint(format!("{path}: {e}")))
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("authorization", format!("Bearer {}", self.token))
            .header("notion-version", &self.version)
    }
}

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Database object returned by `GET /v1/databases/{id}`.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct DatabaseResponse {
    /// Property name → property object.
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
}

/// Body of `POST /v1/pages`.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct CreatePageRequest<'a> {
    /// Target database.
    pub parent: PageParent<'a>,
    /// Projected properties.
    pub properties: &'a ExternalPayload,
}

/// Parent reference for a new page.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct PageParent<'a> {
    /// Database identifier.
    pub database_id: &'a str,
}

/// Page object returned by `POST /v1/pages`.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct CreatePageResponse {
    /// New page identifier.
    pub id: String,
}

/// Parse a database body into `(name, type)` pairs.
///
/// Properties without a string `type` are reported as `other`.
#[doc(hidden)]
pub fn parse_database_schema(body: &str) -> Result<Vec<(String, String)>, DestinationError> {
    let database: DatabaseResponse =
        serde_json::from_str(body).map_err(|e| DestinationError::Parse(e.to_string()))?;

    Ok(database
        .properties
        .into_iter()
        .map(|(name, property)| {
            let kind = property
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("other")
                .to_owned();
            (name, kind)
        })
        .collect())
}

/// Build the create-page body.
#[doc(hidden)]
pub fn build_create_request<'a>(
    database_id: &'a str,
    payload: &'a ExternalPayload,
) -> CreatePageRequest<'a> {
    CreatePageRequest {
        parent: PageParent { database_id },
        properties: payload,
    }
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

#[async_trait]
impl SchemaSource for NotionClient {
    async fn fetch_schema(
        &self,
        destination_id: &str,
    ) -> Result<Vec<(String, String)>, DestinationError> {
        let url = self.endpoint(&format!("v1/databases/{}", destination_id.trim()))?;
        let response = self.request(reqwest::Method::GET, url).send().await?;
        let body = check_http_response(response).await?;
        let schema = parse_database_schema(&body)?;
        debug!(properties = schema.len(), "fetched destination schema");
        Ok(schema)
    }
}

#[async_trait]
impl RecordSink for NotionClient {
    async fn create_record(
        &self,
        destination_id: &str,
        payload: &ExternalPayload,
    ) -> Result<String, DestinationError> {
        let url = self.endpoint("v1/pages")?;
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&build_create_request(destination_id.trim(), payload))
            .send()
            .await?;
        let body = check_http_response(response).await?;
        let page: CreatePageResponse =
            serde_json::from_str(&body).map_err(|e| DestinationError::Parse(e.to_string()))?;
        Ok(page.id)
    }
}
