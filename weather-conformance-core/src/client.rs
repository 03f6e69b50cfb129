use std::time::Duration;

use reqwest::{StatusCode, Url, header::CONTENT_TYPE};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::de::DeserializeOwned;

use crate::error::{HarnessError, Result};
use crate::model::from_json_case_insensitive;

pub mod credentials;

pub use credentials::{API_KEY_PARAM, ApiKeyMiddleware, inject_api_key, redact_api_key};

/// Builds clients bound to a base URL with a credential injected on every request.
#[derive(Debug, Clone, Default)]
pub struct ClientFactory {
    timeout: Option<Duration>,
}

impl ClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-request timeout; without one the transport default applies.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Construct a client keyed with `api_key`. Each call yields an
    /// independent client, so keys never leak between them.
    pub fn create(&self, api_key: &str, base_url: &Url) -> Result<WeatherClient> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| HarnessError::Client(e.to_string()))?;

        let http = ClientBuilder::new(http)
            .with(ApiKeyMiddleware::new(api_key))
            .build();

        Ok(WeatherClient {
            http,
            base_url: normalize_base_url(base_url),
        })
    }
}

/// HTTP client for the API under test.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: ClientWithMiddleware,
    base_url: Url,
}

impl WeatherClient {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GET a path relative to the base URL, e.g. `weather?id=2643743`.
    pub async fn get(&self, path_and_query: &str) -> Result<ApiResponse> {
        let url = self.base_url.join(path_and_query).map_err(|e| {
            HarnessError::TransportFailure(format!("Invalid request path '{path_and_query}': {e}"))
        })?;

        // logged before the key is attached
        tracing::debug!(%url, "Sending request");

        let res = self.http.get(url).send().await.map_err(transport_failure)?;

        let status = res.status();
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(media_type);
        let body = res.text().await.map_err(|e| {
            HarnessError::TransportFailure(format!(
                "Failed to read response body: {}",
                e.without_url()
            ))
        })?;

        tracing::debug!(
            status = status.as_u16(),
            content_type = ?content_type,
            "Received response"
        );

        Ok(ApiResponse {
            status,
            content_type,
            body,
        })
    }
}

/// The request URL already carries the key, so it never reaches the message.
fn transport_failure(err: reqwest_middleware::Error) -> HarnessError {
    let message = match err {
        reqwest_middleware::Error::Reqwest(e) => e.without_url().to_string(),
        other => redact_api_key(&other.to_string()),
    };
    HarnessError::TransportFailure(message)
}

/// Status, media type and raw body of one response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// Media type without parameters, lowercased (`application/json`).
    pub content_type: Option<String>,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self, expected: &'static str) -> Result<T> {
        from_json_case_insensitive(&self.body).map_err(|e| HarnessError::SchemaMismatch {
            expected,
            reason: format!("{e} in body {}", truncate_body(&self.body)),
        })
    }
}

fn media_type(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Without a trailing slash `Url::join` would replace the last path segment.
fn normalize_base_url(base_url: &Url) -> Url {
    let mut url = base_url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
