// src/fetch/http.rs
//! Mapping HTTP failures onto [`FetchError`].
//!
//! Fetch operations built on `reqwest` use [`HttpFetcher`] or the classify
//! functions so the orchestrator's default retry predicate sees consistent
//! transient/permanent tags.

use super::error::FetchError;
use reqwest::{header, Client, Response, StatusCode};

/// Classifies a non-success status code.
///
/// 404 and 410 mean the resource is gone. 429 is rate limiting. 408 and 5xx
/// are worth retrying. Every other 4xx is permanent.
pub fn classify_status(status: StatusCode, url: &str) -> FetchError {
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => FetchError::not_found(url),
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited {
            retry_after_seconds: None,
        },
        StatusCode::REQUEST_TIMEOUT => FetchError::Timeout {
            operation: format!("GET {}", url),
        },
        s if s.is_server_error() => FetchError::transient(format!("HTTP {} from {}", s, url)),
        s => FetchError::permanent(format!("HTTP {} from {}", s, url)),
    }
}

/// Classifies a transport-level `reqwest` error.
pub fn classify_reqwest_error(error: &reqwest::Error) -> FetchError {
    if let Some(status) = error.status() {
        let url = error.url().map(|u| u.as_str()).unwrap_or("<unknown>");
        return classify_status(status, url);
    }
    if error.is_timeout() {
        return FetchError::Timeout {
            operation: error
                .url()
                .map(|u| format!("GET {}", u))
                .unwrap_or_else(|| "request".to_string()),
        };
    }
    if error.is_connect() || error.is_request() || error.is_body() {
        return FetchError::transient(error.to_string());
    }
    // Builder and decode errors will not change on retry.
    FetchError::permanent(error.to_string())
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        classify_reqwest_error(&error)
    }
}

/// Reads a `Retry-After` header given in seconds.
fn retry_after_seconds(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// GET helper over a caller-owned `reqwest::Client`.
///
/// The client and its connection pool are injected, so
/// one session can be shared across tasks and runs without a global.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetches `url` and returns its body, classifying any failure.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        log::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let error = match classify_status(status, url) {
                FetchError::RateLimited { .. } => FetchError::RateLimited {
                    retry_after_seconds: retry_after_seconds(&response),
                },
                other => other,
            };
            log::debug!("GET {} failed: {}", url, error);
            return Err(error);
        }

        Ok(response.text().await?)
    }
}
