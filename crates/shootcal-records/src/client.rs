//! HTTP client for the availability records API.
//!
//! Wraps `reqwest` with records-specific error handling. Every response is
//! checked for a non-2xx status first (surfacing the body's `msg` when
//! present) and then for a non-zero envelope `code`.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::RecordsError;
use crate::types::{RawRecord, RecordsEnvelope, RecordsQuery};

/// Records requested per call.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Client for the records API.
///
/// Holds one pooled `reqwest::Client` and the endpoint every page request is
/// POSTed to. Point `endpoint` at a mock server in tests.
pub struct RecordsClient {
    client: Client,
    endpoint: Url,
}

impl RecordsClient {
    /// Creates a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`RecordsError::InvalidEndpoint`] if
    /// `endpoint` is not an absolute http(s) URL.
    pub fn new(endpoint: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, RecordsError> {
        let endpoint_url = Url::parse(endpoint.trim())
            .map_err(|_| RecordsError::InvalidEndpoint(endpoint.to_string()))?;
        if !matches!(endpoint_url.scheme(), "http" | "https") {
            return Err(RecordsError::InvalidEndpoint(endpoint.to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint_url,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetches up to `page_size` raw records dated on or after `from_date_ms`.
    ///
    /// An envelope without `data.items` is an empty page, not an error.
    ///
    /// # Errors
    ///
    /// - [`RecordsError::Http`] on network failure.
    /// - [`RecordsError::Status`] on a non-2xx HTTP status.
    /// - [`RecordsError::Application`] if the envelope `code` is non-zero.
    /// - [`RecordsError::MissingCode`] if the envelope has no `code`.
    /// - [`RecordsError::Deserialize`] if a 2xx body is not a valid envelope.
    pub async fn fetch_page(
        &self,
        from_date_ms: i64,
        page_size: u32,
    ) -> Result<Vec<RawRecord>, RecordsError> {
        let query = RecordsQuery {
            from_date: from_date_ms,
            page_size,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&query)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RecordsError::Status {
                status: status.as_u16(),
                message: status_message(status.as_u16(), &body),
            });
        }

        let envelope: RecordsEnvelope =
            serde_json::from_str(&body).map_err(|e| RecordsError::Deserialize {
                context: format!("records page from {from_date_ms}"),
                source: e,
            })?;
        Self::check_envelope(&envelope)?;

        let items = envelope.data.and_then(|d| d.items).unwrap_or_default();
        tracing::debug!(from_date_ms, page_size, count = items.len(), "fetched records page");
        Ok(items)
    }

    /// Returns an error unless the envelope `code` is present and zero.
    fn check_envelope(envelope: &RecordsEnvelope) -> Result<(), RecordsError> {
        let message = || {
            envelope
                .msg
                .clone()
                .filter(|m| !m.trim().is_empty())
        };
        match envelope.code {
            Some(0) => Ok(()),
            Some(code) => Err(RecordsError::Application {
                code,
                message: message().unwrap_or_else(|| "unknown error".to_string()),
            }),
            None => Err(RecordsError::MissingCode {
                message: message()
                    .unwrap_or_else(|| "response envelope has no status code".to_string()),
            }),
        }
    }
}

/// The body's `msg` field if it is a non-empty string, else a generic message.
fn status_message(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("msg")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
        })
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("request failed with HTTP status {status}"))
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
