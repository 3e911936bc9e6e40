use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use super::request::{Method, OutgoingRequest, WireResponse};
use crate::config::TimeoutConfig;

/// Failures below the HTTP layer
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, DNS, TLS, timeout or body read failure
    #[error("{0}")]
    Io(String),
    /// The request could not be put on the wire at all
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("request cancelled")]
    Cancelled,
}

impl TransportError {
    /// Only I/O level failures are worth another attempt
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Performs a single HTTP exchange
#[async_trait]
pub trait Transport: std::fmt::Debug + Send + Sync {
    /// Send one request and read the full response
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if no HTTP response was received
    async fn send(&self, request: &OutgoingRequest) -> Result<WireResponse, TransportError>;
}

/// [`Transport`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with per-attempt timeouts
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_seconds))
            .timeout(Duration::from_secs(
                timeouts.read_seconds + timeouts.write_seconds,
            ))
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self { client })
    }

    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn to_header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("header {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidRequest(format!("header {name}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &OutgoingRequest) -> Result<WireResponse, TransportError> {
        let url = request.url().cloned().ok_or_else(|| {
            TransportError::InvalidRequest(format!(
                "no absolute URL for {}",
                request.target()
            ))
        })?;
        let method = match request.method() {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        };

        let mut builder = self
            .client
            .request(method, url)
            .headers(to_header_map(request.headers())?);
        if let Some(body) = request.body() {
            builder = builder.body(body.to_string());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;

        Ok(WireResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_io_errors_are_retryable() {
        assert!(TransportError::Io("connection refused".into()).is_retryable());
        assert!(!TransportError::InvalidRequest("bad header".into()).is_retryable());
        assert!(!TransportError::Cancelled.is_retryable());
    }

    #[test]
    fn test_header_map_rejects_invalid_values() {
        let mut headers = BTreeMap::new();
        headers.insert("authorization".to_string(), "Bearer a\nb".to_string());
        assert!(matches!(
            to_header_map(&headers),
            Err(TransportError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_relative_request_is_rejected() {
        let transport = ReqwestTransport::new(&TimeoutConfig::default()).unwrap();
        let result = transport.send(&OutgoingRequest::get("health")).await;
        assert!(matches!(result, Err(TransportError::InvalidRequest(_))));
    }
}
