//! HTTP transport used by the submitter, poller and artifact fetch.

use crate::error::Result;
use async_trait::async_trait;

/// Header carrying the API token.
pub const API_TOKEN_HEADER: &str = "api_token";

/// A response whose body has been read as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for the status (e.g. "Not Found").
    pub reason: String,
    /// Response body.
    pub body: String,
}

impl TransportResponse {
    /// Returns true for 2xx responses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Raw bytes of a fetched artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBytes {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub data: Vec<u8>,
}

/// Transport for the remote generation service.
///
/// Transport failures are returned as errors; HTTP error statuses are
/// returned as responses so callers can extract service messages.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POSTs a JSON body with the API token header.
    async fn post_json(
        &self,
        url: &str,
        token: &str,
        body: &serde_json::Value,
    ) -> Result<TransportResponse>;

    /// GETs a URL with the API token header.
    async fn get(&self, url: &str, token: &str) -> Result<TransportResponse>;

    /// GETs binary content without credentials.
    async fn fetch_bytes(&self, url: &str) -> Result<FetchedBytes>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport around an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn read(response: reqwest::Response) -> Result<TransportResponse> {
        let status = response.status();
        let body = response.text().await?;
        Ok(TransportResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        token: &str,
        body: &serde_json::Value,
    ) -> Result<TransportResponse> {
        let response = self
            .client
            .post(url)
            .header(API_TOKEN_HEADER, token)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn get(&self, url: &str, token: &str) -> Result<TransportResponse> {
        let response = self
            .client
            .get(url)
            .header(API_TOKEN_HEADER, token)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn fetch_bytes(&self, url: &str) -> Result<FetchedBytes> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let data = response.bytes().await?.to_vec();
        Ok(FetchedBytes { status, data })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_success() {
        let ok = TransportResponse {
            status: 202,
            reason: "Accepted".into(),
            body: String::new(),
        };
        assert!(ok.is_success());

        let err = TransportResponse {
            status: 401,
            reason: "Unauthorized".into(),
            body: String::new(),
        };
        assert!(!err.is_success());
    }
}
