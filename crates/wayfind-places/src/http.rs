//! HTTP implementation of [`PlacesService`] against the search proxy.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::service::PlacesService;
use crate::wire::{GeocodeRequest, GeocodeResponse, TextSearchRequest, TextSearchResponse};

/// Error body returned by the proxy on non-2xx replies.
#[derive(Debug, Deserialize)]
struct ProxyErrorBody {
    error: String,
}

/// Reply of the proxy's `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyHealth {
    pub status: String,
    pub timestamp: String,
}

/// Places service reached over HTTP through the credential-hiding proxy.
#[derive(Debug, Clone)]
pub struct HttpPlacesService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPlacesService {
    /// Create a client for the proxy at `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Unavailable(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe the proxy's health endpoint.
    pub async fn health(&self) -> Result<ProxyHealth, SearchError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        decode(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, SearchError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Places request");
        let response = self.client.post(&url).json(body).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SearchError> {
    let status = response.status();
    if !status.is_success() {
        let detail = response
            .json::<ProxyErrorBody>()
            .await
            .map(|b| b.error)
            .unwrap_or_else(|_| "no error body".to_string());
        return Err(SearchError::Service(format!("HTTP {}: {}", status, detail)));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| SearchError::Service(format!("malformed reply: {}", e)))
}

impl PlacesService for HttpPlacesService {
    async fn text_search(
        &self,
        request: &TextSearchRequest,
    ) -> Result<TextSearchResponse, SearchError> {
        self.post("/api/places/search", request).await
    }

    async fn geocode(&self, address: &str) -> Result<GeocodeResponse, SearchError> {
        let body = GeocodeRequest {
            address: address.to_string(),
        };
        self.post("/api/geocode", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let service =
            HttpPlacesService::new("http://localhost:3001/", Duration::from_secs(5)).unwrap();
        assert_eq!(service.base_url(), "http://localhost:3001");
    }

    #[tokio::test]
    async fn test_unreachable_proxy_is_unavailable() {
        // Port 9 (discard) is closed on test machines; connect fails fast.
        let service =
            HttpPlacesService::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let request = TextSearchRequest {
            query: "coffee".to_string(),
            location: None,
            radius: None,
        };
        let err = service.text_search(&request).await.unwrap_err();
        assert!(err.is_unavailable(), "unexpected error: {}", err);
    }
}
