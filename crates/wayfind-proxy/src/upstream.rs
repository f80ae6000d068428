//! Upstream places API.
//!
//! Replies are kept as raw JSON so the proxy can pass them through
//! verbatim; only the `status` field is inspected.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

const GOOGLE_MAPS_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("GOOGLE_MAPS_API_KEY is not set")]
    MissingKey,
    #[error("upstream unreachable: {0}")]
    Unreachable(String),
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    #[error("malformed upstream reply: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Unreachable(err.to_string())
        }
    }
}

/// The places API behind the proxy.
#[async_trait]
pub trait PlacesUpstream: Send + Sync {
    /// Free-text place search, optionally constrained to `radius` meters
    /// around `location` (`"lat,lng"`).
    async fn text_search(
        &self,
        query: &str,
        location: Option<&str>,
        radius: Option<u32>,
    ) -> Result<Value, UpstreamError>;

    /// Forward geocoding of a free-form address.
    async fn geocode(&self, address: &str) -> Result<Value, UpstreamError>;
}

/// Google Maps web service client.
#[derive(Debug, Clone)]
pub struct GoogleMapsClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl GoogleMapsClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Unreachable(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            base_url: GOOGLE_MAPS_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    /// Point the client at another host (tests, regional endpoints).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get_json(&self, path: &str, params: Vec<(&str, String)>) -> Result<Value, UpstreamError> {
        let key = self.api_key.as_deref().ok_or(UpstreamError::MissingKey)?;
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(&params)
            .query(&[("key", key)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PlacesUpstream for GoogleMapsClient {
    async fn text_search(
        &self,
        query: &str,
        location: Option<&str>,
        radius: Option<u32>,
    ) -> Result<Value, UpstreamError> {
        let mut params = vec![("query", query.to_string())];
        if let Some(location) = location {
            params.push(("location", location.to_string()));
            if let Some(radius) = radius {
                params.push(("radius", radius.to_string()));
            }
        }
        self.get_json("/place/textsearch/json", params).await
    }

    async fn geocode(&self, address: &str) -> Result<Value, UpstreamError> {
        self.get_json("/geocode/json", vec![("address", address.to_string())])
            .await
    }
}

// =============================================================================
// Mock
// =============================================================================

/// A recorded upstream call.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamCall {
    TextSearch {
        query: String,
        location: Option<String>,
        radius: Option<u32>,
    },
    Geocode {
        address: String,
    },
}

/// Canned upstream for testing.
#[derive(Debug, Clone)]
pub struct MockUpstream {
    search_reply: Value,
    geocode_reply: Value,
    unreachable: bool,
    calls: Arc<Mutex<Vec<UpstreamCall>>>,
}

impl Default for MockUpstream {
    fn default() -> Self {
        Self::with_search_reply(json!({ "status": "ZERO_RESULTS", "results": [] }))
    }
}

impl MockUpstream {
    pub fn with_search_reply(reply: Value) -> Self {
        Self {
            search_reply: reply,
            geocode_reply: json!({ "status": "ZERO_RESULTS", "results": [] }),
            unreachable: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// An upstream whose every call fails at the transport level.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn with_geocode_reply(mut self, reply: Value) -> Self {
        self.geocode_reply = reply;
        self
    }

    pub fn calls(&self) -> Vec<UpstreamCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn answer(&self, call: UpstreamCall, reply: &Value) -> Result<Value, UpstreamError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if self.unreachable {
            return Err(UpstreamError::Unreachable("connection refused".to_string()));
        }
        Ok(reply.clone())
    }
}

#[async_trait]
impl PlacesUpstream for MockUpstream {
    async fn text_search(
        &self,
        query: &str,
        location: Option<&str>,
        radius: Option<u32>,
    ) -> Result<Value, UpstreamError> {
        let call = UpstreamCall::TextSearch {
            query: query.to_string(),
            location: location.map(str::to_string),
            radius,
        };
        self.answer(call, &self.search_reply)
    }

    async fn geocode(&self, address: &str) -> Result<Value, UpstreamError> {
        let call = UpstreamCall::Geocode {
            address: address.to_string(),
        };
        self.answer(call, &self.geocode_reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_google_client_without_key_fails_fast() {
        let client = GoogleMapsClient::new(None, Duration::from_secs(1)).unwrap();
        assert!(!client.has_key());
        let err = client.text_search("pizza", None, None).await.unwrap_err();
        assert!(matches!(err, UpstreamError::MissingKey));
    }

    #[test]
    fn test_empty_key_counts_as_missing() {
        let client = GoogleMapsClient::new(Some(String::new()), Duration::from_secs(1)).unwrap();
        assert!(!client.has_key());
    }

    #[tokio::test]
    async fn test_google_client_unreachable_host() {
        let client = GoogleMapsClient::new(Some("k".into()), Duration::from_secs(2))
            .unwrap()
            .with_base_url("http://127.0.0.1:9/");
        let err = client.geocode("Jakarta").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_mock_records_calls() {
        let upstream = MockUpstream::default();
        upstream
            .text_search("gyms", Some("1,2"), Some(5000))
            .await
            .unwrap();
        upstream.geocode("Bandung").await.unwrap();
        assert_eq!(
            upstream.calls(),
            vec![
                UpstreamCall::TextSearch {
                    query: "gyms".into(),
                    location: Some("1,2".into()),
                    radius: Some(5000),
                },
                UpstreamCall::Geocode {
                    address: "Bandung".into()
                },
            ]
        );
    }
}
