//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use wayfind_core::config::ProxyConfig;

use crate::upstream::{GoogleMapsClient, PlacesUpstream, UpstreamError};

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub upstream: Arc<dyn PlacesUpstream>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: ProxyConfig, upstream: Arc<dyn PlacesUpstream>) -> Self {
        Self {
            config: Arc::new(config),
            upstream,
            start_time: Instant::now(),
        }
    }

    /// State backed by the Google Maps web services.
    pub fn google(config: ProxyConfig) -> Result<Self, UpstreamError> {
        let client = GoogleMapsClient::new(
            config.google_api_key.clone(),
            Duration::from_secs(config.upstream_timeout_secs),
        )?;
        if !client.has_key() {
            tracing::warn!("GOOGLE_MAPS_API_KEY is not set; place searches will fail");
        }
        Ok(Self::new(config, Arc::new(client)))
    }
}
