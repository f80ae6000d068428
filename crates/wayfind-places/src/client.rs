//! Place search client: structured query in, display-capped result set out.

use std::time::Duration;

use tracing::{debug, info, warn};

use wayfind_core::config::PlacesConfig;
use wayfind_core::{Coordinate, Place, ResultSet};

use crate::error::SearchError;
use crate::service::PlacesService;
use crate::wire::{SearchStatus, TextSearchRequest};

/// Runs searches against a [`PlacesService`] and interprets the replies.
///
/// - With an origin, the search is constrained to `radius_meters` around it.
/// - `ZERO_RESULTS` is an empty result set, not an error.
/// - Any other non-OK status is [`SearchError::Service`].
/// - Replies are deduplicated by id and truncated to `limit` places.
/// - A call that outlives `timeout` is [`SearchError::Unavailable`].
pub struct PlaceSearchClient<S> {
    service: S,
    radius_meters: u32,
    limit: usize,
    timeout: Duration,
}

impl<S: PlacesService> PlaceSearchClient<S> {
    pub fn new(service: S, radius_meters: u32, limit: usize, timeout: Duration) -> Self {
        Self {
            service,
            radius_meters,
            limit,
            timeout,
        }
    }

    pub fn from_config(service: S, config: &PlacesConfig) -> Self {
        Self::new(
            service,
            config.radius_meters,
            config.map_limit,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Search for `query`, optionally around `origin`.
    pub async fn search(
        &self,
        query: &str,
        origin: Option<Coordinate>,
    ) -> Result<ResultSet, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let request = TextSearchRequest {
            query: query.to_string(),
            location: origin.map(|c| c.to_query_param()),
            radius: origin.map(|_| self.radius_meters),
        };

        let reply = tokio::time::timeout(self.timeout, self.service.text_search(&request))
            .await
            .map_err(|_| {
                SearchError::Unavailable(format!(
                    "no reply within {}s",
                    self.timeout.as_secs_f32()
                ))
            })??;

        match reply.status() {
            SearchStatus::Ok => {}
            SearchStatus::ZeroResults => {
                info!(query = %query, "Search returned zero results");
                return Ok(ResultSet::empty());
            }
            SearchStatus::Other(status) => {
                let detail = match reply.error_message {
                    Some(msg) => format!("{}: {}", status, msg),
                    None => status,
                };
                warn!(query = %query, status = %detail, "Search service rejected query");
                return Err(SearchError::Service(detail));
            }
        }

        let received = reply.results.len();
        let places: Vec<Place> = reply
            .results
            .into_iter()
            .filter_map(|raw| raw.into_place())
            .collect();
        if places.len() < received {
            debug!(
                dropped = received - places.len(),
                "Skipped records without id or coordinate"
            );
        }

        let results = ResultSet::new(places).truncated(self.limit);
        info!(query = %query, received, kept = results.len(), "Search complete");
        Ok(results)
    }

    /// Resolve `address` to a coordinate. `None` when nothing matched.
    pub async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, SearchError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let reply = tokio::time::timeout(self.timeout, self.service.geocode(address))
            .await
            .map_err(|_| SearchError::Unavailable("geocode timed out".to_string()))??;
        match reply.status() {
            SearchStatus::Ok => Ok(reply.first_coordinate()),
            SearchStatus::ZeroResults => Ok(None),
            SearchStatus::Other(status) => Err(SearchError::Service(status)),
        }
    }
}
