//! The black-box search/geocode service seam.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::SearchError;
use crate::wire::{GeocodeResponse, RawPlace, TextSearchRequest, TextSearchResponse};

/// Service that answers text searches and geocoding lookups.
///
/// Implementations wrap a transport (the HTTP proxy, an in-memory script)
/// behind a uniform async interface. They report the service's own status
/// verbatim; interpreting it is the [`PlaceSearchClient`]'s job.
///
/// [`PlaceSearchClient`]: crate::PlaceSearchClient
pub trait PlacesService: Send + Sync {
    /// Run a text search.
    fn text_search(
        &self,
        request: &TextSearchRequest,
    ) -> impl Future<Output = Result<TextSearchResponse, SearchError>> + Send;

    /// Resolve a free-form address.
    fn geocode(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<GeocodeResponse, SearchError>> + Send;
}

#[derive(Debug, Clone)]
enum MockReply {
    Reply(TextSearchResponse),
    Unavailable,
}

/// Scripted places service for testing.
///
/// Returns a fixed reply for every search and records each request so tests
/// can assert on what was (or was not) sent.
#[derive(Debug, Clone)]
pub struct MockPlacesService {
    reply: MockReply,
    geocode: GeocodeResponse,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<TextSearchRequest>>>,
}

impl MockPlacesService {
    /// A service answering `OK` with the given records.
    pub fn with_results(results: Vec<RawPlace>) -> Self {
        Self::with_reply(TextSearchResponse::ok(results))
    }

    /// A service answering `OK` with `count` generated records.
    pub fn with_generated(count: usize) -> Self {
        Self::with_results(sample_places(count))
    }

    /// A service answering `ZERO_RESULTS`.
    pub fn zero_results() -> Self {
        Self::with_reply(TextSearchResponse::zero_results())
    }

    /// A service answering with a non-success status such as `REQUEST_DENIED`.
    pub fn failing_status(status: &str) -> Self {
        Self::with_reply(TextSearchResponse {
            status: status.to_string(),
            ..TextSearchResponse::default()
        })
    }

    /// A service whose transport always fails.
    pub fn unavailable() -> Self {
        Self {
            reply: MockReply::Unavailable,
            ..Self::with_reply(TextSearchResponse::default())
        }
    }

    pub fn with_reply(reply: TextSearchResponse) -> Self {
        Self {
            reply: MockReply::Reply(reply),
            geocode: GeocodeResponse {
                status: "ZERO_RESULTS".to_string(),
                results: Vec::new(),
            },
            delay: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Wait this long before answering each search.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_geocode(mut self, reply: GeocodeResponse) -> Self {
        self.geocode = reply;
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<TextSearchRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn record(&self, request: &TextSearchRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
    }
}

impl PlacesService for MockPlacesService {
    async fn text_search(
        &self,
        request: &TextSearchRequest,
    ) -> Result<TextSearchResponse, SearchError> {
        self.record(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            MockReply::Reply(reply) => Ok(reply.clone()),
            MockReply::Unavailable => Err(SearchError::Unavailable(
                "connection refused".to_string(),
            )),
        }
    }

    async fn geocode(&self, address: &str) -> Result<GeocodeResponse, SearchError> {
        if address.trim().is_empty() {
            return Err(SearchError::Service("Address is required".to_string()));
        }
        match self.reply {
            MockReply::Unavailable => Err(SearchError::Unavailable(
                "connection refused".to_string(),
            )),
            MockReply::Reply(_) => Ok(self.geocode.clone()),
        }
    }
}

/// `count` distinct records laid out on a small grid, ids `place-0`, `place-1`, ...
pub fn sample_places(count: usize) -> Vec<RawPlace> {
    (0..count)
        .map(|i| {
            let mut raw = RawPlace::new(
                &format!("place-{}", i),
                &format!("Place {}", i),
                -6.2 + (i as f64) * 0.001,
                106.8 + (i as f64) * 0.001,
            );
            raw.formatted_address = Some(format!("{} Example Street", i + 1));
            raw.rating = Some(3.0 + (i % 3) as f64 * 0.5);
            raw
        })
        .collect()
}
