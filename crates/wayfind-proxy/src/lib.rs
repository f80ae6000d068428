//! Wayfind proxy crate - credential-hiding HTTP front for the places API.
//!
//! Exposes place search, geocoding, a health check and the browser map
//! configuration. The Google Maps key stays on the server; clients only
//! ever talk to these routes.

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod upstream;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
pub use upstream::{GoogleMapsClient, MockUpstream, PlacesUpstream, UpstreamError};
