//! Wayfind places crate - place search client and the search service seam.
//!
//! Provides the [`PlacesService`] trait for the black-box search/geocode
//! service, an [`HttpPlacesService`] that talks to the credential-hiding
//! proxy, a [`MockPlacesService`] for testing, and the [`PlaceSearchClient`]
//! that turns raw service replies into a display-capped [`ResultSet`].
//!
//! [`ResultSet`]: wayfind_core::ResultSet

pub mod client;
pub mod error;
pub mod http;
pub mod service;
pub mod wire;

pub use client::PlaceSearchClient;
pub use error::SearchError;
pub use http::HttpPlacesService;
pub use service::{sample_places, MockPlacesService, PlacesService};
pub use wire::{GeocodeResponse, RawPlace, SearchStatus, TextSearchRequest, TextSearchResponse};
