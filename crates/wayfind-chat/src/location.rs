//! Session location.
//!
//! The location is resolved once per session. A denied or failed lookup
//! resolves to "no location", and searches then run without an origin.

use std::future::Future;
use std::sync::OnceLock;

use tracing::{debug, info};

use wayfind_core::config::LocationConfig;
use wayfind_core::Coordinate;

/// Source of the user's current position.
pub trait GeolocationProvider: Send + Sync {
    /// Resolve the current position. `None` when unavailable or denied.
    fn current_position(&self) -> impl Future<Output = Option<Coordinate>> + Send;
}

/// Provider that always reports the same position (or none).
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation(pub Option<Coordinate>);

impl FixedLocation {
    pub fn at(lat: f64, lng: f64) -> Self {
        Self(Some(Coordinate::new(lat, lng)))
    }

    pub fn unavailable() -> Self {
        Self(None)
    }

    pub fn from_config(config: &LocationConfig) -> Self {
        Self(config.coordinate())
    }
}

impl GeolocationProvider for FixedLocation {
    async fn current_position(&self) -> Option<Coordinate> {
        self.0
    }
}

/// Write-once holder for the resolved session location.
#[derive(Debug, Default)]
pub struct SessionLocation {
    cell: OnceLock<Option<Coordinate>>,
}

impl SessionLocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the lookup outcome. Invalid coordinates count as unavailable.
    ///
    /// Returns `false` (and changes nothing) when already resolved.
    pub fn resolve(&self, coordinate: Option<Coordinate>) -> bool {
        let coordinate = coordinate.filter(|c| {
            let valid = c.is_valid();
            if !valid {
                debug!(%c, "Discarding out-of-range coordinate");
            }
            valid
        });
        let stored = self.cell.set(coordinate).is_ok();
        if stored {
            match coordinate {
                Some(c) => info!(location = %c, "Session location resolved"),
                None => info!("Session location unavailable"),
            }
        }
        stored
    }

    /// The resolved location, if any.
    pub fn get(&self) -> Option<Coordinate> {
        self.cell.get().copied().flatten()
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }
}
