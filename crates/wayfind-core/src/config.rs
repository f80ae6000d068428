use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, WayfindError};
use crate::types::{Coordinate, CARD_PLACE_LIMIT, MAP_PLACE_LIMIT, SEARCH_RADIUS_METERS};

/// Top-level configuration for the Wayfind application.
///
/// Loaded from `~/.wayfind/config.toml` by default. Each section corresponds
/// to one collaborator of the query pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WayfindConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub places: PlacesConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl WayfindConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WayfindConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.assistant.timeout_secs == 0 || self.places.timeout_secs == 0 {
            return Err(WayfindError::Config(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.assistant.timeout_secs <= self.places.timeout_secs {
            return Err(WayfindError::Config(format!(
                "assistant timeout ({}s) must exceed places timeout ({}s)",
                self.assistant.timeout_secs, self.places.timeout_secs
            )));
        }
        if self.places.radius_meters == 0 {
            return Err(WayfindError::Config(
                "places.radius_meters must be greater than zero".to_string(),
            ));
        }
        if self.places.card_limit > self.places.map_limit {
            return Err(WayfindError::Config(format!(
                "places.card_limit ({}) cannot exceed places.map_limit ({})",
                self.places.card_limit, self.places.map_limit
            )));
        }
        if let Some(coordinate) = self.location.coordinate() {
            if !coordinate.is_valid() {
                return Err(WayfindError::Config(format!(
                    "location {} is outside WGS84 bounds",
                    coordinate
                )));
            }
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Local language model used for intent extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Base URL of the Ollama server.
    pub base_url: String,
    /// Model name passed to `/api/generate`.
    pub model: String,
    /// Upper bound on a single model call, in seconds.
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Places search proxy and result display limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacesConfig {
    /// Base URL of the search proxy.
    pub backend_url: String,
    /// Upper bound on a single search call, in seconds.
    pub timeout_secs: u64,
    /// Radius around the session origin, in meters.
    pub radius_meters: u32,
    /// Places shown as map markers.
    pub map_limit: usize,
    /// Places shown as inline transcript cards.
    pub card_limit: usize,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3001".to_string(),
            timeout_secs: 8,
            radius_meters: SEARCH_RADIUS_METERS,
            map_limit: MAP_PLACE_LIMIT,
            card_limit: CARD_PLACE_LIMIT,
        }
    }
}

/// Map view behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Zoom level used when focusing a selected place.
    pub focus_zoom: u8,
    /// Zoom level before any search.
    pub initial_zoom: u8,
    /// Center shown before location or results are known.
    pub default_center: Coordinate,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            focus_zoom: 15,
            initial_zoom: 13,
            default_center: Coordinate::new(-6.2088, 106.8456),
        }
    }
}

/// Fixed session location for front ends without a platform geolocation API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl LocationConfig {
    /// The configured coordinate, when both components are present.
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
            _ => None,
        }
    }
}

/// Credential-hiding search proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listen port.
    pub port: u16,
    /// Requests allowed per rate-limit window on `/api/*`.
    pub rate_limit_max: u64,
    /// Rate-limit window length, in seconds.
    pub rate_limit_window_secs: u64,
    /// Upstream request timeout, in seconds.
    pub upstream_timeout_secs: u64,
    /// Google Maps API key. Read from `GOOGLE_MAPS_API_KEY`, never written
    /// back to disk.
    #[serde(skip)]
    pub google_api_key: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            rate_limit_max: 100,
            rate_limit_window_secs: 15 * 60,
            upstream_timeout_secs: 10,
            google_api_key: None,
        }
    }
}
