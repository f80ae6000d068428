//! Route handler functions for all proxy endpoints.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use wayfind_core::SEARCH_RADIUS_METERS;
use wayfind_places::SearchStatus;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

/// Body of `POST /api/places/search`. Every field is optional at the wire
/// level so a missing query gets a 400 with a useful body.
#[derive(Debug, Default, Deserialize)]
pub struct SearchBody {
    pub query: Option<String>,
    pub location: Option<String>,
    pub radius: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GeocodeBody {
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MapsConfigResponse {
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
}

fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/places/search - text search, passed through verbatim.
pub async fn search_places(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<Value>, ApiError> {
    let query = required(body.query, "Query is required")?;
    let location = body.location.filter(|l| !l.trim().is_empty());
    let radius = location
        .as_ref()
        .map(|_| body.radius.unwrap_or(SEARCH_RADIUS_METERS));

    let reply = state
        .upstream
        .text_search(&query, location.as_deref(), radius)
        .await
        .map_err(|e| ApiError::Upstream {
            summary: "Failed to search places",
            detail: e.to_string(),
        })?;

    let status = reply
        .get("status")
        .and_then(Value::as_str)
        .map(SearchStatus::parse)
        .unwrap_or_else(|| SearchStatus::Other("missing status".to_string()));
    if let SearchStatus::Other(status) = status {
        return Err(ApiError::Upstream {
            summary: "Failed to search places",
            detail: format!("Google Maps API error: {}", status),
        });
    }

    let count = reply
        .get("results")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    info!(query = %query, located = location.is_some(), count, "Places search");
    Ok(Json(reply))
}

/// POST /api/geocode - forward geocoding, passed through verbatim.
pub async fn geocode(
    State(state): State<AppState>,
    Json(body): Json<GeocodeBody>,
) -> Result<Json<Value>, ApiError> {
    let address = required(body.address, "Address is required")?;
    let reply = state
        .upstream
        .geocode(&address)
        .await
        .map_err(|e| ApiError::Upstream {
            summary: "Failed to geocode address",
            detail: e.to_string(),
        })?;
    debug!(address = %address, "Geocode");
    Ok(Json(reply))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /api/maps-config - key for the browser map widget.
pub async fn maps_config(State(state): State<AppState>) -> Json<MapsConfigResponse> {
    Json(MapsConfigResponse {
        api_key: state.config.google_api_key.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims_and_rejects_blank() {
        assert_eq!(required(Some(" sushi ".into()), "x").unwrap(), "sushi");
        assert!(matches!(
            required(Some("  ".into()), "Query is required"),
            Err(ApiError::BadRequest(m)) if m == "Query is required"
        ));
        assert!(required(None, "x").is_err());
    }

    #[test]
    fn test_maps_config_field_name() {
        let json = serde_json::to_string(&MapsConfigResponse {
            api_key: Some("k".into()),
        })
        .unwrap();
        assert_eq!(json, r#"{"apiKey":"k"}"#);
    }
}
