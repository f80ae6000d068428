//! Wire types shared by the search proxy and its clients.
//!
//! Records follow the Google Places text-search shape, which the proxy
//! passes through verbatim. Fields the pipeline does not strictly need are
//! optional so that one malformed record never poisons a whole reply.

use serde::{Deserialize, Serialize};

use wayfind_core::{Coordinate, Place};

/// Body of `POST /api/places/search`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextSearchRequest {
    pub query: String,
    /// Origin as `"lat,lng"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Radius in meters around `location`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<u32>,
}

/// Upstream status string, classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchStatus {
    Ok,
    ZeroResults,
    Other(String),
}

impl SearchStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "OK" => SearchStatus::Ok,
            "ZERO_RESULTS" => SearchStatus::ZeroResults,
            other => SearchStatus::Other(other.to_string()),
        }
    }

    /// OK and ZERO_RESULTS are both successful replies.
    pub fn is_success(&self) -> bool {
        !matches!(self, SearchStatus::Other(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

/// One place record as returned by the search service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vicinity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl RawPlace {
    /// Convenience constructor used by mocks and tests.
    pub fn new(place_id: &str, name: &str, lat: f64, lng: f64) -> Self {
        Self {
            place_id: Some(place_id.to_string()),
            name: name.to_string(),
            geometry: Some(Geometry {
                location: LatLng { lat, lng },
            }),
            ..Self::default()
        }
    }

    /// Convert into a [`Place`].
    ///
    /// Returns `None` when the record has no id or no coordinate. The
    /// address falls back to `vicinity`; ratings outside `[1, 5]` are dropped.
    pub fn into_place(self) -> Option<Place> {
        let id = self.place_id.filter(|id| !id.is_empty())?;
        let location = self.geometry?.location;
        let coordinate = Coordinate::new(location.lat, location.lng);
        if !coordinate.is_valid() {
            return None;
        }
        Some(Place {
            id,
            name: self.name,
            coordinate,
            formatted_address: self
                .formatted_address
                .filter(|a| !a.is_empty())
                .or(self.vicinity.filter(|v| !v.is_empty())),
            rating: self.rating.filter(|r| (1.0..=5.0).contains(r)),
        })
    }
}

/// Reply of `POST /api/places/search`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextSearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<RawPlace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TextSearchResponse {
    pub fn ok(results: Vec<RawPlace>) -> Self {
        Self {
            status: "OK".to_string(),
            results,
            error_message: None,
        }
    }

    pub fn zero_results() -> Self {
        Self {
            status: "ZERO_RESULTS".to_string(),
            ..Self::default()
        }
    }

    pub fn status(&self) -> SearchStatus {
        SearchStatus::parse(&self.status)
    }
}

/// Body of `POST /api/geocode`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeocodeRequest {
    pub address: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub formatted_address: String,
    pub geometry: Geometry,
}

/// Reply of `POST /api/geocode`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

impl GeocodeResponse {
    pub fn status(&self) -> SearchStatus {
        SearchStatus::parse(&self.status)
    }

    /// Coordinate of the best match, if any.
    pub fn first_coordinate(&self) -> Option<Coordinate> {
        self.results.first().map(|r| {
            Coordinate::new(r.geometry.location.lat, r.geometry.location.lng)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(SearchStatus::parse("OK"), SearchStatus::Ok);
        assert_eq!(SearchStatus::parse("ZERO_RESULTS"), SearchStatus::ZeroResults);
        assert!(SearchStatus::parse("ZERO_RESULTS").is_success());
        assert!(!SearchStatus::parse("REQUEST_DENIED").is_success());
    }

    #[test]
    fn test_decode_google_shaped_reply() {
        let json = r#"{
            "status": "OK",
            "results": [
                {
                    "place_id": "ChIJ1",
                    "name": "Sushi Tei",
                    "geometry": { "location": { "lat": -6.2, "lng": 106.8 }, "viewport": {} },
                    "vicinity": "Jl. Sudirman",
                    "rating": 4.5,
                    "types": ["restaurant"]
                }
            ],
            "html_attributions": []
        }"#;
        let reply: TextSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(reply.status(), SearchStatus::Ok);
        let place = reply.results[0].clone().into_place().unwrap();
        assert_eq!(place.id, "ChIJ1");
        assert_eq!(place.formatted_address.as_deref(), Some("Jl. Sudirman"));
        assert_eq!(place.rating, Some(4.5));
    }

    #[test]
    fn test_into_place_rejects_incomplete_records() {
        let mut raw = RawPlace::new("a", "A", 1.0, 1.0);
        raw.geometry = None;
        assert!(raw.into_place().is_none());

        let raw = RawPlace::new("", "A", 1.0, 1.0);
        assert!(raw.into_place().is_none());

        let raw = RawPlace::new("a", "A", 200.0, 1.0);
        assert!(raw.into_place().is_none());
    }

    #[test]
    fn test_into_place_drops_out_of_range_rating() {
        let mut raw = RawPlace::new("a", "A", 1.0, 1.0);
        raw.rating = Some(0.0);
        assert_eq!(raw.into_place().unwrap().rating, None);
    }

    #[test]
    fn test_formatted_address_preferred_over_vicinity() {
        let mut raw = RawPlace::new("a", "A", 1.0, 1.0);
        raw.formatted_address = Some("Full address".to_string());
        raw.vicinity = Some("Nearby".to_string());
        assert_eq!(
            raw.into_place().unwrap().formatted_address.as_deref(),
            Some("Full address")
        );
    }

    #[test]
    fn test_request_omits_absent_origin() {
        let req = TextSearchRequest {
            query: "coffee".to_string(),
            location: None,
            radius: None,
        };
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"query":"coffee"}"#);
    }

    #[test]
    fn test_geocode_first_coordinate() {
        let json = r#"{"status":"OK","results":[{"formatted_address":"Paris","geometry":{"location":{"lat":48.85,"lng":2.35}}}]}"#;
        let reply: GeocodeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(reply.first_coordinate(), Some(Coordinate::new(48.85, 2.35)));
        assert!(GeocodeResponse::default().first_coordinate().is_none());
    }
}
