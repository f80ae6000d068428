use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Constants
// =============================================================================

/// Number of places surfaced as map markers.
pub const MAP_PLACE_LIMIT: usize = 10;

/// Number of places surfaced as inline cards in the transcript.
pub const CARD_PLACE_LIMIT: usize = 3;

/// Search radius applied around the session origin, in meters.
pub const SEARCH_RADIUS_METERS: u32 = 5_000;

// =============================================================================
// Geography
// =============================================================================

/// A WGS84 coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and within WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// The `"lat,lng"` form accepted by the search service.
    pub fn to_query_param(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lng)
    }
}

// =============================================================================
// Places
// =============================================================================

/// A place returned by the search service.
///
/// Places are never mutated after creation; a new search replaces the whole
/// result set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Stable identifier, unique within a result set.
    pub id: String,
    pub name: String,
    pub coordinate: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    /// Rating in `[1, 5]` when the upstream service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl Place {
    /// Address line for display, with a placeholder when unknown.
    pub fn address_or_placeholder(&self) -> &str {
        self.formatted_address
            .as_deref()
            .unwrap_or("Address not available")
    }

    /// Link that opens the place in Google Maps.
    pub fn maps_url(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("api", "1")
            .append_pair("query", &self.name)
            .append_pair("query_place_id", &self.id)
            .finish();
        format!("https://www.google.com/maps/search/?{}", query)
    }

    /// Link that opens turn-by-turn directions to the place.
    pub fn directions_url(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("api", "1")
            .append_pair("destination", &self.coordinate.to_query_param())
            .append_pair("destination_place_id", &self.id)
            .finish();
        format!("https://www.google.com/maps/dir/?{}", query)
    }
}

/// Ordered, id-unique sequence of places from one search call.
///
/// Order is the upstream relevance order. Duplicate ids keep their first
/// occurrence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    places: Vec<Place>,
}

impl ResultSet {
    pub fn new(places: Vec<Place>) -> Self {
        let mut seen = HashSet::with_capacity(places.len());
        let places = places
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .collect();
        Self { places }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Keep at most `limit` places, preserving order.
    pub fn truncated(mut self, limit: usize) -> Self {
        self.places.truncate(limit);
        self
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    /// The first `limit` places (or all of them when fewer).
    pub fn prefix(&self, limit: usize) -> &[Place] {
        &self.places[..self.places.len().min(limit)]
    }

    pub fn first(&self) -> Option<&Place> {
        self.places.first()
    }

    pub fn get(&self, id: &str) -> Option<&Place> {
        self.places.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.places.iter().position(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

impl From<Vec<Place>> for ResultSet {
    fn from(places: Vec<Place>) -> Self {
        Self::new(places)
    }
}

// =============================================================================
// Turn lifecycle
// =============================================================================

/// Phase of the conversation turn currently in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// No turn in flight; input is accepted.
    #[default]
    Idle,
    /// Waiting on the language model to extract a search intent.
    AwaitingIntent,
    /// Waiting on the places service.
    AwaitingSearch,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnState::Idle => write!(f, "Idle"),
            TurnState::AwaitingIntent => write!(f, "AwaitingIntent"),
            TurnState::AwaitingSearch => write!(f, "AwaitingSearch"),
        }
    }
}

// =============================================================================
// Transcript
// =============================================================================

/// Who a transcript entry is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::System => write!(f, "system"),
            MessageKind::User => write!(f, "user"),
            MessageKind::Assistant => write!(f, "assistant"),
        }
    }
}

/// One transcript entry.
///
/// Immutable once appended. Transient entries ("Thinking...",
/// "Searching for: ...") are removed and replaced, never edited.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub kind: MessageKind,
    pub text: String,
    /// Places rendered as inline cards under the message.
    #[serde(default)]
    pub attached_places: Vec<Place>,
    /// Status placeholder awaiting replacement.
    #[serde(default)]
    pub transient: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            text: text.into(),
            attached_places: Vec::new(),
            transient: false,
            created_at: Utc::now(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageKind::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageKind::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Assistant, text)
    }

    /// An assistant status placeholder.
    pub fn transient(text: impl Into<String>) -> Self {
        Self {
            transient: true,
            ..Self::new(MessageKind::Assistant, text)
        }
    }

    pub fn with_places(mut self, places: Vec<Place>) -> Self {
        self.attached_places = places;
        self
    }
}
