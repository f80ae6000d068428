//! Selection sync between the result list, transcript cards and map markers.
//!
//! Selection is a single optional place id. Cards and markers never hold
//! highlight state of their own; both read it from here, so exactly one of
//! them is lit at a time and selecting a new place implicitly clears the old
//! one.

use std::sync::{Arc, Mutex};

use tracing::debug;

use wayfind_core::{Coordinate, EventBus, Place, ResultSet, SessionEvent};

/// A map marker. Labels are 1-based positions in the result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub place_id: String,
    pub coordinate: Coordinate,
    pub label: String,
    pub title: String,
}

impl Marker {
    fn for_place(index: usize, place: &Place) -> Self {
        Self {
            place_id: place.id.clone(),
            coordinate: place.coordinate,
            label: (index + 1).to_string(),
            title: place.name.clone(),
        }
    }
}

/// Map rendering capability.
///
/// Marker clicks are reported back by the front end through
/// [`Conversation::select`](crate::Conversation::select) using the
/// marker's `place_id`.
pub trait MapWidget: Send {
    /// Replace all markers. An empty slice clears the map.
    fn show_markers(&mut self, markers: &[Marker]);

    /// Re-center on `center` at `zoom`.
    fn focus(&mut self, center: Coordinate, zoom: u8);

    /// Mark one marker as active (or none).
    fn highlight(&mut self, place_id: Option<&str>);
}

/// Owns the current result set and selection, and drives the map.
pub struct SelectionSync<W> {
    map: W,
    results: ResultSet,
    selected: Option<String>,
    focus_zoom: u8,
    events: EventBus,
}

impl<W: MapWidget> SelectionSync<W> {
    pub fn new(map: W, focus_zoom: u8, events: EventBus) -> Self {
        Self {
            map,
            results: ResultSet::empty(),
            selected: None,
            focus_zoom,
            events,
        }
    }

    /// Replace the result set. Selects the first place, or clears the
    /// selection when `results` is empty.
    pub fn publish_results(&mut self, results: ResultSet) {
        self.results = results;
        let markers = self.markers();
        self.map.show_markers(&markers);
        self.events.publish(SessionEvent::ResultsPublished {
            count: markers.len(),
        });

        match self.results.first().map(|p| (p.id.clone(), p.coordinate)) {
            Some((id, coordinate)) => self.apply_selection(id, coordinate),
            None => {
                self.selected = None;
                self.map.highlight(None);
                self.events
                    .publish(SessionEvent::SelectionChanged { place_id: None });
            }
        }
    }

    /// Select `place_id`. Returns `false` (and does nothing) when the id is
    /// not in the current result set or is already selected.
    pub fn select(&mut self, place_id: &str) -> bool {
        if self.selected.as_deref() == Some(place_id) {
            return false;
        }
        let Some(coordinate) = self.results.get(place_id).map(|p| p.coordinate) else {
            debug!(place_id, "Ignoring selection outside current results");
            return false;
        };
        self.apply_selection(place_id.to_string(), coordinate);
        true
    }

    fn apply_selection(&mut self, place_id: String, coordinate: Coordinate) {
        self.map.focus(coordinate, self.focus_zoom);
        self.map.highlight(Some(&place_id));
        debug!(place_id = %place_id, "Selection changed");
        self.selected = Some(place_id.clone());
        self.events.publish(SessionEvent::SelectionChanged {
            place_id: Some(place_id),
        });
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_place(&self) -> Option<&Place> {
        self.selected.as_deref().and_then(|id| self.results.get(id))
    }

    /// Whether the card or marker for `place_id` should be drawn highlighted.
    pub fn is_highlighted(&self, place_id: &str) -> bool {
        self.selected.as_deref() == Some(place_id)
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.results
            .places()
            .iter()
            .enumerate()
            .map(|(i, p)| Marker::for_place(i, p))
            .collect()
    }

    pub fn map(&self) -> &W {
        &self.map
    }
}

// =============================================================================
// Recording map
// =============================================================================

/// A command issued to a [`MapWidget`].
#[derive(Debug, Clone, PartialEq)]
pub enum MapCommand {
    ShowMarkers(Vec<Marker>),
    Focus { center: Coordinate, zoom: u8 },
    Highlight(Option<String>),
}

/// Map widget that records every command, for tests and headless runs.
///
/// Clones share one command log.
#[derive(Debug, Clone, Default)]
pub struct RecordingMap {
    commands: Arc<Mutex<Vec<MapCommand>>>,
}

impl RecordingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<MapCommand> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Markers currently shown (from the latest `ShowMarkers`).
    pub fn markers(&self) -> Vec<Marker> {
        self.commands()
            .into_iter()
            .rev()
            .find_map(|c| match c {
                MapCommand::ShowMarkers(m) => Some(m),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn focus_count(&self) -> usize {
        self.commands()
            .iter()
            .filter(|c| matches!(c, MapCommand::Focus { .. }))
            .count()
    }

    pub fn last_focus(&self) -> Option<(Coordinate, u8)> {
        self.commands().into_iter().rev().find_map(|c| match c {
            MapCommand::Focus { center, zoom } => Some((center, zoom)),
            _ => None,
        })
    }

    /// The marker currently drawn as active.
    pub fn active_marker(&self) -> Option<String> {
        self.commands()
            .into_iter()
            .rev()
            .find_map(|c| match c {
                MapCommand::Highlight(id) => Some(id),
                _ => None,
            })
            .flatten()
    }

    fn push(&self, command: MapCommand) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command);
        }
    }
}

impl MapWidget for RecordingMap {
    fn show_markers(&mut self, markers: &[Marker]) {
        self.push(MapCommand::ShowMarkers(markers.to_vec()));
    }

    fn focus(&mut self, center: Coordinate, zoom: u8) {
        self.push(MapCommand::Focus { center, zoom });
    }

    fn highlight(&mut self, place_id: Option<&str>) {
        self.push(MapCommand::Highlight(place_id.map(str::to_string)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(id: &str, lat: f64) -> Place {
        Place {
            id: id.to_string(),
            name: id.to_uppercase(),
            coordinate: Coordinate::new(lat, 100.0),
            formatted_address: None,
            rating: None,
        }
    }

    fn sync() -> (SelectionSync<RecordingMap>, RecordingMap) {
        let map = RecordingMap::new();
        (SelectionSync::new(map.clone(), 15, EventBus::new()), map)
    }

    fn three() -> ResultSet {
        ResultSet::new(vec![place("a", 1.0), place("b", 2.0), place("c", 3.0)])
    }

    #[test]
    fn test_publish_selects_first_and_focuses() {
        let (mut s, map) = sync();
        s.publish_results(three());
        assert_eq!(s.selected(), Some("a"));
        assert_eq!(map.markers().len(), 3);
        assert_eq!(map.markers()[1].label, "2");
        assert_eq!(map.last_focus(), Some((Coordinate::new(1.0, 100.0), 15)));
        assert_eq!(map.active_marker().as_deref(), Some("a"));
    }

    #[test]
    fn test_publish_empty_clears() {
        let (mut s, map) = sync();
        s.publish_results(three());
        s.publish_results(ResultSet::empty());
        assert_eq!(s.selected(), None);
        assert!(map.markers().is_empty());
        assert_eq!(map.active_marker(), None);
        assert_eq!(map.focus_count(), 1);
    }

    #[test]
    fn test_select_moves_single_highlight() {
        let (mut s, map) = sync();
        s.publish_results(three());
        assert!(s.select("b"));
        assert!(s.is_highlighted("b"));
        assert!(!s.is_highlighted("a"));
        assert_eq!(map.active_marker().as_deref(), Some("b"));
        assert_eq!(map.last_focus().unwrap().0, Coordinate::new(2.0, 100.0));
        assert_eq!(s.selected_place().unwrap().name, "B");
    }

    #[test]
    fn test_select_same_id_is_idempotent() {
        let (mut s, map) = sync();
        s.publish_results(three());
        assert!(s.select("c"));
        let commands_before = map.commands().len();
        assert!(!s.select("c"));
        assert_eq!(map.commands().len(), commands_before);
        assert_eq!(map.focus_count(), 2);
    }

    #[test]
    fn test_select_unknown_id_is_noop() {
        let (mut s, map) = sync();
        s.publish_results(three());
        let before = map.commands().len();
        assert!(!s.select("zzz"));
        assert_eq!(s.selected(), Some("a"));
        assert_eq!(map.commands().len(), before);
    }

    #[test]
    fn test_select_before_any_results_is_noop() {
        let (mut s, map) = sync();
        assert!(!s.select("a"));
        assert!(map.commands().is_empty());
    }

    #[test]
    fn test_republish_reselects_first_even_if_same_id() {
        let (mut s, map) = sync();
        s.publish_results(three());
        s.select("b");
        s.publish_results(three());
        assert_eq!(s.selected(), Some("a"));
        assert_eq!(map.focus_count(), 3);
    }

    #[tokio::test]
    async fn test_events_published() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let mut s = SelectionSync::new(RecordingMap::new(), 15, bus);
        s.publish_results(three());

        match rx.recv().await.unwrap() {
            SessionEvent::ResultsPublished { count } => assert_eq!(count, 3),
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.recv().await.unwrap() {
            SessionEvent::SelectionChanged { place_id } => {
                assert_eq!(place_id.as_deref(), Some("a"))
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
