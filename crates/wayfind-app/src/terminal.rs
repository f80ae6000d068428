//! Text rendering of the transcript and the map for the terminal session.

use std::io::Write;
use std::sync::{Arc, Mutex};

use wayfind_chat::{MapWidget, Marker};
use wayfind_core::{ChatMessage, Coordinate, MessageKind, Place};

/// Map widget that describes marker and camera changes as text.
///
/// Lines are buffered until [`TerminalMap::take_lines`] so the session can
/// print them after the transcript entries of the same turn. Clones share
/// one buffer.
#[derive(Clone, Default)]
pub struct TerminalMap {
    lines: Arc<Mutex<Vec<String>>>,
    markers: Vec<Marker>,
}

impl TerminalMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the buffered lines.
    pub fn take_lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|mut l| std::mem::take(&mut *l))
            .unwrap_or_default()
    }

    fn push(&self, line: String) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}

impl MapWidget for TerminalMap {
    fn show_markers(&mut self, markers: &[Marker]) {
        self.markers = markers.to_vec();
        if markers.is_empty() {
            self.push("  [map] cleared".to_string());
            return;
        }
        self.push(format!("  [map] {} markers", markers.len()));
        for m in markers {
            self.push(format!("    ({:>2}) {}  @ {}", m.label, m.title, m.coordinate));
        }
    }

    fn focus(&mut self, center: Coordinate, zoom: u8) {
        self.push(format!("  [map] centered on {} at zoom {}", center, zoom));
    }

    fn highlight(&mut self, place_id: Option<&str>) {
        let marker = place_id.and_then(|id| self.markers.iter().find(|m| m.place_id == id));
        if let Some(m) = marker {
            self.push(format!("  [map] selected ({}) {}", m.label, m.title));
        }
    }
}

/// Render one transcript entry, including its inline cards.
pub fn render_message<O: Write>(out: &mut O, message: &ChatMessage) -> std::io::Result<()> {
    let who = match message.kind {
        MessageKind::System => "system",
        MessageKind::User => "you",
        MessageKind::Assistant => "assistant",
    };
    if message.transient {
        writeln!(out, "  ... {}", message.text)?;
    } else {
        writeln!(out, "[{}] {}", who, message.text)?;
    }
    for (i, place) in message.attached_places.iter().enumerate() {
        render_card(out, i + 1, place)?;
    }
    out.flush()
}

fn render_card<O: Write>(out: &mut O, position: usize, place: &Place) -> std::io::Result<()> {
    match place.rating {
        Some(rating) => writeln!(out, "   {}. {}  ({:.1}/5)", position, place.name, rating)?,
        None => writeln!(out, "   {}. {}", position, place.name)?,
    }
    writeln!(out, "      {}", place.address_or_placeholder())?;
    writeln!(out, "      map: {}", place.maps_url())?;
    writeln!(out, "      directions: {}", place.directions_url())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(id: &str, rating: Option<f64>) -> Place {
        Place {
            id: id.to_string(),
            name: format!("Cafe {}", id),
            coordinate: Coordinate::new(-6.2, 106.8),
            formatted_address: None,
            rating,
        }
    }

    #[test]
    fn test_render_summary_with_cards() {
        let message = ChatMessage::assistant("Found 2 places!")
            .with_places(vec![place("a", Some(4.4)), place("b", None)]);
        let mut out = Vec::new();
        render_message(&mut out, &message).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("[assistant] Found 2 places!"));
        assert!(text.contains("1. Cafe a  (4.4/5)"));
        assert!(text.contains("2. Cafe b\n"));
        assert!(text.contains("Address not available"));
        assert!(text.contains("directions: https://"));
    }

    #[test]
    fn test_render_transient() {
        let mut out = Vec::new();
        render_message(&mut out, &ChatMessage::transient("Thinking...")).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "  ... Thinking...\n");
    }

    #[test]
    fn test_terminal_map_highlight_uses_marker_label() {
        let view = TerminalMap::new();
        let mut map = view.clone();
        let markers = vec![
            Marker {
                place_id: "a".into(),
                coordinate: Coordinate::new(1.0, 2.0),
                label: "1".into(),
                title: "Alpha".into(),
            },
            Marker {
                place_id: "b".into(),
                coordinate: Coordinate::new(3.0, 4.0),
                label: "2".into(),
                title: "Beta".into(),
            },
        ];
        map.show_markers(&markers);
        map.focus(Coordinate::new(3.0, 4.0), 15);
        map.highlight(Some("b"));
        map.show_markers(&[]);

        let lines = view.take_lines();
        assert_eq!(lines[0], "  [map] 2 markers");
        assert!(lines[3].ends_with("at zoom 15"));
        assert_eq!(lines[4], "  [map] selected (2) Beta");
        assert_eq!(lines.last().map(String::as_str), Some("  [map] cleared"));
        assert!(view.take_lines().is_empty());
    }
}
