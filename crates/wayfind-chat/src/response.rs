//! Transcript wording.

use wayfind_core::{ChatMessage, Place};

pub const GREETING: &str = "AI Assistant ready! Ask me to find places to visit, eat, or explore.";
pub const THINKING: &str = "Thinking...";
pub const NO_RESULTS: &str = "No places found. Try a different search term or location.";
pub const CLARIFICATION: &str = "I understand you want to find a place. Could you be more specific? \
     For example: \"Find sushi restaurants\" or \"Coffee shops near me\"";
pub const GENERIC_FAILURE: &str = "An error occurred. Please try again.";
pub const LOCATION_DETECTED: &str = "Location detected! Ready to find places near you.";
pub const LOCATION_UNAVAILABLE: &str =
    "Using default location. Enable location access for better results.";

pub fn greeting() -> ChatMessage {
    ChatMessage::system(GREETING)
}

pub fn thinking() -> &'static str {
    THINKING
}

pub fn searching(query: &str) -> String {
    format!("Searching for: {}...", query)
}

/// Summary for a non-empty result set. `cards` are shown inline.
pub fn found(count: usize, cards: Vec<Place>) -> ChatMessage {
    ChatMessage::assistant(format!(
        "Found {} places! Click markers on the map for details.",
        count
    ))
    .with_places(cards)
}

pub fn no_results() -> ChatMessage {
    ChatMessage::assistant(NO_RESULTS)
}

pub fn clarification() -> ChatMessage {
    ChatMessage::assistant(CLARIFICATION)
}

/// Remediation hint when the local model service cannot be reached.
pub fn assistant_unreachable(model: &str) -> ChatMessage {
    ChatMessage::system(format!(
        "Error: Could not connect to Ollama. Make sure Ollama is running (ollama serve) \
         and {model} is installed (ollama pull {model})"
    ))
}

pub fn generic_failure() -> ChatMessage {
    ChatMessage::system(GENERIC_FAILURE)
}

pub fn location_status(detected: bool) -> ChatMessage {
    ChatMessage::system(if detected {
        LOCATION_DETECTED
    } else {
        LOCATION_UNAVAILABLE
    })
}
