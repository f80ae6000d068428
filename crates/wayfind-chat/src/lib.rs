//! Conversational place finder for Wayfind.
//!
//! Turns a free-text request into a structured place query with a local
//! language model, runs the search, and keeps the transcript, the current
//! result set and the map selection in step.

pub mod error;
pub mod intent;
pub mod llm;
pub mod location;
pub mod orchestrator;
pub mod response;
pub mod selection;
pub mod state;
pub mod transcript;

pub use error::{IntentError, ModelError, TurnRejected};
pub use intent::{IntentExtractor, SearchIntent};
pub use llm::{MockModelClient, ModelClient, OllamaClient};
pub use location::{FixedLocation, GeolocationProvider, SessionLocation};
pub use orchestrator::{Conversation, TurnOutcome};
pub use selection::{MapCommand, MapWidget, Marker, RecordingMap, SelectionSync};
pub use state::StateMachine;
pub use transcript::{TransientHandle, Transcript};
