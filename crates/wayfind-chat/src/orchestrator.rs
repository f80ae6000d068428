//! Conversation orchestrator: one user turn from input to published results.
//!
//! A turn runs through two suspend points (model call, search call). Every
//! failure is caught here and turned into a transcript message; the state
//! machine always ends the turn in `Idle`. Locks on the transcript and the
//! selection are taken only inside the small synchronous helpers below and
//! are never held across an await.

use std::sync::{Mutex, MutexGuard};

use tracing::{info, warn};

use wayfind_core::{
    ChatMessage, Coordinate, EventBus, Place, ResultSet, SessionEvent, TurnState, WayfindConfig,
};
use wayfind_places::{PlaceSearchClient, PlacesService};

use crate::error::TurnRejected;
use crate::intent::IntentExtractor;
use crate::llm::ModelClient;
use crate::location::{GeolocationProvider, SessionLocation};
use crate::response;
use crate::selection::{MapWidget, Marker, SelectionSync};
use crate::state::StateMachine;
use crate::transcript::{TransientHandle, Transcript};

/// How a completed turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Results were published to the map; `count` is the map-capped size.
    Results { count: usize },
    /// The search succeeded with nothing to show.
    NoResults,
    /// The model reply held no usable query.
    NeedsClarification,
    /// The model service could not be reached or timed out.
    AssistantUnreachable,
    /// The model service failed in some other way.
    AssistantFailed,
    /// The places service failed or could not be reached.
    SearchFailed,
}

/// Cleans up after a turn dropped before it finished: the pending
/// placeholder is withdrawn and the state machine returns to `Idle`.
struct TurnGuard<'a> {
    state: &'a StateMachine,
    transcript: &'a Mutex<Transcript>,
    events: &'a EventBus,
    pending: Option<TransientHandle>,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if self.state.is_idle() {
            return;
        }
        if let Some(handle) = self.pending.take() {
            let removed = self
                .transcript
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .withdraw(handle);
            if let Some(index) = removed {
                self.events
                    .publish(SessionEvent::TransientWithdrawn { index });
            }
        }
        self.state.reset();
    }
}

/// One chat session: transcript, turn state, results and selection.
pub struct Conversation<M, S, W> {
    extractor: IntentExtractor<M>,
    search: PlaceSearchClient<S>,
    state: StateMachine,
    transcript: Mutex<Transcript>,
    selection: Mutex<SelectionSync<W>>,
    location: SessionLocation,
    events: EventBus,
    card_limit: usize,
}

impl<M, S, W> Conversation<M, S, W>
where
    M: ModelClient,
    S: PlacesService,
    W: MapWidget,
{
    /// Start a session. The transcript opens with the greeting.
    pub fn new(
        extractor: IntentExtractor<M>,
        search: PlaceSearchClient<S>,
        map: W,
        config: &WayfindConfig,
    ) -> Self {
        let events = EventBus::new();
        let mut transcript = Transcript::new();
        transcript.append(response::greeting());
        Self {
            extractor,
            search,
            state: StateMachine::new(events.clone()),
            transcript: Mutex::new(transcript),
            selection: Mutex::new(SelectionSync::new(
                map,
                config.map.focus_zoom,
                events.clone(),
            )),
            location: SessionLocation::new(),
            events,
            card_limit: config.places.card_limit,
        }
    }

    /// Process one user submission.
    ///
    /// Blank input and input arriving while a turn is in flight are rejected
    /// without touching the transcript; the caller keeps the input.
    pub async fn submit(&self, input: &str) -> Result<TurnOutcome, TurnRejected> {
        let text = input.trim();
        if text.is_empty() {
            return Err(TurnRejected::Blank);
        }
        self.state.try_begin()?;
        let mut guard = TurnGuard {
            state: &self.state,
            transcript: &self.transcript,
            events: &self.events,
            pending: None,
        };

        self.append(ChatMessage::user(text));
        let thinking = self.begin_transient(response::thinking());
        guard.pending = Some(thinking);

        let intent = match self.extractor.extract(text).await {
            Ok(Some(intent)) => intent,
            Ok(None) => {
                info!(input = %text, "No search intent in reply, asking to rephrase");
                self.replace_transient(thinking, response::clarification());
                self.enter(TurnState::Idle);
                return Ok(TurnOutcome::NeedsClarification);
            }
            Err(e) => {
                warn!(error = %e, "Intent extraction failed");
                let (message, outcome) = if e.is_unreachable() {
                    (
                        response::assistant_unreachable(self.extractor.model_name()),
                        TurnOutcome::AssistantUnreachable,
                    )
                } else {
                    (response::generic_failure(), TurnOutcome::AssistantFailed)
                };
                self.replace_transient(thinking, message);
                self.enter(TurnState::Idle);
                return Ok(outcome);
            }
        };

        let query = intent.search_query;
        let searching = self.chain_transient(thinking, &response::searching(&query));
        guard.pending = Some(searching);
        self.enter(TurnState::AwaitingSearch);

        let outcome = match self.search.search(&query, self.location.get()).await {
            Ok(results) if results.is_empty() => {
                self.replace_transient(searching, response::no_results());
                self.publish(ResultSet::empty());
                TurnOutcome::NoResults
            }
            Ok(results) => {
                let count = results.len();
                let cards = results.prefix(self.card_limit).to_vec();
                self.replace_transient(searching, response::found(count, cards));
                self.publish(results);
                TurnOutcome::Results { count }
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Place search failed");
                self.replace_transient(searching, response::generic_failure());
                TurnOutcome::SearchFailed
            }
        };

        self.enter(TurnState::Idle);
        Ok(outcome)
    }

    /// Select a place by id (card or marker click).
    ///
    /// Returns `false` when the id is not in the current results or is
    /// already selected.
    pub fn select(&self, place_id: &str) -> bool {
        self.selection().select(place_id)
    }

    /// Resolve the session location from `provider`, once per session.
    pub async fn locate<P: GeolocationProvider>(&self, provider: &P) -> bool {
        if self.location.is_resolved() {
            return false;
        }
        let coordinate = provider.current_position().await;
        self.apply_location(coordinate)
    }

    /// Record a geolocation outcome. Only the first call has any effect.
    pub fn apply_location(&self, coordinate: Option<Coordinate>) -> bool {
        if !self.location.resolve(coordinate) {
            return false;
        }
        let resolved = self.location.get();
        self.append(response::location_status(resolved.is_some()));
        self.events.publish(SessionEvent::LocationResolved {
            coordinate: resolved,
        });
        true
    }

    // -------------------------------------------------------------------------
    // Read side
    // -------------------------------------------------------------------------

    /// Snapshot of the transcript.
    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript_lock().messages().to_vec()
    }

    pub fn state(&self) -> TurnState {
        self.state.current()
    }

    pub fn is_busy(&self) -> bool {
        !self.state.is_idle()
    }

    pub fn selected_place(&self) -> Option<Place> {
        self.selection().selected_place().cloned()
    }

    pub fn current_results(&self) -> ResultSet {
        self.selection().results().clone()
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.selection().markers()
    }

    pub fn is_highlighted(&self, place_id: &str) -> bool {
        self.selection().is_highlighted(place_id)
    }

    pub fn location(&self) -> Option<Coordinate> {
        self.location.get()
    }

    pub fn model_name(&self) -> &str {
        self.extractor.model_name()
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // -------------------------------------------------------------------------
    // Synchronous helpers
    // -------------------------------------------------------------------------

    fn transcript_lock(&self) -> MutexGuard<'_, Transcript> {
        self.transcript
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn selection(&self) -> MutexGuard<'_, SelectionSync<W>> {
        self.selection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self, target: TurnState) {
        if let Err(e) = self.state.transition(target) {
            warn!(error = %e, "Unexpected turn transition");
            self.state.reset();
        }
    }

    fn append(&self, message: ChatMessage) {
        let index = self.transcript_lock().append(message.clone());
        self.events
            .publish(SessionEvent::MessageAppended { index, message });
    }

    fn begin_transient(&self, text: &str) -> TransientHandle {
        let (handle, message, index) = {
            let mut transcript = self.transcript_lock();
            let (handle, index) = transcript.begin_transient(text);
            (handle, transcript.messages()[index].clone(), index)
        };
        self.events
            .publish(SessionEvent::MessageAppended { index, message });
        handle
    }

    fn chain_transient(&self, handle: TransientHandle, text: &str) -> TransientHandle {
        let (next, replacement, message) = self.transcript_lock().chain_transient(handle, text);
        self.events.publish(SessionEvent::TransientReplaced {
            removed: replacement.removed,
            appended: replacement.appended,
            message,
        });
        next
    }

    fn replace_transient(&self, handle: TransientHandle, successor: ChatMessage) {
        let replacement = self
            .transcript_lock()
            .replace_transient(handle, successor.clone());
        self.events.publish(SessionEvent::TransientReplaced {
            removed: replacement.removed,
            appended: replacement.appended,
            message: successor,
        });
    }

    fn publish(&self, results: ResultSet) {
        self.selection().publish_results(results);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::llm::MockModelClient;
    use crate::location::FixedLocation;
    use crate::selection::RecordingMap;
    use wayfind_core::MessageKind;
    use wayfind_places::MockPlacesService;

    type TestConversation = Conversation<MockModelClient, MockPlacesService, RecordingMap>;

    fn conversation(model: MockModelClient, places: MockPlacesService) -> TestConversation {
        let config = WayfindConfig::default();
        Conversation::new(
            IntentExtractor::new(model, Duration::from_secs(30)),
            PlaceSearchClient::from_config(places, &config.places),
            RecordingMap::new(),
            &config,
        )
    }

    fn replying(query: &str) -> MockModelClient {
        MockModelClient::replying(&format!(r#"{{"search_query":"{}"}}"#, query))
    }

    #[test]
    fn test_new_session_has_greeting() {
        let c = conversation(replying("x"), MockPlacesService::with_generated(1));
        let transcript = c.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].kind, MessageKind::System);
        assert_eq!(transcript[0].text, response::GREETING);
        assert_eq!(c.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let model = replying("x");
        let c = conversation(model.clone(), MockPlacesService::with_generated(1));
        assert_eq!(c.submit("   \n").await, Err(TurnRejected::Blank));
        assert_eq!(c.transcript().len(), 1);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_user_message_is_trimmed() {
        let c = conversation(replying("gyms"), MockPlacesService::with_generated(2));
        c.submit("  gyms nearby  ").await.unwrap();
        assert_eq!(c.transcript()[1].text, "gyms nearby");
    }

    #[tokio::test]
    async fn test_model_failure_is_generic() {
        let places = MockPlacesService::with_generated(2);
        let c = conversation(MockModelClient::failing(500), places.clone());
        let outcome = c.submit("pizza").await.unwrap();
        assert_eq!(outcome, TurnOutcome::AssistantFailed);
        assert_eq!(c.transcript().last().unwrap().text, response::GENERIC_FAILURE);
        assert_eq!(places.request_count(), 0);
    }

    #[tokio::test]
    async fn test_search_failure_is_generic() {
        let c = conversation(replying("pizza"), MockPlacesService::unavailable());
        let outcome = c.submit("pizza").await.unwrap();
        assert_eq!(outcome, TurnOutcome::SearchFailed);
        let last = c.transcript().last().cloned().unwrap();
        assert_eq!(last.text, response::GENERIC_FAILURE);
        assert_eq!(last.kind, MessageKind::System);
        assert_eq!(c.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_location_applied_once_with_status_message() {
        let c = conversation(replying("x"), MockPlacesService::with_generated(1));
        assert!(c.locate(&FixedLocation::at(-6.2, 106.8)).await);
        assert!(!c.locate(&FixedLocation::at(1.0, 1.0)).await);
        assert!(!c.apply_location(None));

        assert_eq!(c.location(), Some(Coordinate::new(-6.2, 106.8)));
        let transcript = c.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].text, response::LOCATION_DETECTED);
    }

    #[tokio::test]
    async fn test_location_unavailable_message() {
        let c = conversation(replying("x"), MockPlacesService::with_generated(1));
        assert!(c.locate(&FixedLocation::unavailable()).await);
        assert_eq!(c.location(), None);
        assert_eq!(c.transcript()[1].text, response::LOCATION_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_events_for_successful_turn() {
        let c = conversation(replying("gyms"), MockPlacesService::with_generated(2));
        let mut rx = c.subscribe();
        c.submit("gyms").await.unwrap();

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.name());
        }
        assert_eq!(
            names,
            vec![
                "turn_state_changed",
                "message_appended",
                "message_appended",
                "transient_replaced",
                "turn_state_changed",
                "transient_replaced",
                "results_published",
                "selection_changed",
                "turn_state_changed",
            ]
        );
    }

    #[tokio::test]
    async fn test_dropped_turn_returns_to_idle() {
        let model = replying("x").with_delay(Duration::from_secs(60));
        let c = conversation(model, MockPlacesService::with_generated(1));
        let mut rx = c.subscribe();
        let result = tokio::time::timeout(Duration::from_millis(10), c.submit("pizza")).await;
        assert!(result.is_err());
        assert_eq!(c.state(), TurnState::Idle);

        let transcript = c.transcript();
        assert!(transcript.iter().all(|m| !m.transient));
        let texts: Vec<&str> = transcript.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec![response::GREETING, "pizza"]);

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.name());
        }
        assert_eq!(
            names,
            vec![
                "turn_state_changed",
                "message_appended",
                "message_appended",
                "transient_withdrawn",
                "turn_state_changed",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_search_withdraws_searching_placeholder() {
        let places = MockPlacesService::with_generated(3).with_delay(Duration::from_secs(60));
        let c = conversation(replying("gyms"), places);
        let result = tokio::time::timeout(Duration::from_secs(5), c.submit("gyms")).await;
        assert!(result.is_err());
        assert_eq!(c.state(), TurnState::Idle);
        let texts: Vec<String> = c.transcript().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec![response::GREETING, "gyms"]);
        assert!(c.markers().is_empty());

        // The session accepts the next turn; the slow search now hits its own timeout.
        let outcome = c.submit("gyms again").await;
        assert_eq!(outcome, Ok(TurnOutcome::SearchFailed));
        assert!(c.transcript().iter().all(|m| !m.transient));
    }
}
