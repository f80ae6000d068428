//! Turn state machine with thread-safe transitions.
//!
//! Valid transitions for one conversational turn:
//! - Idle -> AwaitingIntent (non-blank input accepted)
//! - AwaitingIntent -> AwaitingSearch (intent extracted)
//! - AwaitingIntent -> Idle (no intent, or model failure)
//! - AwaitingSearch -> Idle (results, no results, or search failure)
//!
//! Input is accepted only in Idle; that check and the move out of Idle
//! happen under one lock, so two concurrent submissions cannot both start.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use wayfind_core::{EventBus, SessionEvent, TurnState, WayfindError};

use crate::error::TurnRejected;

/// Returns whether a transition from `from` to `to` is valid.
pub fn can_transition(from: TurnState, to: TurnState) -> bool {
    matches!(
        (from, to),
        (TurnState::Idle, TurnState::AwaitingIntent)
            | (TurnState::AwaitingIntent, TurnState::AwaitingSearch)
            | (TurnState::AwaitingIntent, TurnState::Idle)
            | (TurnState::AwaitingSearch, TurnState::Idle)
    )
}

/// Thread-safe turn state.
///
/// Clones share state. Every successful transition is published on the
/// event bus as [`SessionEvent::TurnStateChanged`].
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: Arc<Mutex<TurnState>>,
    events: EventBus,
}

impl StateMachine {
    /// Create a state machine initialized to `Idle`.
    pub fn new(events: EventBus) -> Self {
        Self {
            state: Arc::new(Mutex::new(TurnState::Idle)),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TurnState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current(&self) -> TurnState {
        *self.lock()
    }

    pub fn is_idle(&self) -> bool {
        self.current() == TurnState::Idle
    }

    /// Claim the machine for a new turn: Idle -> AwaitingIntent.
    ///
    /// Fails with [`TurnRejected::Busy`] while another turn is in flight.
    pub fn try_begin(&self) -> Result<(), TurnRejected> {
        let mut state = self.lock();
        if *state != TurnState::Idle {
            debug!(state = %*state, "Rejecting input while busy");
            return Err(TurnRejected::Busy);
        }
        *state = TurnState::AwaitingIntent;
        drop(state);
        self.announce(TurnState::Idle, TurnState::AwaitingIntent);
        Ok(())
    }

    /// Attempt to transition to `target`.
    pub fn transition(&self, target: TurnState) -> Result<(), WayfindError> {
        let mut state = self.lock();
        let from = *state;
        if !can_transition(from, target) {
            return Err(WayfindError::Turn(format!(
                "Invalid turn transition: {} -> {}",
                from, target
            )));
        }
        *state = target;
        drop(state);
        self.announce(from, target);
        Ok(())
    }

    /// Force the machine back to Idle.
    pub fn reset(&self) {
        let mut state = self.lock();
        let from = *state;
        if from == TurnState::Idle {
            return;
        }
        warn!(from = %from, "Turn state reset to Idle");
        *state = TurnState::Idle;
        drop(state);
        self.announce(from, TurnState::Idle);
    }

    fn announce(&self, from: TurnState, to: TurnState) {
        debug!("Turn state: {} -> {}", from, to);
        self.events
            .publish(SessionEvent::TurnStateChanged { from, to });
    }
}
