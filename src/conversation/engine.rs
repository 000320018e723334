//! The Conversation State Engine: sole owner of every session's state.
//!
//! Sessions live in a concurrent map of per-session mutexes. The map is
//! only touched long enough to fetch a session's `Arc`; the session mutex
//! is then held for the whole turn, which is what serializes turns of one
//! session while turns of different sessions run in parallel.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::activation::ActivationResult;

use super::state::{ConversationState, SessionPhase};

type SessionSlot = Arc<Mutex<ConversationState>>;

/// Owns and serializes access to all conversation states.
#[derive(Debug)]
pub struct ConversationStateEngine {
    sessions: DashMap<String, SessionSlot>,
    history_retention: usize,
}

impl ConversationStateEngine {
    pub fn new(history_retention: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            history_retention: history_retention.max(1),
        }
    }

    fn slot(&self, session_id: &str) -> SessionSlot {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ConversationState::new(session_id, Utc::now()))))
            .clone()
    }

    /// Snapshot of a session's state, or `None` before its first turn.
    pub fn get_current(&self, session_id: &str) -> Option<ConversationState> {
        let slot = self.sessions.get(session_id).map(|s| s.value().clone())?;
        let state = slot.lock();
        let snapshot = (state.turn_count > 0).then(|| state.clone());
        snapshot
    }

    /// Append a decision to a session, creating the session if needed.
    pub fn update(&self, session_id: &str, result: ActivationResult) {
        let slot = self.slot(session_id);
        let mut state = slot.lock();
        state.apply(result, self.history_retention, Utc::now());
    }

    /// Run one turn with exclusive access to the session.
    ///
    /// The closure reads the prior state through [`TurnHandle::current`] and
    /// commits the decision through [`TurnHandle::update`]. Concurrent calls
    /// for the same session wait for each other and run in arrival order of
    /// the lock.
    pub fn run_turn<R>(&self, session_id: &str, f: impl FnOnce(&mut TurnHandle<'_>) -> R) -> R {
        let slot = self.slot(session_id);
        let mut state = slot.lock();
        let prior_phase = state.phase;
        if prior_phase == SessionPhase::Active {
            state.phase = SessionPhase::Transitioning;
        }
        let mut handle = TurnHandle {
            state: &mut *state,
            retention: self.history_retention,
            prior_phase,
            committed: false,
        };
        f(&mut handle)
    }

    /// Remove a session, returning its final state.
    pub fn close_session(&self, session_id: &str) -> Option<ConversationState> {
        let (_, slot) = self.sessions.remove(session_id)?;
        let state = slot.lock().clone();
        log::debug!("Closed session {} after {} turns", session_id, state.turn_count);
        Some(state)
    }

    /// Remove sessions idle for longer than `max_idle` as of `now`.
    ///
    /// Sessions with a turn in progress, or whose slot another caller has
    /// already fetched, are never evicted. Returns the evicted session ids,
    /// sorted.
    pub fn evict_idle(&self, max_idle: Duration, now: DateTime<Utc>) -> Vec<String> {
        let candidates: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();

        // The shard lock held by `remove_if` keeps `slot()` from handing out
        // a new clone between the check and the removal.
        let mut evicted = Vec::new();
        for id in candidates {
            let removed = self.sessions.remove_if(&id, |_, slot| {
                Arc::strong_count(slot) == 1
                    && slot
                        .try_lock()
                        .map_or(false, |state| now - state.last_activity > max_idle)
            });
            if removed.is_some() {
                evicted.push(id);
            }
        }
        evicted.sort();
        if !evicted.is_empty() {
            log::info!("Evicted {} idle session(s)", evicted.len());
        }
        evicted
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Known session ids, sorted.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

impl Default for ConversationStateEngine {
    fn default() -> Self {
        Self::new(50)
    }
}

/// Exclusive access to one session for the duration of a turn.
pub struct TurnHandle<'a> {
    state: &'a mut ConversationState,
    retention: usize,
    prior_phase: SessionPhase,
    committed: bool,
}

impl TurnHandle<'_> {
    /// The state before this turn, or `None` on the session's first turn.
    pub fn current(&self) -> Option<&ConversationState> {
        (self.state.turn_count > 0).then_some(&*self.state)
    }

    pub fn session_id(&self) -> &str {
        &self.state.session_id
    }

    /// Commit this turn's decision.
    pub fn update(&mut self, result: ActivationResult) {
        self.state.apply(result, self.retention, Utc::now());
        self.committed = true;
    }
}

impl Drop for TurnHandle<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.state.phase = self.prior_phase;
        }
    }
}
