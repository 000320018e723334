//! Per-session conversation state.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activation::ActivationResult;
use crate::registry::{FrameworkId, PersonaId};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No turn has completed yet.
    Idle,
    /// A primary persona is established.
    Active,
    /// A turn is being evaluated. Only visible while that turn holds the
    /// session lock.
    Transitioning,
}

/// One retained past decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 1-based turn number within the session.
    pub turn: u64,
    pub recorded_at: DateTime<Utc>,
    pub result: ActivationResult,
}

/// Everything the router remembers about one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: String,
    pub phase: SessionPhase,
    pub primary_persona: Option<PersonaId>,
    /// Confidence recorded with the current primary persona; the anchor for
    /// continuity decisions.
    pub primary_confidence: f64,
    pub active_frameworks: Vec<FrameworkId>,
    pub last_switch_at: Option<DateTime<Utc>>,
    /// Completed turns, including ones evicted from `history`.
    pub turn_count: u64,
    /// Bounded, oldest first.
    pub history: VecDeque<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl ConversationState {
    pub(crate) fn new(session_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.to_string(),
            phase: SessionPhase::Idle,
            primary_persona: None,
            primary_confidence: 0.0,
            active_frameworks: Vec::new(),
            last_switch_at: None,
            turn_count: 0,
            history: VecDeque::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Whether making `candidate` primary would count as a switch.
    ///
    /// The first persona of a session is not a switch.
    pub fn is_switch_to(&self, candidate: &PersonaId) -> bool {
        self.primary_persona.as_ref().map_or(false, |p| p != candidate)
    }

    /// The most recent retained decision.
    pub fn last_result(&self) -> Option<&ActivationResult> {
        self.history.back().map(|entry| &entry.result)
    }

    /// Append a decision, evicting the oldest entries beyond `retention`.
    pub(crate) fn apply(&mut self, result: ActivationResult, retention: usize, now: DateTime<Utc>) {
        if self.is_switch_to(&result.primary_persona) {
            self.last_switch_at = Some(now);
        }
        self.turn_count += 1;
        self.primary_persona = Some(result.primary_persona.clone());
        self.primary_confidence = result.confidence;
        self.active_frameworks = result.active_frameworks.clone();
        self.history.push_back(HistoryEntry {
            turn: self.turn_count,
            recorded_at: now,
            result,
        });
        while self.history.len() > retention.max(1) {
            self.history.pop_front();
        }
        self.phase = SessionPhase::Active;
        self.last_activity = now;
    }
}
