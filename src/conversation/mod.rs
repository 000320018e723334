//! Conversation State Engine: per-session continuity across turns.
//!
//! ```text
//! ConversationStateEngine
//!   sessions: DashMap<session_id, Arc<Mutex<ConversationState>>>
//!
//!   run_turn(session) ─► lock slot ─► Active → Transitioning
//!                                         │  (selection reads current())
//!                                         ▼
//!                                    update(result) ─► Active
//! ```
//!
//! The engine is the only component that mutates a [`ConversationState`].
//! Everyone else sees clones returned by [`ConversationStateEngine::get_current`]
//! or the borrowed view inside [`TurnHandle`].

pub mod engine;
pub mod state;

pub use engine::{ConversationStateEngine, TurnHandle};
pub use state::{ConversationState, HistoryEntry, SessionPhase};
