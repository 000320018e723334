//! Selection Engine: turns ranked scores into an activation decision.
//!
//! ```text
//! scores ──► select_frameworks ──► [framework ids ≥ threshold, ranked]
//!        └─► select_persona ─────► primary + contextual personas
//!                 ▲
//!                 └── prior ConversationState (continuity)
//! ```
//!
//! Both engines are pure functions over the scores, the registry and the
//! thresholds. Ordering is fully deterministic: confidence descending, then
//! specificity descending, then id ascending (see [`rank_order`]).

pub mod framework;
pub mod persona;

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::registry::Registry;
use crate::scoring::CandidateScore;

pub use framework::select_frameworks;
pub use persona::{select_persona, PersonaSelection};

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Activation thresholds and continuity settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum confidence for a framework to be active.
    #[serde(default = "default_framework_activation")]
    pub framework_activation: f64,
    /// Minimum confidence for a persona to become primary on its own.
    #[serde(default = "default_persona_primary")]
    pub persona_primary: f64,
    /// Minimum confidence for a persona to be listed as contextual.
    #[serde(default = "default_persona_contextual")]
    pub persona_contextual: f64,
    /// How far a competitor must exceed the active persona's recorded
    /// confidence before a weak-signal turn switches personas.
    #[serde(default = "default_switch_margin")]
    pub switch_margin: f64,
    /// Cap on contextual personas per turn.
    #[serde(default = "default_max_contextual")]
    pub max_contextual: usize,
}

fn default_framework_activation() -> f64 { 0.6 }
fn default_persona_primary() -> f64 { 0.8 }
fn default_persona_contextual() -> f64 { 0.6 }
fn default_switch_margin() -> f64 { 0.15 }
fn default_max_contextual() -> usize { 3 }

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            framework_activation: default_framework_activation(),
            persona_primary: default_persona_primary(),
            persona_contextual: default_persona_contextual(),
            switch_margin: default_switch_margin(),
            max_contextual: default_max_contextual(),
        }
    }
}

// ---------------------------------------------------------------------------
// Decision vocabulary
// ---------------------------------------------------------------------------

/// Which rule produced the primary persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationBasis {
    /// The input named the persona directly.
    ExplicitMention,
    /// The persona cleared the primary threshold.
    Threshold,
    /// Weak signal; the session's active persona was kept.
    Continuity,
    /// Weak signal, but a competitor beat the active persona by the margin.
    Switch,
    /// Nothing qualified; the fallback persona was used.
    Fallback,
}

impl fmt::Display for ActivationBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExplicitMention => write!(f, "explicit_mention"),
            Self::Threshold => write!(f, "threshold"),
            Self::Continuity => write!(f, "continuity"),
            Self::Switch => write!(f, "switch"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Why a turn ended on the fallback persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No persona qualified and there was no session persona to keep.
    NoEligibleCandidate,
    /// The session state referenced an id missing from the registry.
    StaleStateReference,
    /// The scorer failed for this turn.
    ScorerFailure,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEligibleCandidate => write!(f, "no_eligible_candidate"),
            Self::StaleStateReference => write!(f, "stale_state_reference"),
            Self::ScorerFailure => write!(f, "scorer_failure"),
        }
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Deterministic ranking: confidence desc, specificity desc, id asc.
pub fn rank_order(a: &CandidateScore, b: &CandidateScore, registry: &Registry) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| {
            registry
                .specificity_of(&b.candidate)
                .total_cmp(&registry.specificity_of(&a.candidate))
        })
        .then_with(|| a.candidate.as_str().cmp(b.candidate.as_str()))
}
