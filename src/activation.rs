//! Input and output contracts of one routing turn.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::{FrameworkId, PersonaId};
use crate::selection::ActivationBasis;

/// One turn submitted by the caller (e.g. a chat-turn dispatcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub raw_text: String,
    pub session_id: String,
    /// Persona the caller wants, by id or display name.
    #[serde(default)]
    pub explicit_persona_hint: Option<String>,
}

impl ActivationRequest {
    pub fn new(session_id: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            session_id: session_id.into(),
            explicit_persona_hint: None,
        }
    }

    /// Builder: request a specific persona.
    pub fn with_persona_hint(mut self, hint: impl Into<String>) -> Self {
        self.explicit_persona_hint = Some(hint.into());
        self
    }
}

/// The decision produced for one turn. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationResult {
    pub primary_persona: PersonaId,
    /// Ordered, duplicate-free.
    pub contextual_personas: Vec<PersonaId>,
    /// Ordered by descending confidence, duplicate-free.
    pub active_frameworks: Vec<FrameworkId>,
    /// Confidence of the primary persona decision; 0 on fallback.
    pub confidence: f64,
    /// The primary persona differs from the previous turn's.
    pub switched: bool,
    pub basis: ActivationBasis,
    pub fallback_used: bool,
    /// Id of the transparency record describing this decision.
    pub record_id: Uuid,
}
