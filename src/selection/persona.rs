//! Persona selection: one primary persona per turn, plus a bounded list of
//! contextual personas.
//!
//! Decision order, first match wins:
//!
//! 1. **Explicit mention**: the best-ranked explicitly mentioned persona,
//!    whatever its confidence or tiers. Other mentioned personas lead the
//!    contextual list.
//! 2. **Stale state**: the session's active persona or one of its active
//!    frameworks no longer exists in the registry, so the turn falls back.
//! 3. **Threshold**: the best-ranked primary-tier persona at or above the
//!    primary threshold.
//! 4. **Continuity / Switch**: with an active session persona P, keep P unless
//!    a contextual-eligible competitor beats P's recorded confidence by more
//!    than the switch margin.
//! 5. **Fallback**: the designated fallback persona at confidence 0.

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationState;
use crate::registry::{CandidateId, PersonaId, PersonaTier, Registry};
use crate::scoring::CandidateScore;

use super::{rank_order, ActivationBasis, FallbackReason, Thresholds};

/// Outcome of persona selection for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaSelection {
    pub primary: PersonaId,
    /// Ordered, duplicate-free, never contains `primary`.
    pub contextual: Vec<PersonaId>,
    pub confidence: f64,
    pub basis: ActivationBasis,
    /// Set exactly when `basis` is [`ActivationBasis::Fallback`].
    pub fallback_reason: Option<FallbackReason>,
}

impl PersonaSelection {
    /// The fallback persona at confidence 0, with no contextual personas.
    pub fn fallback(registry: &Registry, reason: FallbackReason) -> Self {
        Self {
            primary: registry.fallback_persona_id().clone(),
            contextual: Vec::new(),
            confidence: 0.0,
            basis: ActivationBasis::Fallback,
            fallback_reason: Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.basis == ActivationBasis::Fallback
    }
}

/// Choose the primary and contextual personas for a turn.
///
/// `state` is the session's state before this turn, `None` on a first turn.
pub fn select_persona(
    scores: &[CandidateScore],
    state: Option<&ConversationState>,
    registry: &Registry,
    thresholds: &Thresholds,
) -> PersonaSelection {
    let mut ranked: Vec<(&PersonaId, &CandidateScore)> = scores
        .iter()
        .filter_map(|s| s.candidate.as_persona().map(|id| (id, s)))
        .filter(|(id, _)| registry.persona(id).is_some())
        .collect();
    ranked.sort_by(|a, b| rank_order(a.1, b.1, registry));

    let in_tier = |id: &PersonaId, tier: PersonaTier| {
        registry.persona(id).map_or(false, |p| p.in_tier(tier))
    };
    let contextual_eligible = |id: &PersonaId, score: &CandidateScore| {
        score.confidence >= thresholds.persona_contextual
            && (in_tier(id, PersonaTier::Primary) || in_tier(id, PersonaTier::Contextual))
    };
    let eligible: Vec<&PersonaId> = ranked
        .iter()
        .filter(|(id, s)| contextual_eligible(*id, *s))
        .map(|(id, _)| *id)
        .collect();
    let explicit: Vec<&PersonaId> = ranked
        .iter()
        .filter(|(_, s)| s.explicit_mention)
        .map(|(id, _)| *id)
        .collect();

    // 1. Explicit mention
    if let Some(&primary) = explicit.first() {
        let confidence = confidence_of(&ranked, primary);
        if explicit.len() > 1 {
            log::debug!(
                "{} personas explicitly mentioned; {} ranks first",
                explicit.len(),
                primary
            );
        }
        let leads = explicit.iter().skip(1).copied();
        return PersonaSelection {
            primary: primary.clone(),
            contextual: contextual_list(primary, leads.chain(eligible.iter().copied()), thresholds),
            confidence,
            basis: ActivationBasis::ExplicitMention,
            fallback_reason: None,
        };
    }

    let active = state.and_then(|s| s.primary_persona.as_ref());

    // 2. Stale state
    if let Some(state) = state {
        if let Some(stale) = stale_reference(state, registry) {
            log::warn!(
                "Session {} references unknown {}; falling back",
                state.session_id,
                stale
            );
            return fallback_with(registry, FallbackReason::StaleStateReference, &eligible, thresholds);
        }
    }

    // 3. Threshold
    if let Some((primary, score)) = ranked
        .iter()
        .find(|(id, s)| s.confidence >= thresholds.persona_primary && in_tier(*id, PersonaTier::Primary))
    {
        return PersonaSelection {
            primary: (*primary).clone(),
            contextual: contextual_list(primary, eligible.iter().copied(), thresholds),
            confidence: score.confidence,
            basis: ActivationBasis::Threshold,
            fallback_reason: None,
        };
    }

    // 4. Continuity / Switch. A session resting on the fallback persona has
    //    nothing worth keeping and is treated like a fresh one.
    if let (Some(state), Some(active)) = (state, active) {
        if active != registry.fallback_persona_id() {
            let anchor = state.primary_confidence;
            let competitor = ranked
                .iter()
                .filter(|(id, _)| *id != active)
                .find(|(id, s)| contextual_eligible(*id, *s));

            if let Some((challenger, score)) = competitor {
                if score.confidence > anchor + thresholds.switch_margin {
                    log::debug!(
                        "Switching from {} to {} ({:.3} > {:.3} + {:.3})",
                        active,
                        challenger,
                        score.confidence,
                        anchor,
                        thresholds.switch_margin
                    );
                    return PersonaSelection {
                        primary: (*challenger).clone(),
                        contextual: contextual_list(challenger, eligible.iter().copied(), thresholds),
                        confidence: score.confidence,
                        basis: ActivationBasis::Switch,
                        fallback_reason: None,
                    };
                }
            }

            return PersonaSelection {
                primary: active.clone(),
                contextual: contextual_list(active, eligible.iter().copied(), thresholds),
                confidence: anchor.max(confidence_of(&ranked, active)),
                basis: ActivationBasis::Continuity,
                fallback_reason: None,
            };
        }
    }

    // 5. Fallback
    fallback_with(registry, FallbackReason::NoEligibleCandidate, &eligible, thresholds)
}

/// First id in `state` that `registry` no longer defines.
fn stale_reference(state: &ConversationState, registry: &Registry) -> Option<CandidateId> {
    let persona = state
        .primary_persona
        .iter()
        .filter(|id| registry.persona(id).is_none())
        .map(|id| CandidateId::Persona(id.clone()));
    let frameworks = state
        .active_frameworks
        .iter()
        .filter(|id| registry.framework(id).is_none())
        .map(|id| CandidateId::Framework(id.clone()));
    persona.chain(frameworks).next()
}

fn fallback_with(
    registry: &Registry,
    reason: FallbackReason,
    eligible: &[&PersonaId],
    thresholds: &Thresholds,
) -> PersonaSelection {
    let mut selection = PersonaSelection::fallback(registry, reason);
    selection.contextual = contextual_list(&selection.primary, eligible.iter().copied(), thresholds);
    selection
}

fn confidence_of(ranked: &[(&PersonaId, &CandidateScore)], id: &PersonaId) -> f64 {
    ranked
        .iter()
        .find(|(candidate, _)| *candidate == id)
        .map_or(0.0, |(_, s)| s.confidence)
}

/// Dedupe in order, drop the primary, cap at `max_contextual`.
fn contextual_list<'a>(
    primary: &PersonaId,
    candidates: impl Iterator<Item = &'a PersonaId>,
    thresholds: &Thresholds,
) -> Vec<PersonaId> {
    let mut out: Vec<PersonaId> = Vec::new();
    for id in candidates {
        if out.len() >= thresholds.max_contextual {
            break;
        }
        if id != primary && !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}
