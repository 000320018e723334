//! Confidence Scorer: converts an [`ActivationContext`] into one
//! [`CandidateScore`] per registry candidate.
//!
//! Scoring sits behind the [`Scorer`] trait so a statistical or learned
//! scorer can replace the keyword baseline without touching selection or
//! conversation state. Whatever a scorer returns is passed through
//! [`sanitize_scores`] before selection sees it, which guarantees one score
//! per candidate, in registry order, with every confidence in [0, 1].

pub mod keyword;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analysis::ActivationContext;
use crate::error::ScoringError;
use crate::registry::{CandidateId, CandidateKind, Registry};

pub use keyword::KeywordScorer;

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Weights of `confidence = clamp01(keyword·k + domain·d + explicit·e)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_keyword_weight")]
    pub keyword: f64,
    #[serde(default = "default_domain_weight")]
    pub domain: f64,
    /// Bonus added when the candidate is explicitly mentioned.
    #[serde(default = "default_explicit_weight")]
    pub explicit: f64,
}

fn default_keyword_weight() -> f64 { 0.7 }
fn default_domain_weight() -> f64 { 0.3 }
fn default_explicit_weight() -> f64 { 0.5 }

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            keyword: default_keyword_weight(),
            domain: default_domain_weight(),
            explicit: default_explicit_weight(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// The inputs behind a confidence value, kept for transparency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactors {
    /// Matched pattern weight over total pattern weight, in [0, 1].
    pub keyword: f64,
    /// Share of the candidate's domain tags detected in the input, in [0, 1].
    pub domain: f64,
    /// Bonus actually applied for an explicit mention (0 when not mentioned).
    pub explicit_bonus: f64,
}

/// Confidence of one candidate for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub candidate: CandidateId,
    /// Final confidence in [0, 1].
    pub confidence: f64,
    pub factors: ScoreFactors,
    pub explicit_mention: bool,
}

impl CandidateScore {
    /// A zero score with no contributing factors.
    pub fn zero(candidate: CandidateId) -> Self {
        Self {
            candidate,
            confidence: 0.0,
            factors: ScoreFactors::default(),
            explicit_mention: false,
        }
    }

    pub fn kind(&self) -> CandidateKind {
        self.candidate.kind()
    }
}

/// Clamp into [0, 1], mapping NaN to 0.
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Scorer trait
// ---------------------------------------------------------------------------

/// Produces confidence scores for every registry candidate.
pub trait Scorer: Send + Sync {
    /// Name used in logs and failure records.
    fn name(&self) -> &str;

    /// Score every candidate in `registry` against `context`.
    fn score(
        &self,
        context: &ActivationContext,
        registry: &Registry,
    ) -> Result<Vec<CandidateScore>, ScoringError>;
}

/// One zero score per candidate, in registry order.
pub fn zero_scores(registry: &Registry) -> Vec<CandidateScore> {
    registry
        .candidates()
        .map(|c| CandidateScore::zero(c.candidate_id()))
        .collect()
}

/// Normalize arbitrary scorer output into exactly one score per registry
/// candidate, in registry order, with every confidence clamped into [0, 1].
///
/// `explicit_mention` is always taken from `context`, whatever the scorer
/// reported. Returns the cleaned scores and one note per repair made.
pub fn sanitize_scores(
    raw: Vec<CandidateScore>,
    context: &ActivationContext,
    registry: &Registry,
) -> (Vec<CandidateScore>, Vec<String>) {
    let mut notes = Vec::new();
    let mut by_id: HashMap<CandidateId, CandidateScore> = HashMap::with_capacity(raw.len());

    for mut score in raw {
        if !registry.contains(&score.candidate) {
            notes.push(format!("dropped score for unknown candidate {}", score.candidate));
            continue;
        }
        if by_id.contains_key(&score.candidate) {
            notes.push(format!("ignored duplicate score for {}", score.candidate));
            continue;
        }
        let clamped = clamp01(score.confidence);
        if clamped != score.confidence {
            notes.push(format!(
                "clamped confidence of {} from {} to {}",
                score.candidate, score.confidence, clamped
            ));
            score.confidence = clamped;
        }
        by_id.insert(score.candidate.clone(), score);
    }

    let scores = registry
        .candidates()
        .map(|c| {
            let id = c.candidate_id();
            let mut score = by_id.remove(&id).unwrap_or_else(|| {
                notes.push(format!("missing score for {}; using 0", id));
                CandidateScore::zero(id)
            });
            let mentioned = context.is_explicitly_mentioned(&score.candidate);
            if score.explicit_mention != mentioned {
                notes.push(format!(
                    "corrected explicit mention flag of {} to {}",
                    score.candidate, mentioned
                ));
                score.explicit_mention = mentioned;
            }
            score
        })
        .collect();

    (scores, notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ContextAnalyzer;
    use crate::registry::{DomainLexicon, FrameworkDefinition, PersonaDefinition};

    fn registry() -> Registry {
        Registry::new(
            vec![PersonaDefinition::new("a", "A"), PersonaDefinition::new("fb", "Fallback")],
            vec![FrameworkDefinition::new("f", "F")],
            "fb",
            DomainLexicon::new(),
        )
        .unwrap()
    }

    fn context(text: &str) -> ActivationContext {
        ContextAnalyzer::default().analyze(text, "s1", &registry())
    }

    fn score(id: CandidateId, confidence: f64) -> CandidateScore {
        CandidateScore { confidence, ..CandidateScore::zero(id) }
    }

    #[test]
    fn test_clamp01() {
        assert_eq!(clamp01(f64::NAN), 0.0);
        assert_eq!(clamp01(-0.2), 0.0);
        assert_eq!(clamp01(1.7), 1.0);
        assert_eq!(clamp01(0.42), 0.42);
    }

    #[test]
    fn test_sanitize_fills_orders_and_clamps() {
        let raw = vec![
            score(CandidateId::Framework("f".into()), 1.4),
            score(CandidateId::Persona("ghost".into()), 0.9),
            score(CandidateId::Persona("a".into()), f64::NAN),
        ];
        let (scores, notes) = sanitize_scores(raw, &context(""), &registry());
        let ids: Vec<String> = scores.iter().map(|s| s.candidate.to_string()).collect();
        assert_eq!(ids, vec!["persona:a", "persona:fb", "framework:f"]);
        assert_eq!(scores[0].confidence, 0.0);
        assert_eq!(scores[1].confidence, 0.0);
        assert_eq!(scores[2].confidence, 1.0);
        assert_eq!(notes.len(), 4, "{notes:?}");
    }

    #[test]
    fn test_sanitize_clean_input_has_no_notes() {
        let (scores, notes) = sanitize_scores(zero_scores(&registry()), &context(""), &registry());
        assert_eq!(scores.len(), 3);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_duplicate_scores_keep_first() {
        let raw = vec![
            score(CandidateId::Persona("a".into()), 0.3),
            score(CandidateId::Persona("a".into()), 0.9),
        ];
        let (scores, notes) = sanitize_scores(raw, &context(""), &registry());
        assert_eq!(scores[0].confidence, 0.3);
        assert!(notes.iter().any(|n| n.contains("duplicate")));
    }

    #[test]
    fn test_explicit_mention_comes_from_context() {
        let raw = vec![
            score(CandidateId::Persona("a".into()), 0.2),
            CandidateScore {
                explicit_mention: true,
                ..score(CandidateId::Persona("fb".into()), 0.1)
            },
        ];
        let (scores, notes) = sanitize_scores(raw, &context("over to you, A"), &registry());
        assert!(scores[0].explicit_mention);
        assert!(!scores[1].explicit_mention);
        assert!(!scores[2].explicit_mention);
        assert_eq!(notes.iter().filter(|n| n.contains("explicit mention")).count(), 2);
    }
}
