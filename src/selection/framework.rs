//! Framework selection: every framework at or above the activation
//! threshold is active, ranked by [`super::rank_order`].

use crate::registry::{FrameworkId, Registry};
use crate::scoring::CandidateScore;

use super::{rank_order, Thresholds};

/// Active framework ids, highest confidence first.
pub fn select_frameworks(
    scores: &[CandidateScore],
    registry: &Registry,
    thresholds: &Thresholds,
) -> Vec<FrameworkId> {
    let mut active: Vec<&CandidateScore> = scores
        .iter()
        .filter(|s| s.candidate.as_framework().is_some())
        .filter(|s| s.confidence >= thresholds.framework_activation)
        .collect();
    active.sort_by(|a, b| rank_order(a, b, registry));

    active
        .into_iter()
        .filter_map(|s| s.candidate.as_framework().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CandidateId, DomainLexicon, FrameworkDefinition, PersonaDefinition};

    fn registry() -> Registry {
        Registry::new(
            vec![PersonaDefinition::new("fb", "Fallback")],
            vec![
                FrameworkDefinition::new("okrs", "OKRs"),
                FrameworkDefinition::new("team_topologies", "Team Topologies").with_specificity(0.8),
                FrameworkDefinition::new("wardley", "Wardley Mapping").with_specificity(0.8),
            ],
            "fb",
            DomainLexicon::new(),
        )
        .unwrap()
    }

    fn fw(id: &str, c: f64) -> CandidateScore {
        CandidateScore {
            confidence: c,
            ..CandidateScore::zero(CandidateId::Framework(id.into()))
        }
    }

    #[test]
    fn test_multiple_frameworks_ordered_by_confidence() {
        let scores = vec![fw("okrs", 0.65), fw("team_topologies", 0.91), fw("wardley", 0.3)];
        let active = select_frameworks(&scores, &registry(), &Thresholds::default());
        let ids: Vec<&str> = active.iter().map(|f| f.as_str()).collect();
        assert_eq!(ids, vec!["team_topologies", "okrs"]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let scores = vec![fw("okrs", 0.6)];
        assert_eq!(select_frameworks(&scores, &registry(), &Thresholds::default()).len(), 1);
    }

    #[test]
    fn test_equal_confidence_uses_specificity_then_id() {
        let scores = vec![fw("wardley", 0.7), fw("okrs", 0.7), fw("team_topologies", 0.7)];
        let active = select_frameworks(&scores, &registry(), &Thresholds::default());
        let ids: Vec<&str> = active.iter().map(|f| f.as_str()).collect();
        assert_eq!(ids, vec!["team_topologies", "wardley", "okrs"]);
    }

    #[test]
    fn test_persona_scores_are_ignored() {
        let scores = vec![CandidateScore {
            confidence: 1.0,
            ..CandidateScore::zero(CandidateId::Persona("fb".into()))
        }];
        assert!(select_frameworks(&scores, &registry(), &Thresholds::default()).is_empty());
    }
}
