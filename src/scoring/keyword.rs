//! Keyword/domain baseline scorer.

use crate::analysis::ActivationContext;
use crate::error::ScoringError;
use crate::registry::{CandidateDefinition, Registry};

use super::{clamp01, CandidateScore, ScoreFactors, Scorer, ScoringWeights};

/// Deterministic scorer combining pattern hits, domain overlap and explicit
/// mentions with configurable weights.
#[derive(Debug, Clone, Default)]
pub struct KeywordScorer {
    weights: ScoringWeights,
}

impl KeywordScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    fn score_candidate(
        &self,
        candidate: &dyn CandidateDefinition,
        context: &ActivationContext,
    ) -> CandidateScore {
        let id = candidate.candidate_id();

        let total_weight = candidate.total_pattern_weight();
        let keyword = if total_weight > 0.0 {
            let matched: f64 = context
                .hits_for(&id)
                .filter_map(|hit| {
                    candidate
                        .patterns()
                        .get(hit.pattern_index)
                        .map(|p| p.weight * hit.credit)
                })
                .sum();
            clamp01(matched / total_weight)
        } else {
            0.0
        };

        let domains = candidate.domains();
        let domain = if domains.is_empty() {
            0.0
        } else {
            let overlap = domains
                .iter()
                .filter(|d| context.detected_domains.contains(*d))
                .count();
            overlap as f64 / domains.len() as f64
        };

        let explicit_mention = context.is_explicitly_mentioned(&id);
        let explicit_bonus = if explicit_mention { self.weights.explicit } else { 0.0 };

        let confidence = clamp01(
            self.weights.keyword * keyword + self.weights.domain * domain + explicit_bonus,
        );

        CandidateScore {
            candidate: id,
            confidence,
            factors: ScoreFactors {
                keyword,
                domain,
                explicit_bonus,
            },
            explicit_mention,
        }
    }
}

impl Scorer for KeywordScorer {
    fn name(&self) -> &str {
        "keyword"
    }

    fn score(
        &self,
        context: &ActivationContext,
        registry: &Registry,
    ) -> Result<Vec<CandidateScore>, ScoringError> {
        Ok(registry
            .candidates()
            .map(|c| self.score_candidate(c, context))
            .collect())
    }
}
