//! The attribution record emitted for every turn.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::activation::ActivationResult;
use crate::analysis::{ActivationContext, PatternHit};
use crate::registry::CandidateId;
use crate::scoring::{CandidateScore, ScoreFactors};
use crate::selection::{ActivationBasis, FallbackReason};

/// Namespace for deterministic record ids.
const RECORD_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93d7_5b08_a1e4_7c35_d9b2_0f46);

/// Immutable description of one routing decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransparencyRecord {
    pub record_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    /// 1-based turn number within the session.
    pub turn: u64,
    /// One score per registry candidate, personas first.
    pub scores: Vec<CandidateScore>,
    pub result: ActivationResult,
    pub fallback_used: bool,
    pub fallback_reason: Option<FallbackReason>,
    pub basis: ActivationBasis,
    pub keyword_hits: Vec<PatternHit>,
    pub explicit_mentions: BTreeSet<CandidateId>,
    pub detected_domains: BTreeSet<String>,
    /// Repairs and anomalies observed during the turn.
    #[serde(default)]
    pub notes: Vec<String>,
}

impl TransparencyRecord {
    /// Deterministic id of the record for `turn` of `session_id`.
    pub fn id_for(session_id: &str, turn: u64) -> Uuid {
        Uuid::new_v5(&RECORD_NAMESPACE, format!("{}#{}", session_id, turn).as_bytes())
    }

    /// Assemble the record for a finished turn.
    ///
    /// Takes the decision as produced; nothing here feeds back into it.
    pub fn new(
        context: &ActivationContext,
        turn: u64,
        scores: Vec<CandidateScore>,
        result: ActivationResult,
        fallback_reason: Option<FallbackReason>,
        notes: Vec<String>,
    ) -> Self {
        Self {
            record_id: result.record_id,
            timestamp: context.timestamp,
            session_id: context.session_id.clone(),
            turn,
            scores,
            fallback_used: result.fallback_used,
            fallback_reason,
            basis: result.basis,
            keyword_hits: context.keyword_hits.clone(),
            explicit_mentions: context.explicit_mentions.clone(),
            detected_domains: context.detected_domains.clone(),
            notes,
            result,
        }
    }

    pub fn score_of(&self, candidate: &CandidateId) -> Option<&CandidateScore> {
        self.scores.iter().find(|s| s.candidate == *candidate)
    }

    /// Why `preferred` ranked the way it did against `other`.
    ///
    /// Returns `None` if either candidate is absent from the record.
    pub fn explain(&self, preferred: &CandidateId, other: &CandidateId) -> Option<Explanation> {
        let a = self.score_of(preferred)?;
        let b = self.score_of(other)?;

        let delta = ScoreFactors {
            keyword: a.factors.keyword - b.factors.keyword,
            domain: a.factors.domain - b.factors.domain,
            explicit_bonus: a.factors.explicit_bonus - b.factors.explicit_bonus,
        };
        let deciding_factor = if a.explicit_mention != b.explicit_mention {
            "explicit_mention"
        } else if delta.keyword.abs() >= delta.domain.abs() && delta.keyword != 0.0 {
            "keyword"
        } else if delta.domain != 0.0 {
            "domain"
        } else {
            "tie_break"
        };

        let primary = &self.result.primary_persona;
        let summary = format!(
            "{} scored {:.3} vs {:.3} for {} (keyword {:+.3}, domain {:+.3}, explicit {:+.3}); decision basis: {}{}",
            preferred,
            a.confidence,
            b.confidence,
            other,
            delta.keyword,
            delta.domain,
            delta.explicit_bonus,
            self.basis,
            if preferred.as_persona() == Some(primary) {
                " (primary)"
            } else {
                ""
            },
        );

        Some(Explanation {
            preferred: a.clone(),
            other: b.clone(),
            confidence_gap: a.confidence - b.confidence,
            factor_delta: delta,
            deciding_factor: deciding_factor.to_string(),
            summary,
        })
    }
}

/// Side-by-side comparison of two candidates in one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub preferred: CandidateScore,
    pub other: CandidateScore,
    /// `preferred.confidence - other.confidence`.
    pub confidence_gap: f64,
    /// Per-factor difference, preferred minus other.
    pub factor_delta: ScoreFactors,
    /// `explicit_mention`, `keyword`, `domain` or `tie_break`.
    pub deciding_factor: String,
    pub summary: String,
}
