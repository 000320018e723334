//! Context Analyzer: turns raw input text into a deterministic feature set.
//!
//! The analyzer is registry-driven and stateless: for a given registry and
//! input it always produces the same [`ActivationContext`] (apart from the
//! wall-clock timestamp). It performs whole-token phrase matching only; no
//! statistical or semantic processing happens here.
//!
//! For every pattern of every candidate it records a [`PatternHit`] when the
//! canonical phrase (full credit) or one of its aliases (reduced credit)
//! occurs. It also flags explicit mentions of candidate ids or display
//! names, and detects domain tags through the registry's lexicon.
//!
//! Empty or whitespace-only input is not an error: it yields a context with
//! no hits, which the selection stage resolves through fallback.

pub mod normalize;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RouterConfig;
use crate::registry::{CandidateId, Registry};

use self::normalize::{count_phrase, normalize};

// ---------------------------------------------------------------------------
// Feature set
// ---------------------------------------------------------------------------

/// One activation pattern that matched the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternHit {
    /// Owner of the pattern.
    pub candidate: CandidateId,
    /// Position of the pattern within its owner's pattern list.
    pub pattern_index: usize,
    /// Normalized form that matched (the phrase or an alias).
    pub matched: String,
    /// Number of occurrences of the matched form.
    pub count: usize,
    /// 1.0 for the canonical phrase, the alias credit for an alias.
    pub credit: f64,
    pub via_alias: bool,
}

/// Ephemeral per-turn analysis of one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationContext {
    pub raw_text: String,
    pub session_id: String,
    pub normalized_text: String,
    pub tokens: Vec<String>,
    /// Hits in registry order (personas, then frameworks), then pattern order.
    pub keyword_hits: Vec<PatternHit>,
    /// Candidates the input names directly.
    pub explicit_mentions: BTreeSet<CandidateId>,
    /// Domain tags detected through the registry lexicon.
    pub detected_domains: BTreeSet<String>,
    /// A persona hint that matched no persona.
    pub unresolved_hint: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ActivationContext {
    /// True when normalization left nothing to match against.
    pub fn is_empty_input(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Hits belonging to one candidate.
    pub fn hits_for(&self, candidate: &CandidateId) -> impl Iterator<Item = &PatternHit> + '_ {
        let candidate = candidate.clone();
        self.keyword_hits.iter().filter(move |h| h.candidate == candidate)
    }

    /// Match count of one pattern (0 when it did not match).
    pub fn match_count(&self, candidate: &CandidateId, pattern_index: usize) -> usize {
        self.hits_for(candidate)
            .find(|h| h.pattern_index == pattern_index)
            .map_or(0, |h| h.count)
    }

    pub fn is_explicitly_mentioned(&self, candidate: &CandidateId) -> bool {
        self.explicit_mentions.contains(candidate)
    }
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// Produces [`ActivationContext`]s from raw text.
#[derive(Debug, Clone)]
pub struct ContextAnalyzer {
    alias_credit: f64,
}

impl Default for ContextAnalyzer {
    fn default() -> Self {
        Self::from_config(&RouterConfig::default())
    }
}

impl ContextAnalyzer {
    pub fn new(alias_credit: f64) -> Self {
        Self {
            alias_credit: alias_credit.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &RouterConfig) -> Self {
        Self::new(config.alias_credit)
    }

    /// Analyze input with no explicit persona hint.
    pub fn analyze(&self, raw_text: &str, session_id: &str, registry: &Registry) -> ActivationContext {
        self.analyze_with_hint(raw_text, session_id, None, registry)
    }

    /// Analyze input, treating `persona_hint` (if it names a persona) as an
    /// explicit mention of that persona.
    pub fn analyze_with_hint(
        &self,
        raw_text: &str,
        session_id: &str,
        persona_hint: Option<&str>,
        registry: &Registry,
    ) -> ActivationContext {
        let normalized_text = normalize(raw_text);
        let tokens: Vec<String> = normalized_text
            .split(' ')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        let mut keyword_hits = Vec::new();
        let mut explicit_mentions = BTreeSet::new();

        if !tokens.is_empty() {
            for candidate in registry.compiled_candidates() {
                if candidate
                    .mention_forms
                    .iter()
                    .any(|form| count_phrase(&tokens, form) > 0)
                {
                    explicit_mentions.insert(candidate.id.clone());
                }

                for (pattern_index, pattern) in candidate.patterns.iter().enumerate() {
                    let phrase_count = count_phrase(&tokens, &pattern.phrase);
                    if phrase_count > 0 {
                        keyword_hits.push(PatternHit {
                            candidate: candidate.id.clone(),
                            pattern_index,
                            matched: pattern.phrase.join(" "),
                            count: phrase_count,
                            credit: 1.0,
                            via_alias: false,
                        });
                        continue;
                    }

                    // Best alias by count; first alias wins ties.
                    let best_alias = pattern
                        .aliases
                        .iter()
                        .map(|alias| (alias, count_phrase(&tokens, alias)))
                        .filter(|(_, count)| *count > 0)
                        .fold(None::<(&Vec<String>, usize)>, |best, (alias, count)| match best {
                            Some((_, best_count)) if best_count >= count => best,
                            _ => Some((alias, count)),
                        });
                    if let Some((alias, count)) = best_alias {
                        keyword_hits.push(PatternHit {
                            candidate: candidate.id.clone(),
                            pattern_index,
                            matched: alias.join(" "),
                            count,
                            credit: self.alias_credit,
                            via_alias: true,
                        });
                    }
                }
            }
        }

        let mut unresolved_hint = None;
        if let Some(hint) = persona_hint.filter(|h| !h.trim().is_empty()) {
            match registry.find_persona(hint) {
                Some(persona) => {
                    explicit_mentions.insert(CandidateId::Persona(persona.id.clone()));
                }
                None => {
                    log::warn!(
                        "Session {}: persona hint '{}' matches no persona; ignoring it",
                        session_id,
                        hint,
                    );
                    unresolved_hint = Some(hint.to_string());
                }
            }
        }

        let detected_domains: BTreeSet<String> = registry
            .compiled_lexicon()
            .iter()
            .filter(|(_, forms)| forms.iter().any(|form| count_phrase(&tokens, form) > 0))
            .map(|(tag, _)| tag.clone())
            .collect();

        log::debug!(
            "Session {}: analyzed {} tokens -> {} hits, {} mentions, domains {:?}",
            session_id,
            tokens.len(),
            keyword_hits.len(),
            explicit_mentions.len(),
            detected_domains,
        );

        ActivationContext {
            raw_text: raw_text.to_string(),
            session_id: session_id.to_string(),
            normalized_text,
            tokens,
            keyword_hits,
            explicit_mentions,
            detected_domains,
            unresolved_hint,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
