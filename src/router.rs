//! End-to-end routing pipeline.
//!
//! ```text
//! ActivationRequest
//!   │
//!   ▼
//! ContextAnalyzer ──► Scorer ──► sanitize_scores
//!                                     │
//!        ┌────────── session lock (run_turn) ──────────┐
//!        │  select_persona(prior state) + select_frameworks
//!        │  ActivationResult ──► ConversationState::update
//!        │  TransparencyRecord ──► sinks
//!        └─────────────────────────────────────────────┘
//!   │
//!   ▼
//! RouteOutcome { result, record }
//! ```
//!
//! A turn never fails. Every per-turn problem (empty input, unknown hint,
//! scorer failure, stale session state) resolves to a valid decision and is
//! noted on the turn's transparency record.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::activation::{ActivationRequest, ActivationResult};
use crate::analysis::{ActivationContext, ContextAnalyzer};
use crate::config::RouterConfig;
use crate::conversation::ConversationStateEngine;
use crate::error::{panic_message, RouterError, ScoringError};
use crate::registry::{Registry, RegistryLoader};
use crate::scoring::{sanitize_scores, zero_scores, CandidateScore, KeywordScorer, Scorer};
use crate::selection::{select_frameworks, select_persona, FallbackReason, PersonaSelection};
use crate::transparency::{TransparencyLog, TransparencyRecord, TransparencyRecorder, TransparencySink};

/// The decision for one turn together with its attribution record.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    pub result: ActivationResult,
    pub record: TransparencyRecord,
}

/// Routes conversation turns to personas and frameworks.
///
/// `route` takes `&self` and is safe to call from many threads: turns of
/// one session are serialized, turns of different sessions run in
/// parallel.
pub struct ActivationRouter {
    registry: RwLock<Arc<Registry>>,
    config: RouterConfig,
    analyzer: ContextAnalyzer,
    scorer: Box<dyn Scorer>,
    conversations: ConversationStateEngine,
    log: Arc<TransparencyLog>,
    recorder: TransparencyRecorder,
}

impl ActivationRouter {
    /// Build a router with the keyword scorer and an in-memory transparency
    /// log.
    pub fn new(registry: Arc<Registry>, config: RouterConfig) -> Result<Self, RouterError> {
        config.validate()?;
        let log = Arc::new(TransparencyLog::new(config.record_retention));
        let recorder = TransparencyRecorder::new().with_sink(log.clone());

        log::info!(
            "Activation router ready: {} personas, {} frameworks, fallback '{}'",
            registry.personas().len(),
            registry.frameworks().len(),
            registry.fallback_persona_id(),
        );

        Ok(Self {
            analyzer: ContextAnalyzer::from_config(&config),
            scorer: Box::new(KeywordScorer::new(config.weights.clone())),
            conversations: ConversationStateEngine::new(config.history_retention),
            registry: RwLock::new(registry),
            config,
            log,
            recorder,
        })
    }

    /// Load the registry from a YAML file or a directory of YAML files.
    pub fn load(registry_path: impl AsRef<Path>, config: RouterConfig) -> Result<Self, RouterError> {
        let path = registry_path.as_ref();
        let mut loader = RegistryLoader::new();
        if path.is_dir() {
            loader.add_directory(path)?;
        } else {
            loader.add_file(path)?;
        }
        Self::new(Arc::new(loader.build()?), config)
    }

    /// Builder: replace the scorer.
    pub fn with_scorer(mut self, scorer: impl Scorer + 'static) -> Self {
        log::debug!("Using scorer '{}'", scorer.name());
        self.scorer = Box::new(scorer);
        self
    }

    /// Builder: add a transparency sink next to the built-in log.
    pub fn with_sink(mut self, sink: Arc<dyn TransparencySink>) -> Self {
        self.recorder.add_sink(sink);
        self
    }

    /// Snapshot of the current registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.read().clone()
    }

    /// Swap in a new registry, returning the previous one.
    ///
    /// Turns already in flight finish on the registry they started with.
    pub fn reload_registry(&self, registry: Arc<Registry>) -> Arc<Registry> {
        log::info!(
            "Registry reloaded: {} personas, {} frameworks",
            registry.personas().len(),
            registry.frameworks().len(),
        );
        std::mem::replace(&mut *self.registry.write(), registry)
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn conversations(&self) -> &ConversationStateEngine {
        &self.conversations
    }

    pub fn transparency_log(&self) -> &Arc<TransparencyLog> {
        &self.log
    }

    /// Route one turn.
    pub fn route(&self, request: ActivationRequest) -> RouteOutcome {
        let registry = self.registry();
        let context = self.analyzer.analyze_with_hint(
            &request.raw_text,
            &request.session_id,
            request.explicit_persona_hint.as_deref(),
            &registry,
        );
        let thresholds = &self.config.thresholds;

        self.conversations.run_turn(&request.session_id, |turn| {
            let prior = turn.current();
            let turn_number = prior.map_or(0, |s| s.turn_count) + 1;

            let mut notes = Vec::new();
            if let Some(hint) = &context.unresolved_hint {
                notes.push(format!("persona hint '{}' matches no persona", hint));
            }
            if let Some(state) = prior {
                for framework in &state.active_frameworks {
                    if registry.framework(framework).is_none() {
                        notes.push(format!("stale framework reference {}", framework));
                    }
                }
            }

            let (scores, selection) = match self.score(&context, &registry) {
                Ok(raw) => {
                    let (scores, repairs) = sanitize_scores(raw, &context, &registry);
                    notes.extend(repairs);
                    let selection = select_persona(&scores, prior, &registry, thresholds);
                    (scores, selection)
                }
                Err(err) => {
                    log::warn!("Session {}: {}; falling back", request.session_id, err);
                    notes.push(err.to_string());
                    (
                        zero_scores(&registry),
                        PersonaSelection::fallback(&registry, FallbackReason::ScorerFailure),
                    )
                }
            };
            if let Some(reason) = selection.fallback_reason {
                notes.push(format!("fallback: {}", reason));
            }

            let active_frameworks = select_frameworks(&scores, &registry, thresholds);
            let switched = prior.map_or(false, |s| s.is_switch_to(&selection.primary));
            let result = ActivationResult {
                fallback_used: selection.is_fallback(),
                primary_persona: selection.primary,
                contextual_personas: selection.contextual,
                active_frameworks,
                confidence: selection.confidence,
                switched,
                basis: selection.basis,
                record_id: TransparencyRecord::id_for(&request.session_id, turn_number),
            };
            log::debug!(
                "Session {} turn {}: {} ({:.3}, {})",
                request.session_id,
                turn_number,
                result.primary_persona,
                result.confidence,
                result.basis,
            );

            let record = TransparencyRecord::new(
                &context,
                turn_number,
                scores,
                result.clone(),
                selection.fallback_reason,
                notes,
            );
            turn.update(result.clone());
            self.recorder.emit(&record);

            RouteOutcome { result, record }
        })
    }
}

impl ActivationRouter {
    /// Run the scorer, turning a panic into a [`ScoringError`].
    fn score(
        &self,
        context: &ActivationContext,
        registry: &Registry,
    ) -> Result<Vec<CandidateScore>, ScoringError> {
        catch_unwind(AssertUnwindSafe(|| self.scorer.score(context, registry))).unwrap_or_else(
            |payload| {
                Err(ScoringError::Panicked {
                    scorer: self.scorer.name().to_string(),
                    message: panic_message(payload.as_ref()),
                })
            },
        )
    }
}

impl std::fmt::Debug for ActivationRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationRouter")
            .field("scorer", &self.scorer.name())
            .field("sessions", &self.conversations.session_count())
            .field("records", &self.log.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{
        ActivationPattern, CandidateId, DomainLexicon, FrameworkDefinition, FrameworkId,
        PersonaDefinition, PersonaTier,
    };
    use crate::selection::ActivationBasis;

    fn registry() -> Registry {
        Registry::new(
            vec![
                PersonaDefinition::new("diego", "Diego")
                    .with_tier(PersonaTier::Primary)
                    .with_tier(PersonaTier::Contextual)
                    .with_domains(["engineering_leadership"])
                    .with_pattern(
                        ActivationPattern::new("engineering leadership", 1.0)
                            .with_aliases(["platform teams"]),
                    )
                    .with_pattern(ActivationPattern::new("org design", 1.0).with_aliases(["restructure"])),
                PersonaDefinition::new("rachel", "Rachel")
                    .with_tier(PersonaTier::Primary)
                    .with_tier(PersonaTier::Contextual)
                    .with_domains(["design"])
                    .with_pattern("design system")
                    .with_pattern("user research"),
                PersonaDefinition::new("generalist", "Generalist"),
            ],
            vec![
                FrameworkDefinition::new("team_topologies", "Team Topologies")
                    .with_domains(["engineering_leadership"])
                    .with_specificity(0.8)
                    .with_pattern(ActivationPattern::new("team structure", 1.0).with_aliases(["restructure"]))
                    .with_pattern("cognitive load"),
                FrameworkDefinition::new("okrs", "OKRs")
                    .with_domains(["strategy"])
                    .with_pattern("objectives")
                    .with_pattern("key results"),
            ],
            "generalist",
            DomainLexicon::new()
                .with_domain("engineering_leadership", ["platform teams"])
                .with_domain("strategy", ["objectives"]),
        )
        .unwrap()
    }

    fn router() -> ActivationRouter {
        ActivationRouter::new(Arc::new(registry()), RouterConfig::default()).unwrap()
    }

    const SCENARIO: &str = "How should we restructure our platform teams for cognitive load?";

    #[test]
    fn test_platform_teams_scenario() {
        let router = router();
        let out = router.route(ActivationRequest::new("s1", SCENARIO));

        assert_eq!(out.result.primary_persona.as_str(), "diego");
        assert_eq!(out.result.basis, ActivationBasis::Threshold);
        assert!(out.result.confidence > 0.6);
        assert!(!out.result.fallback_used);
        assert!(!out.result.switched);
        let frameworks: Vec<&str> = out.result.active_frameworks.iter().map(|f| f.as_str()).collect();
        assert_eq!(frameworks, vec!["team_topologies"]);

        let tt = out
            .record
            .score_of(&CandidateId::Framework("team_topologies".into()))
            .unwrap();
        assert!(tt.confidence > 0.6);
        assert!((tt.factors.keyword - 0.9).abs() < 1e-9);
        let diego = out.record.score_of(&CandidateId::Persona("diego".into())).unwrap();
        assert!((diego.confidence - 0.86).abs() < 1e-9);
        assert!(out.record.detected_domains.contains("engineering_leadership"));
    }

    #[test]
    fn test_empty_input_on_new_session_falls_back() {
        let router = router();
        let out = router.route(ActivationRequest::new("s1", "   "));
        assert_eq!(out.result.primary_persona.as_str(), "generalist");
        assert_eq!(out.result.confidence, 0.0);
        assert!(out.result.fallback_used);
        assert!(out.result.active_frameworks.is_empty());
        assert_eq!(out.record.fallback_reason, Some(FallbackReason::NoEligibleCandidate));
        assert_eq!(out.record.scores.len(), 5);
    }

    #[test]
    fn test_display_name_is_explicit_override() {
        let router = router();
        let out = router.route(ActivationRequest::new(
            "s1",
            "Rachel, how do we restructure our platform teams?",
        ));
        assert_eq!(out.result.primary_persona.as_str(), "rachel");
        assert_eq!(out.result.basis, ActivationBasis::ExplicitMention);
        let rachel = out.record.score_of(&CandidateId::Persona("rachel".into())).unwrap();
        assert!(rachel.explicit_mention);
        assert_eq!(rachel.factors.explicit_bonus, 0.5);
        assert_eq!(out.result.confidence, rachel.confidence);
    }

    #[test]
    fn test_persona_hint() {
        let router = router();
        let out = router.route(ActivationRequest::new("s1", SCENARIO).with_persona_hint("rachel"));
        assert_eq!(out.result.primary_persona.as_str(), "rachel");

        let out = router.route(ActivationRequest::new("s2", SCENARIO).with_persona_hint("nobody"));
        assert_eq!(out.result.primary_persona.as_str(), "diego");
        assert!(out.record.notes.iter().any(|n| n.contains("nobody")));
    }

    #[test]
    fn test_continuity_and_switch_across_turns() {
        let router = router();
        let first = router.route(ActivationRequest::new("s1", SCENARIO));
        assert_eq!(first.result.primary_persona.as_str(), "diego");

        let second = router.route(ActivationRequest::new("s1", "and what about cognitive load?"));
        assert_eq!(second.result.primary_persona.as_str(), "diego");
        assert_eq!(second.result.basis, ActivationBasis::Continuity);
        assert_eq!(second.result.confidence, first.result.confidence);
        assert!(!second.result.switched);
        assert_eq!(second.record.turn, 2);

        let third = router.route(ActivationRequest::new("s1", "Rachel, thoughts?"));
        assert_eq!(third.result.primary_persona.as_str(), "rachel");
        assert!(third.result.switched);

        let state = router.conversations().get_current("s1").unwrap();
        assert_eq!(state.turn_count, 3);
        assert!(state.last_switch_at.is_some());
        assert_eq!(state.history.len(), 3);
    }

    #[test]
    fn test_multi_framework_activation() {
        let router = router();
        let out = router.route(ActivationRequest::new(
            "s1",
            "Set objectives while we restructure platform teams around cognitive load",
        ));
        let frameworks: Vec<&str> = out.result.active_frameworks.iter().map(|f| f.as_str()).collect();
        assert_eq!(frameworks, vec!["team_topologies", "okrs"]);
    }

    #[test]
    fn test_routing_is_deterministic() {
        let a = router();
        let b = router();
        let inputs = [SCENARIO, "", "Rachel?", "design system objectives", "cognitive load"];
        for text in inputs {
            let ra = a.route(ActivationRequest::new("s", text));
            let rb = b.route(ActivationRequest::new("s", text));
            assert_eq!(ra.result, rb.result, "diverged on {text:?}");
            assert_eq!(ra.record.scores, rb.record.scores);
        }
    }

    #[test]
    fn test_one_record_per_turn_covering_every_candidate() {
        let router = router();
        for text in [SCENARIO, "", "Rachel", "objectives"] {
            router.route(ActivationRequest::new("s1", text));
        }
        let records = router.transparency_log().records_for_session("s1");
        assert_eq!(records.len(), 4);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.turn, i as u64 + 1);
            assert_eq!(record.scores.len(), router.registry().candidate_count());
            assert_eq!(record.record_id, record.result.record_id);
        }
    }

    #[test]
    fn test_reload_makes_state_stale() {
        let router = router();
        router.route(ActivationRequest::new("s1", SCENARIO));

        let reduced = Registry::new(
            vec![PersonaDefinition::new("generalist", "Generalist")],
            vec![FrameworkDefinition::new("okrs", "OKRs")],
            "generalist",
            DomainLexicon::new(),
        )
        .unwrap();
        let previous = router.reload_registry(Arc::new(reduced));
        assert_eq!(previous.personas().len(), 3);

        let out = router.route(ActivationRequest::new("s1", "anything"));
        assert_eq!(out.result.primary_persona.as_str(), "generalist");
        assert!(out.result.fallback_used);
        assert_eq!(out.record.fallback_reason, Some(FallbackReason::StaleStateReference));
        assert!(out.record.notes.iter().any(|n| n.contains("team_topologies")));
        assert_eq!(out.record.scores.len(), 2);
    }

    #[test]
    fn test_reload_without_active_framework_falls_back() {
        let router = router();
        let first = router.route(ActivationRequest::new("s1", SCENARIO));
        assert_eq!(first.result.primary_persona.as_str(), "diego");
        assert_eq!(first.result.active_frameworks, vec![FrameworkId::from("team_topologies")]);

        let full = registry();
        let personas: Vec<PersonaDefinition> = full.personas().to_vec();
        let kept: Vec<FrameworkDefinition> = full
            .frameworks()
            .iter()
            .filter(|f| f.id.as_str() != "team_topologies")
            .cloned()
            .collect();
        let without = Registry::new(personas, kept, "generalist", DomainLexicon::new()).unwrap();
        router.reload_registry(Arc::new(without));

        let second = router.route(ActivationRequest::new("s1", SCENARIO));
        assert_eq!(second.result.primary_persona.as_str(), "generalist");
        assert!(second.result.fallback_used);
        assert_eq!(second.record.fallback_reason, Some(FallbackReason::StaleStateReference));

        // The fallback turn cleared the stale reference.
        let third = router.route(ActivationRequest::new("s1", SCENARIO));
        assert_ne!(third.record.fallback_reason, Some(FallbackReason::StaleStateReference));
    }

    #[test]
    fn test_explicit_mention_overrides_stale_framework() {
        let router = router();
        router.route(ActivationRequest::new("s1", SCENARIO));
        let full = registry();
        let without = Registry::new(
            full.personas().to_vec(),
            vec![FrameworkDefinition::new("okrs", "OKRs")],
            "generalist",
            DomainLexicon::new(),
        )
        .unwrap();
        router.reload_registry(Arc::new(without));

        let out = router.route(ActivationRequest::new("s1", "Diego, any thoughts?"));
        assert_eq!(out.result.primary_persona.as_str(), "diego");
        assert_eq!(out.result.basis, ActivationBasis::ExplicitMention);
    }

    /// Scores every candidate from keyword hits alone and never sets the
    /// explicit mention flag.
    struct HitCountScorer;

    impl Scorer for HitCountScorer {
        fn name(&self) -> &str {
            "hit_count"
        }

        fn score(&self, context: &ActivationContext, registry: &Registry) -> Result<Vec<CandidateScore>, ScoringError> {
            Ok(registry
                .candidates()
                .map(|c| {
                    let id = c.candidate_id();
                    let hits = context.hits_for(&id).count() as f64;
                    CandidateScore {
                        confidence: (hits * 0.45).min(1.0),
                        ..CandidateScore::zero(id)
                    }
                })
                .collect())
        }
    }

    #[test]
    fn test_explicit_mention_survives_substitute_scorer() {
        let router = router().with_scorer(HitCountScorer);
        let baseline = router.route(ActivationRequest::new("s0", "org design for platform teams"));
        assert_eq!(baseline.result.primary_persona.as_str(), "diego");

        let out = router.route(ActivationRequest::new("s1", "Rachel, what about org design?"));
        assert_eq!(out.result.primary_persona.as_str(), "rachel");
        assert_eq!(out.result.basis, ActivationBasis::ExplicitMention);

        let hinted = router.route(
            ActivationRequest::new("s2", "org design for platform teams").with_persona_hint("rachel"),
        );
        assert_eq!(hinted.result.primary_persona.as_str(), "rachel");
        assert_eq!(hinted.result.basis, ActivationBasis::ExplicitMention);
    }

    struct PanickingScorer;

    impl Scorer for PanickingScorer {
        fn name(&self) -> &str {
            "panicking"
        }

        fn score(&self, _: &ActivationContext, _: &Registry) -> Result<Vec<CandidateScore>, ScoringError> {
            panic!("index out of bounds");
        }
    }

    #[test]
    fn test_scorer_panic_degrades_to_fallback() {
        let router = router().with_scorer(PanickingScorer);
        let out = router.route(ActivationRequest::new("s1", SCENARIO));
        assert!(out.result.fallback_used);
        assert_eq!(out.record.fallback_reason, Some(FallbackReason::ScorerFailure));
        assert!(out.record.notes.iter().any(|n| n.contains("index out of bounds")));
        assert_eq!(router.transparency_log().len(), 1);
        assert_eq!(router.conversations().get_current("s1").unwrap().turn_count, 1);
    }

    struct FailingScorer;

    impl Scorer for FailingScorer {
        fn name(&self) -> &str {
            "failing"
        }

        fn score(&self, _: &ActivationContext, _: &Registry) -> Result<Vec<CandidateScore>, ScoringError> {
            Err(ScoringError::Failed {
                scorer: "failing".to_string(),
                message: "model offline".to_string(),
            })
        }
    }

    #[test]
    fn test_scorer_failure_degrades_to_fallback() {
        let router = router().with_scorer(FailingScorer);
        let out = router.route(ActivationRequest::new("s1", SCENARIO));
        assert_eq!(out.result.primary_persona.as_str(), "generalist");
        assert!(out.result.fallback_used);
        assert_eq!(out.record.fallback_reason, Some(FallbackReason::ScorerFailure));
        assert!(out.record.scores.iter().all(|s| s.confidence == 0.0));
        assert!(out.record.notes.iter().any(|n| n.contains("model offline")));
    }

    struct SloppyScorer;

    impl Scorer for SloppyScorer {
        fn name(&self) -> &str {
            "sloppy"
        }

        fn score(&self, _: &ActivationContext, _: &Registry) -> Result<Vec<CandidateScore>, ScoringError> {
            Ok(vec![
                CandidateScore {
                    confidence: 3.0,
                    ..CandidateScore::zero(CandidateId::Persona("diego".into()))
                },
                CandidateScore {
                    confidence: 0.9,
                    ..CandidateScore::zero(CandidateId::Persona("ghost".into()))
                },
            ])
        }
    }

    #[test]
    fn test_scorer_output_is_sanitized() {
        let router = router().with_scorer(SloppyScorer);
        let out = router.route(ActivationRequest::new("s1", "hello"));
        assert_eq!(out.result.primary_persona.as_str(), "diego");
        assert_eq!(out.result.confidence, 1.0);
        assert_eq!(out.record.scores.len(), 5);
        assert!(out.record.notes.iter().any(|n| n.contains("ghost")));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = RouterConfig {
            alias_credit: 0.0,
            ..RouterConfig::default()
        };
        assert!(matches!(
            ActivationRouter::new(Arc::new(registry()), config),
            Err(RouterError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("registry.yaml"),
            "fallback_persona: generalist\npersonas:\n  - id: generalist\n    display_name: Generalist\n",
        )
        .unwrap();
        let router = ActivationRouter::load(dir.path(), RouterConfig::default()).unwrap();
        let out = router.route(ActivationRequest::new("s1", "hi"));
        assert_eq!(out.result.primary_persona.as_str(), "generalist");

        let empty = tempfile::tempdir().unwrap();
        assert!(matches!(
            ActivationRouter::load(empty.path(), RouterConfig::default()),
            Err(RouterError::Registry(_))
        ));
    }

    #[test]
    fn test_concurrent_sessions_keep_turn_order() {
        let router = router();
        let sessions = ["a", "b", "c", "d"];
        std::thread::scope(|scope| {
            for session in sessions {
                let router = &router;
                scope.spawn(move || {
                    for i in 0..20 {
                        let text = if i % 2 == 0 { SCENARIO } else { "cognitive load" };
                        router.route(ActivationRequest::new(session, text));
                    }
                });
            }
        });
        assert_eq!(router.conversations().session_count(), 4);
        for session in sessions {
            let state = router.conversations().get_current(session).unwrap();
            assert_eq!(state.turn_count, 20);
            assert_eq!(state.primary_persona.as_ref().map(|p| p.as_str()), Some("diego"));
            let turns: Vec<u64> = router
                .transparency_log()
                .records_for_session(session)
                .iter()
                .map(|r| r.turn)
                .collect();
            assert_eq!(turns, (1..=20).collect::<Vec<u64>>());
        }
    }

    #[test]
    fn test_same_session_from_many_threads() {
        let router = router();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..10 {
                        router.route(ActivationRequest::new("shared", SCENARIO));
                    }
                });
            }
        });
        let turns: Vec<u64> = router
            .transparency_log()
            .records_for_session("shared")
            .iter()
            .map(|r| r.turn)
            .collect();
        assert_eq!(turns, (1..=40).collect::<Vec<u64>>());
    }
}
