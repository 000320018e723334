//! # Persona Router
//!
//! Decides, for every conversation turn, which response persona should
//! answer and which methodology frameworks apply, with a confidence value
//! and an auditable record of why.
//!
//! The pipeline is deterministic for a given registry, configuration and
//! session history: analysis and scoring are pure, selection is rule-based
//! with fixed tie-breaks, and per-session state is serialized by the
//! conversation engine. Every turn yields a decision; there is always a
//! fallback persona.
//!
//! ```no_run
//! use std::sync::Arc;
//! use persona_router::{ActivationRequest, ActivationRouter, RegistryLoader, RouterConfig};
//!
//! let mut loader = RegistryLoader::new();
//! loader.add_directory("registry/")?;
//! let router = ActivationRouter::new(Arc::new(loader.build()?), RouterConfig::default())?;
//!
//! let outcome = router.route(ActivationRequest::new("session-1", "How do we cut cognitive load?"));
//! println!("{} ({:.2})", outcome.result.primary_persona, outcome.result.confidence);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod activation;
pub mod analysis;
pub mod config;
pub mod conversation;
pub mod error;
pub mod registry;
pub mod router;
pub mod scoring;
pub mod selection;
pub mod transparency;

pub use activation::{ActivationRequest, ActivationResult};
pub use analysis::{ActivationContext, ContextAnalyzer, PatternHit};
pub use config::RouterConfig;
pub use conversation::{ConversationState, ConversationStateEngine, SessionPhase};
pub use error::{ConfigError, RegistryError, RouterError, ScoringError};
pub use registry::{
    ActivationPattern, CandidateId, CandidateKind, DomainLexicon, FrameworkDefinition,
    FrameworkId, PersonaDefinition, PersonaId, PersonaTier, Registry, RegistryLoader,
};
pub use router::{ActivationRouter, RouteOutcome};
pub use scoring::{CandidateScore, KeywordScorer, ScoreFactors, Scorer, ScoringWeights};
pub use selection::{ActivationBasis, FallbackReason, Thresholds};
pub use transparency::{TransparencyLog, TransparencyRecord, TransparencySink};
