//! # Registry
//!
//! Immutable tables of persona and framework definitions, built once at
//! startup and passed explicitly to every pipeline stage.
//!
//! ## Architecture
//!
//! ```text
//! YAML documents ──► RegistryLoader ──► Registry (validated, tokenized)
//!                                          │
//!                       Arc<Registry> ─────┼──► ContextAnalyzer
//!                                          ├──► Scorer
//!                                          └──► selection
//! ```
//!
//! Every persona and framework is addressed through a typed id
//! ([`PersonaId`], [`FrameworkId`]) or the closed [`CandidateId`] enum.

pub mod catalog;
pub mod definition;
pub mod ids;
pub mod loader;

pub use catalog::Registry;
pub use definition::{
    ActivationPattern, CandidateDefinition, DomainLexicon, FrameworkDefinition,
    PersonaDefinition, PersonaTier,
};
pub use ids::{CandidateId, CandidateKind, FrameworkId, PersonaId};
pub use loader::{RegistryDocument, RegistryLoader};
