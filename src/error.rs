//! Error types for the persona router.
//!
//! Only load-time and construction-time failures are errors. Everything that
//! can go wrong during a turn is resolved inside the router and degrades to a
//! fallback decision instead of surfacing here.

use thiserror::Error;

/// Errors raised while building or loading a [`crate::registry::Registry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// YAML parsing failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The registry holds no personas at all.
    #[error("Registry unavailable: no personas loaded")]
    Unavailable,

    /// The designated fallback persona is not in the persona table.
    #[error("Fallback persona not found: {0}")]
    MissingFallback(String),

    /// The document did not name a fallback persona.
    #[error("No fallback persona designated")]
    NoFallbackDesignated,

    /// Two definitions of the same kind share an id.
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    /// A definition failed validation.
    #[error("Invalid definition '{id}': {reason}")]
    Invalid { id: String, reason: String },
}

/// Errors raised while loading or validating a [`crate::config::RouterConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A value is outside its permitted range.
    #[error("Invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors a [`crate::scoring::Scorer`] may report for one turn.
///
/// The router never propagates these; it records them and falls back.
#[derive(Debug, Clone, Error)]
pub enum ScoringError {
    /// The scorer could not produce scores for this context.
    #[error("Scorer '{scorer}' failed: {message}")]
    Failed { scorer: String, message: String },

    /// The scorer panicked while scoring.
    #[error("Scorer '{scorer}' panicked: {message}")]
    Panicked { scorer: String, message: String },
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Errors raised when constructing an [`crate::router::ActivationRouter`].
#[derive(Debug, Error)]
pub enum RouterError {
    /// The registry cannot back a router.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
