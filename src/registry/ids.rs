//! Typed identifiers for registry entries.
//!
//! Personas and frameworks are never addressed by bare strings inside the
//! router. `CandidateId` is the closed set of things that can be scored and
//! selected, and every consumer matches on it exhaustively.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a [`super::PersonaDefinition`].
    PersonaId
);

string_id!(
    /// Identifier of a [`super::FrameworkDefinition`].
    FrameworkId
);

/// Which table a candidate comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Persona,
    Framework,
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persona => write!(f, "persona"),
            Self::Framework => write!(f, "framework"),
        }
    }
}

/// A scorable, selectable registry entry.
///
/// Ordering puts every persona before every framework, then orders by id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CandidateId {
    Persona(PersonaId),
    Framework(FrameworkId),
}

impl CandidateId {
    /// The table this candidate belongs to.
    pub fn kind(&self) -> CandidateKind {
        match self {
            Self::Persona(_) => CandidateKind::Persona,
            Self::Framework(_) => CandidateKind::Framework,
        }
    }

    /// The raw id, without its kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Persona(id) => id.as_str(),
            Self::Framework(id) => id.as_str(),
        }
    }

    pub fn as_persona(&self) -> Option<&PersonaId> {
        match self {
            Self::Persona(id) => Some(id),
            Self::Framework(_) => None,
        }
    }

    pub fn as_framework(&self) -> Option<&FrameworkId> {
        match self {
            Self::Persona(_) => None,
            Self::Framework(id) => Some(id),
        }
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.as_str())
    }
}

impl From<PersonaId> for CandidateId {
    fn from(id: PersonaId) -> Self {
        Self::Persona(id)
    }
}

impl From<FrameworkId> for CandidateId {
    fn from(id: FrameworkId) -> Self {
        Self::Framework(id)
    }
}
