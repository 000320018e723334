//! Persona and framework definitions.
//!
//! Definitions are pure data, deserialized by the [`super::RegistryLoader`]
//! or built in code with the builder methods below, and frozen inside a
//! [`super::Registry`] once validated.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::ids::{CandidateId, FrameworkId, PersonaId};

// ---------------------------------------------------------------------------
// Activation patterns
// ---------------------------------------------------------------------------

/// A keyword or phrase that signals a candidate is relevant.
///
/// `phrase` earns full credit when it occurs in the input. `aliases` are
/// adjacent phrasings of the same idea and earn reduced credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationPattern {
    /// Canonical phrase, matched on whole tokens.
    pub phrase: String,
    /// Relative weight of this pattern within its candidate.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Alternative phrasings.
    #[serde(default)]
    pub aliases: Vec<String>,
}

fn default_weight() -> f64 { 1.0 }

impl ActivationPattern {
    /// Create a pattern with the given weight and no aliases.
    pub fn new(phrase: impl Into<String>, weight: f64) -> Self {
        Self {
            phrase: phrase.into(),
            weight,
            aliases: Vec::new(),
        }
    }

    /// Builder: add alternative phrasings.
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }
}

impl From<&str> for ActivationPattern {
    fn from(phrase: &str) -> Self {
        Self::new(phrase, default_weight())
    }
}

// ---------------------------------------------------------------------------
// Personas
// ---------------------------------------------------------------------------

/// Selection pool a persona belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaTier {
    /// May be chosen as the primary persona on a strong signal.
    Primary,
    /// May accompany the primary persona.
    Contextual,
    /// Used when nothing else qualifies.
    Fallback,
}

/// A domain-specialized response style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaDefinition {
    pub id: PersonaId,
    #[serde(alias = "name")]
    pub display_name: String,
    /// Pools this persona can be selected from.
    #[serde(default)]
    pub tiers: BTreeSet<PersonaTier>,
    /// Domain tags used for domain-overlap scoring.
    #[serde(default)]
    pub domains: BTreeSet<String>,
    /// Enhancement capabilities downstream consumers may request when this
    /// persona is active. Never interpreted by the router.
    #[serde(default)]
    pub enhancement_capabilities: BTreeSet<String>,
    #[serde(default)]
    pub patterns: Vec<ActivationPattern>,
    /// Tie-break preference; higher wins equal-confidence ties.
    #[serde(default)]
    pub specificity: f64,
}

impl PersonaDefinition {
    pub fn new(id: impl Into<PersonaId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            tiers: BTreeSet::new(),
            domains: BTreeSet::new(),
            enhancement_capabilities: BTreeSet::new(),
            patterns: Vec::new(),
            specificity: 0.0,
        }
    }

    /// Builder: add a tier membership.
    pub fn with_tier(mut self, tier: PersonaTier) -> Self {
        self.tiers.insert(tier);
        self
    }

    /// Builder: add domain tags.
    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains.extend(domains.into_iter().map(Into::into));
        self
    }

    /// Builder: add an activation pattern.
    pub fn with_pattern(mut self, pattern: impl Into<ActivationPattern>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Builder: add enhancement capability tags.
    pub fn with_capabilities<I, S>(mut self, caps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enhancement_capabilities.extend(caps.into_iter().map(Into::into));
        self
    }

    /// Builder: set the tie-break specificity.
    pub fn with_specificity(mut self, specificity: f64) -> Self {
        self.specificity = specificity;
        self
    }

    pub fn in_tier(&self, tier: PersonaTier) -> bool {
        self.tiers.contains(&tier)
    }
}

// ---------------------------------------------------------------------------
// Frameworks
// ---------------------------------------------------------------------------

/// A named strategic methodology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkDefinition {
    pub id: FrameworkId,
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(default)]
    pub domains: BTreeSet<String>,
    #[serde(default)]
    pub patterns: Vec<ActivationPattern>,
    /// Tie-break preference; more domain-specific frameworks win ties.
    #[serde(default)]
    pub specificity: f64,
}

impl FrameworkDefinition {
    pub fn new(id: impl Into<FrameworkId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            domains: BTreeSet::new(),
            patterns: Vec::new(),
            specificity: 0.0,
        }
    }

    /// Builder: add domain tags.
    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains.extend(domains.into_iter().map(Into::into));
        self
    }

    /// Builder: add an activation pattern.
    pub fn with_pattern(mut self, pattern: impl Into<ActivationPattern>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Builder: set the tie-break specificity.
    pub fn with_specificity(mut self, specificity: f64) -> Self {
        self.specificity = specificity;
        self
    }
}

// ---------------------------------------------------------------------------
// Shared view
// ---------------------------------------------------------------------------

/// Read-only view shared by persona and framework definitions, so the
/// analyzer and scorer treat both tables uniformly.
pub trait CandidateDefinition {
    fn candidate_id(&self) -> CandidateId;
    fn display_name(&self) -> &str;
    fn patterns(&self) -> &[ActivationPattern];
    fn domains(&self) -> &BTreeSet<String>;
    fn specificity(&self) -> f64;

    /// Sum of all pattern weights: the most keyword evidence can add up to.
    fn total_pattern_weight(&self) -> f64 {
        self.patterns().iter().map(|p| p.weight).sum()
    }
}

impl CandidateDefinition for PersonaDefinition {
    fn candidate_id(&self) -> CandidateId {
        CandidateId::Persona(self.id.clone())
    }
    fn display_name(&self) -> &str {
        &self.display_name
    }
    fn patterns(&self) -> &[ActivationPattern] {
        &self.patterns
    }
    fn domains(&self) -> &BTreeSet<String> {
        &self.domains
    }
    fn specificity(&self) -> f64 {
        self.specificity
    }
}

impl CandidateDefinition for FrameworkDefinition {
    fn candidate_id(&self) -> CandidateId {
        CandidateId::Framework(self.id.clone())
    }
    fn display_name(&self) -> &str {
        &self.display_name
    }
    fn patterns(&self) -> &[ActivationPattern] {
        &self.patterns
    }
    fn domains(&self) -> &BTreeSet<String> {
        &self.domains
    }
    fn specificity(&self) -> f64 {
        self.specificity
    }
}

// ---------------------------------------------------------------------------
// Domain lexicon
// ---------------------------------------------------------------------------

/// Phrases that reveal a domain tag in free text.
///
/// ```yaml
/// domains:
///   engineering_leadership: ["platform teams", "engineering managers"]
///   org_design: ["reorg", "team boundaries"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainLexicon {
    entries: BTreeMap<String, Vec<String>>,
}

impl DomainLexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register phrases for a domain tag.
    pub fn with_domain<I, S>(mut self, tag: impl Into<String>, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(tag, phrases);
        self
    }

    /// Register phrases for a domain tag, extending any existing entry.
    pub fn insert<I, S>(&mut self, tag: impl Into<String>, phrases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .entry(tag.into())
            .or_default()
            .extend(phrases.into_iter().map(Into::into));
    }

    /// Merge another lexicon into this one.
    pub fn merge(&mut self, other: DomainLexicon) {
        for (tag, phrases) in other.entries {
            self.insert(tag, phrases);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
