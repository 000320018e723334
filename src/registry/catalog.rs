//! The validated, immutable registry of personas and frameworks.
//!
//! A `Registry` is built once (in code or through the
//! [`super::RegistryLoader`]) and then shared read-only as `Arc<Registry>`
//! across every session and thread. Construction validates the tables and
//! pre-tokenizes every phrase so turns never re-normalize registry text.

use std::collections::HashMap;

use crate::analysis::normalize::tokenize;
use crate::error::RegistryError;

use super::definition::{
    CandidateDefinition, DomainLexicon, FrameworkDefinition, PersonaDefinition, PersonaTier,
};
use super::ids::{CandidateId, FrameworkId, PersonaId};

/// Token form of one [`super::ActivationPattern`].
#[derive(Debug, Clone)]
pub(crate) struct CompiledPattern {
    pub(crate) phrase: Vec<String>,
    pub(crate) aliases: Vec<Vec<String>>,
}

/// Token forms needed to analyze input against one candidate.
#[derive(Debug, Clone)]
pub(crate) struct CompiledCandidate {
    pub(crate) id: CandidateId,
    /// Id and display name, tokenized: the phrases that count as an
    /// explicit mention.
    pub(crate) mention_forms: Vec<Vec<String>>,
    pub(crate) patterns: Vec<CompiledPattern>,
}

/// Immutable persona and framework tables.
#[derive(Debug, Clone)]
pub struct Registry {
    personas: Vec<PersonaDefinition>,
    frameworks: Vec<FrameworkDefinition>,
    persona_index: HashMap<PersonaId, usize>,
    framework_index: HashMap<FrameworkId, usize>,
    fallback: PersonaId,
    lexicon: DomainLexicon,
    /// Personas first, then frameworks, in table order.
    compiled: Vec<CompiledCandidate>,
    compiled_lexicon: Vec<(String, Vec<Vec<String>>)>,
}

impl Registry {
    /// Validate the tables and build a registry.
    ///
    /// The fallback persona must be present in `personas`; it is added to
    /// the fallback tier if its definition does not already list it.
    pub fn new(
        mut personas: Vec<PersonaDefinition>,
        frameworks: Vec<FrameworkDefinition>,
        fallback: impl Into<PersonaId>,
        lexicon: DomainLexicon,
    ) -> Result<Self, RegistryError> {
        let fallback = fallback.into();
        if personas.is_empty() {
            return Err(RegistryError::Unavailable);
        }

        let mut persona_index = HashMap::with_capacity(personas.len());
        for (i, persona) in personas.iter().enumerate() {
            if persona_index.insert(persona.id.clone(), i).is_some() {
                return Err(RegistryError::DuplicateId {
                    kind: "persona",
                    id: persona.id.to_string(),
                });
            }
        }
        let mut framework_index = HashMap::with_capacity(frameworks.len());
        for (i, framework) in frameworks.iter().enumerate() {
            if framework_index.insert(framework.id.clone(), i).is_some() {
                return Err(RegistryError::DuplicateId {
                    kind: "framework",
                    id: framework.id.to_string(),
                });
            }
        }

        let fallback_idx = *persona_index
            .get(&fallback)
            .ok_or_else(|| RegistryError::MissingFallback(fallback.to_string()))?;
        personas[fallback_idx].tiers.insert(PersonaTier::Fallback);

        let mut compiled = Vec::with_capacity(personas.len() + frameworks.len());
        for persona in &personas {
            compiled.push(compile_candidate(persona)?);
        }
        for framework in &frameworks {
            compiled.push(compile_candidate(framework)?);
        }

        let mut compiled_lexicon = Vec::with_capacity(lexicon.len());
        for (tag, phrases) in lexicon.iter() {
            let tag_tokens = tokenize(tag);
            if tag_tokens.is_empty() {
                return Err(RegistryError::Invalid {
                    id: tag.clone(),
                    reason: "domain tag has no alphanumeric content".to_string(),
                });
            }
            let mut forms = vec![tag_tokens];
            forms.extend(phrases.iter().map(|p| tokenize(p)).filter(|t| !t.is_empty()));
            compiled_lexicon.push((tag.clone(), forms));
        }

        log::debug!(
            "Registry built: {} personas, {} frameworks, {} domains (fallback: {})",
            personas.len(),
            frameworks.len(),
            lexicon.len(),
            fallback,
        );

        Ok(Self {
            personas,
            frameworks,
            persona_index,
            framework_index,
            fallback,
            lexicon,
            compiled,
            compiled_lexicon,
        })
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Personas in table order.
    pub fn personas(&self) -> &[PersonaDefinition] {
        &self.personas
    }

    /// Frameworks in table order.
    pub fn frameworks(&self) -> &[FrameworkDefinition] {
        &self.frameworks
    }

    pub fn persona(&self, id: &PersonaId) -> Option<&PersonaDefinition> {
        self.persona_index.get(id).map(|&i| &self.personas[i])
    }

    pub fn framework(&self, id: &FrameworkId) -> Option<&FrameworkDefinition> {
        self.framework_index.get(id).map(|&i| &self.frameworks[i])
    }

    /// Look up either kind of candidate.
    pub fn candidate(&self, id: &CandidateId) -> Option<&dyn CandidateDefinition> {
        match id {
            CandidateId::Persona(p) => self.persona(p).map(|d| d as &dyn CandidateDefinition),
            CandidateId::Framework(f) => self.framework(f).map(|d| d as &dyn CandidateDefinition),
        }
    }

    pub fn contains(&self, id: &CandidateId) -> bool {
        match id {
            CandidateId::Persona(p) => self.persona_index.contains_key(p),
            CandidateId::Framework(f) => self.framework_index.contains_key(f),
        }
    }

    /// Every candidate, personas first, in table order.
    pub fn candidates(&self) -> impl Iterator<Item = &dyn CandidateDefinition> {
        self.personas
            .iter()
            .map(|p| p as &dyn CandidateDefinition)
            .chain(self.frameworks.iter().map(|f| f as &dyn CandidateDefinition))
    }

    /// Number of personas plus frameworks.
    pub fn candidate_count(&self) -> usize {
        self.personas.len() + self.frameworks.len()
    }

    /// Tie-break specificity of a candidate (0.0 when unknown).
    pub fn specificity_of(&self, id: &CandidateId) -> f64 {
        self.candidate(id).map_or(0.0, |c| c.specificity())
    }

    /// Id of the designated fallback persona.
    pub fn fallback_persona_id(&self) -> &PersonaId {
        &self.fallback
    }

    pub fn fallback_persona(&self) -> &PersonaDefinition {
        // Presence is checked in `new` and the tables never change.
        &self.personas[self.persona_index[&self.fallback]]
    }

    pub fn lexicon(&self) -> &DomainLexicon {
        &self.lexicon
    }

    /// Find a persona whose id or display name equals `hint`, ignoring case
    /// and punctuation.
    pub fn find_persona(&self, hint: &str) -> Option<&PersonaDefinition> {
        let wanted = tokenize(hint);
        if wanted.is_empty() {
            return None;
        }
        self.personas
            .iter()
            .find(|p| tokenize(p.id.as_str()) == wanted || tokenize(&p.display_name) == wanted)
    }

    pub(crate) fn compiled_candidates(&self) -> &[CompiledCandidate] {
        &self.compiled
    }

    pub(crate) fn compiled_lexicon(&self) -> &[(String, Vec<Vec<String>>)] {
        &self.compiled_lexicon
    }
}

fn compile_candidate(def: &dyn CandidateDefinition) -> Result<CompiledCandidate, RegistryError> {
    let id = def.candidate_id();
    let invalid = |reason: String| RegistryError::Invalid {
        id: id.to_string(),
        reason,
    };

    let id_tokens = tokenize(id.as_str());
    if id_tokens.is_empty() {
        return Err(invalid("id has no alphanumeric content".to_string()));
    }
    let name_tokens = tokenize(def.display_name());
    if name_tokens.is_empty() {
        return Err(invalid("display name has no alphanumeric content".to_string()));
    }
    if !def.specificity().is_finite() {
        return Err(invalid("specificity must be finite".to_string()));
    }

    let mut patterns = Vec::with_capacity(def.patterns().len());
    for pattern in def.patterns() {
        if !pattern.weight.is_finite() || pattern.weight <= 0.0 {
            return Err(invalid(format!(
                "pattern '{}' has weight {}; weights must be finite and positive",
                pattern.phrase, pattern.weight,
            )));
        }
        let phrase = tokenize(&pattern.phrase);
        if phrase.is_empty() {
            return Err(invalid("pattern phrase is empty".to_string()));
        }
        let mut aliases = Vec::with_capacity(pattern.aliases.len());
        for alias in &pattern.aliases {
            let tokens = tokenize(alias);
            if tokens.is_empty() {
                return Err(invalid(format!("pattern '{}' has an empty alias", pattern.phrase)));
            }
            aliases.push(tokens);
        }
        patterns.push(CompiledPattern { phrase, aliases });
    }

    let mut mention_forms = vec![id_tokens];
    if !mention_forms.contains(&name_tokens) {
        mention_forms.push(name_tokens);
    }

    Ok(CompiledCandidate {
        id,
        mention_forms,
        patterns,
    })
}
