//! YAML registry loader.
//!
//! Collects persona and framework definitions from one or more YAML
//! documents and builds a validated [`Registry`]. Unlike runtime lookups,
//! load failures are fatal: a registry that does not parse or validate
//! must stop startup.
//!
//! ```yaml
//! fallback_persona: generalist
//! domains:
//!   engineering_leadership: ["platform teams", "engineering managers"]
//! personas:
//!   - id: diego
//!     display_name: Diego
//!     tiers: [primary]
//!     domains: [engineering_leadership]
//!     patterns:
//!       - phrase: engineering leadership
//!         aliases: [platform teams]
//!   - id: generalist
//!     display_name: Generalist
//! frameworks:
//!   - id: team_topologies
//!     display_name: Team Topologies
//!     specificity: 0.8
//!     patterns:
//!       - phrase: cognitive load
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

use super::catalog::Registry;
use super::definition::{DomainLexicon, FrameworkDefinition, PersonaDefinition};
use super::ids::PersonaId;

/// One YAML registry document. Every section is optional so definitions can
/// be split across files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub fallback_persona: Option<PersonaId>,
    #[serde(default)]
    pub domains: DomainLexicon,
    #[serde(default)]
    pub personas: Vec<PersonaDefinition>,
    #[serde(default)]
    pub frameworks: Vec<FrameworkDefinition>,
}

impl RegistryDocument {
    pub fn from_yaml(yaml: &str) -> Result<Self, RegistryError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// Accumulates registry documents and builds the final [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryLoader {
    fallback: Option<PersonaId>,
    lexicon: DomainLexicon,
    personas: Vec<PersonaDefinition>,
    frameworks: Vec<FrameworkDefinition>,
    /// Sources merged so far, for diagnostics.
    sources: Vec<String>,
}

impl RegistryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a parsed document.
    pub fn add_document(&mut self, doc: RegistryDocument, source: &str) -> Result<(), RegistryError> {
        if let Some(fallback) = doc.fallback_persona {
            if let Some(existing) = &self.fallback {
                if *existing != fallback {
                    return Err(RegistryError::Invalid {
                        id: fallback.to_string(),
                        reason: format!(
                            "{} designates fallback persona '{}' but '{}' was already designated",
                            source, fallback, existing,
                        ),
                    });
                }
            }
            self.fallback = Some(fallback);
        }
        self.lexicon.merge(doc.domains);
        log::debug!(
            "Loaded registry document {}: {} personas, {} frameworks",
            source,
            doc.personas.len(),
            doc.frameworks.len(),
        );
        self.personas.extend(doc.personas);
        self.frameworks.extend(doc.frameworks);
        self.sources.push(source.to_string());
        Ok(())
    }

    /// Parse and merge a YAML string.
    pub fn add_yaml(&mut self, yaml: &str) -> Result<(), RegistryError> {
        let doc = RegistryDocument::from_yaml(yaml)?;
        let source = format!("<inline #{}>", self.sources.len());
        self.add_document(doc, &source)
    }

    /// Parse and merge a YAML file.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<(), RegistryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let doc = RegistryDocument::from_yaml(&content)?;
        self.add_document(doc, &path.display().to_string())
    }

    /// Merge every `*.yaml` / `*.yml` file under `dir`, recursively.
    ///
    /// Files are visited in sorted path order so the resulting table order
    /// (and therefore scoring order) is reproducible. Returns the number of
    /// files loaded.
    pub fn add_directory(&mut self, dir: impl AsRef<Path>) -> Result<usize, RegistryError> {
        let mut files = Vec::new();
        collect_yaml_files(dir.as_ref(), &mut files)?;
        files.sort();
        for file in &files {
            self.add_file(file)?;
        }
        Ok(files.len())
    }

    /// Sources merged so far.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Validate everything merged so far and freeze it into a [`Registry`].
    pub fn build(self) -> Result<Registry, RegistryError> {
        let fallback = self.fallback.ok_or(RegistryError::NoFallbackDesignated)?;
        let registry = Registry::new(self.personas, self.frameworks, fallback, self.lexicon)?;
        log::info!(
            "Registry loaded from {} source(s): {} candidates",
            self.sources.len(),
            registry.candidate_count(),
        );
        Ok(registry)
    }
}

fn collect_yaml_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RegistryError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_yaml_files(&path, out)?;
        } else if path
            .extension()
            .map_or(false, |ext| ext == "yaml" || ext == "yml")
        {
            out.push(path);
        }
    }
    Ok(())
}
