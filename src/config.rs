//! Router configuration.
//!
//! Every numeric knob of the pipeline lives here so that a given
//! configuration always reproduces the same decisions. Values can be built
//! in code (`RouterConfig::default()` plus struct update syntax) or loaded
//! from YAML:
//!
//! ```yaml
//! weights:
//!   keyword: 0.7
//!   domain: 0.3
//!   explicit: 0.5
//! thresholds:
//!   framework_activation: 0.6
//!   persona_primary: 0.8
//!   persona_contextual: 0.6
//!   switch_margin: 0.15
//!   max_contextual: 3
//! alias_credit: 0.8
//! history_retention: 50
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scoring::ScoringWeights;
use crate::selection::Thresholds;

/// Top-level configuration for [`crate::router::ActivationRouter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Weights of the confidence formula.
    #[serde(default)]
    pub weights: ScoringWeights,
    /// Activation thresholds and continuity margin.
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Credit granted when a pattern matches through one of its aliases
    /// rather than its canonical phrase (0.0 - 1.0).
    #[serde(default = "default_alias_credit")]
    pub alias_credit: f64,
    /// Maximum activation history entries kept per session.
    #[serde(default = "default_history_retention")]
    pub history_retention: usize,
    /// Maximum records kept by the in-memory transparency log.
    #[serde(default = "default_record_retention")]
    pub record_retention: usize,
}

fn default_alias_credit() -> f64 { 0.8 }
fn default_history_retention() -> usize { 50 }
fn default_record_retention() -> usize { 10_000 }

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            thresholds: Thresholds::default(),
            alias_credit: default_alias_credit(),
            history_retention: default_history_retention(),
            record_retention: default_record_retention(),
        }
    }
}

impl RouterConfig {
    /// Parse a configuration from a YAML string and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a YAML file on disk and validate it.
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Check that every value lies in its permitted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        for (field, value) in [
            ("weights.keyword", w.keyword),
            ("weights.domain", w.domain),
            ("weights.explicit", w.explicit),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be a finite, non-negative number (got {value})"),
                });
            }
        }

        let t = &self.thresholds;
        for (field, value) in [
            ("thresholds.framework_activation", t.framework_activation),
            ("thresholds.persona_primary", t.persona_primary),
            ("thresholds.persona_contextual", t.persona_contextual),
            ("thresholds.switch_margin", t.switch_margin),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must lie in [0, 1] (got {value})"),
                });
            }
        }
        if t.persona_contextual > t.persona_primary {
            return Err(ConfigError::Invalid {
                field: "thresholds.persona_contextual",
                reason: format!(
                    "must not exceed persona_primary ({} > {})",
                    t.persona_contextual, t.persona_primary
                ),
            });
        }

        if !(self.alias_credit > 0.0 && self.alias_credit <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "alias_credit",
                reason: format!("must lie in (0, 1] (got {})", self.alias_credit),
            });
        }
        if self.history_retention == 0 {
            return Err(ConfigError::Invalid {
                field: "history_retention",
                reason: "must keep at least one entry".to_string(),
            });
        }
        if self.record_retention == 0 {
            return Err(ConfigError::Invalid {
                field: "record_retention",
                reason: "must keep at least one record".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RouterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.thresholds.persona_primary, 0.8);
        assert_eq!(config.thresholds.switch_margin, 0.15);
        assert_eq!(config.weights.explicit, 0.5);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config = RouterConfig::from_yaml("thresholds:\n  switch_margin: 0.25\n").unwrap();
        assert_eq!(config.thresholds.switch_margin, 0.25);
        assert_eq!(config.thresholds.framework_activation, 0.6);
        assert_eq!(config.history_retention, 50);
        assert_eq!(config.weights, ScoringWeights::default());
    }

    #[test]
    fn test_rejects_inverted_persona_thresholds() {
        let yaml = "thresholds:\n  persona_primary: 0.5\n  persona_contextual: 0.7\n";
        let err = RouterConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("persona_contextual"));
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut config = RouterConfig::default();
        config.weights.domain = -0.1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "weights.domain", .. })
        ));
    }

    #[test]
    fn test_rejects_zero_retention() {
        let config = RouterConfig { history_retention: 0, ..RouterConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.yaml");
        std::fs::write(&path, "alias_credit: 0.5\n").unwrap();
        let config = RouterConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.alias_credit, 0.5);
    }
}
