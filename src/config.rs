// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Engine-wide defaults, loadable from JSON.
//!
//! ```json
//! { "check_warnings": true, "remove_categories": ["Task"], "parallel_row_threshold": 64 }
//! ```
//!
//! Missing keys keep their defaults.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Used by entry points that take no explicit warning flag.
    pub check_warnings: bool,
    /// Categories dropped from annotations when removal is requested.
    pub remove_categories: Vec<String>,
    /// Row count at which assembly and query evaluation switch to the rayon pool.
    pub parallel_row_threshold: usize,
    pub max_definition_depth: usize,
    /// Similarity (0.0..=1.0) above which unknown tags get a "did you mean" hint.
    pub suggestion_cutoff: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            check_warnings: false,
            remove_categories: vec!["Condition-variable".to_owned(), "Task".to_owned()],
            parallel_row_threshold: 256,
            max_definition_depth: 8,
            suggestion_cutoff: 0.8,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Json(serde_json::Error),
    ZeroDefinitionDepth,
    SuggestionCutoff { value: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid engine config: {err}"),
            Self::ZeroDefinitionDepth => f.write_str("max_definition_depth must be at least 1"),
            Self::SuggestionCutoff { value } => {
                write!(f, "suggestion_cutoff must be within 0.0..=1.0, got {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl EngineConfig {
    /// Parses and validates a JSON config.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config = serde_json::from_str::<Self>(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_definition_depth == 0 {
            return Err(ConfigError::ZeroDefinitionDepth);
        }
        if !(0.0..=1.0).contains(&self.suggestion_cutoff) {
            return Err(ConfigError::SuggestionCutoff {
                value: self.suggestion_cutoff,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{ConfigError, EngineConfig};

    #[test]
    fn missing_keys_keep_defaults() {
        let config = EngineConfig::from_json_str(r#"{"check_warnings": true}"#).expect("config");
        assert!(config.check_warnings);
        assert_eq!(config.remove_categories, vec!["Condition-variable", "Task"]);
        assert_eq!(config.parallel_row_threshold, 256);
        assert_eq!(config.max_definition_depth, 8);
    }

    #[test]
    fn empty_object_is_the_default() {
        assert_eq!(EngineConfig::from_json_str("{}").expect("config"), EngineConfig::default());
    }

    #[rstest]
    #[case(r#"{"max_definition_depth": 0}"#)]
    #[case(r#"{"suggestion_cutoff": 1.5}"#)]
    #[case(r#"{"suggestion_cutoff": -0.1}"#)]
    #[case(r#"{"parallel_row_threshold": "many"}"#)]
    fn rejects_bad_values(#[case] text: &str) {
        assert!(EngineConfig::from_json_str(text).is_err(), "{text}");
    }

    #[test]
    fn json_errors_keep_their_source() {
        let err = EngineConfig::from_json_str("{").expect_err("invalid");
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
