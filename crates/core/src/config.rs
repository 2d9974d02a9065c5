//! Generator configuration, loaded from TOML.
//!
//! ```toml
//! default_scope = "common"
//! binary_type = "Blob"
//! validate_responses = true
//! created_shortcut = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Knobs for a compilation run. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Module name of the default scope.
    pub default_scope: String,
    /// TypeScript name of the injectable binary type.
    pub binary_type: String,
    /// Add the dispatch validator and the `Validate` pipeline step.
    pub validate_responses: bool,
    /// Collapse a {200, 201} success pair into `{ created, <field> }`.
    pub created_shortcut: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            default_scope: "common".to_string(),
            binary_type: "Blob".to_string(),
            validate_responses: true,
            created_shortcut: true,
        }
    }
}

/// Failure to read or parse a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl GeneratorConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Read configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        assert_eq!(
            GeneratorConfig::from_toml_str("").unwrap(),
            GeneratorConfig::default()
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "binary_type = \"File\"\nvalidate_responses = false").unwrap();

        let config = GeneratorConfig::load(file.path()).unwrap();
        assert_eq!(config.binary_type, "File");
        assert!(!config.validate_responses);
        assert!(config.created_shortcut);
        assert_eq!(config.default_scope, "common");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = GeneratorConfig::from_toml_str("binary = \"File\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = GeneratorConfig::load(&dir.path().join("schemagen.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("schemagen.toml"));
    }
}
