//! Run configuration, optionally loaded from `modernize.toml`

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ModernizeError, Result};
use crate::version::{FrameworkTag, VersionTag};

/// File looked up at the project root when no explicit path is given
pub const CONFIG_FILE: &str = "modernize.toml";

/// Core modernizer configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModernizeConfig {
    /// Version assumed when the build descriptor cannot be read
    pub default_version: VersionTag,
    /// Force a version instead of reading the build descriptor
    pub version: Option<VersionTag>,
    /// Force a framework set instead of detecting it
    pub frameworks: Option<Vec<FrameworkTag>>,
    /// Rule ids never to run
    pub disabled_rules: Vec<String>,
    /// Directory names skipped while enumerating sources
    pub exclude_dirs: Vec<String>,
    /// Worker threads; the global pool when unset
    pub threads: Option<usize>,
}

impl Default for ModernizeConfig {
    fn default() -> Self {
        Self {
            default_version: VersionTag::LATEST,
            version: None,
            frameworks: None,
            disabled_rules: Vec::new(),
            exclude_dirs: ["target", "build", "out", ".gradle", "node_modules"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            threads: None,
        }
    }
}

impl ModernizeConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ModernizeError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ModernizeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    /// `modernize.toml` under `root` if present, defaults otherwise
    pub fn discover(root: &Path) -> Result<Self> {
        let candidate: PathBuf = root.join(CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_assume_latest() {
        let config = ModernizeConfig::default();
        assert_eq!(config.default_version, VersionTag::LATEST);
        assert!(config.exclude_dirs.contains(&"target".to_string()));
    }

    #[test]
    fn parses_partial_files() {
        let config = ModernizeConfig::from_toml(
            r#"
version = "17"
frameworks = ["spring"]
disabled_rules = ["explicit-type-to-var"]
threads = 2
"#,
        )
        .unwrap();
        assert_eq!(config.version, Some(VersionTag::Java17));
        assert_eq!(config.frameworks, Some(vec![FrameworkTag::Spring]));
        assert_eq!(config.disabled_rules, vec!["explicit-type-to-var".to_string()]);
        assert_eq!(config.threads, Some(2));
        assert_eq!(config.default_version, VersionTag::LATEST);
    }

    #[test]
    fn versions_between_epochs_are_floored() {
        let config = ModernizeConfig::from_toml("version = \"12\"\ndefault_version = \"20\"\n").unwrap();
        assert_eq!(config.version, Some(VersionTag::Java11));
        assert_eq!(config.default_version, VersionTag::Java17);

        let config = ModernizeConfig::from_toml("version = 21\n").unwrap();
        assert_eq!(config.version, Some(VersionTag::Java21));
    }

    #[test]
    fn rejects_unknown_versions() {
        assert!(ModernizeConfig::from_toml("version = \"latest\"").is_err());
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(ModernizeConfig::from_toml("colour = \"blue\"").is_err());
    }

    #[test]
    fn discovery_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ModernizeConfig::discover(dir.path()).unwrap(), ModernizeConfig::default());

        std::fs::write(dir.path().join(CONFIG_FILE), "default_version = \"11\"\n").unwrap();
        let config = ModernizeConfig::discover(dir.path()).unwrap();
        assert_eq!(config.default_version, VersionTag::Java11);
    }
}
