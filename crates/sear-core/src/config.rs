//! TOML configuration.
//!
//! The CLI resolves a config file (explicit `--config` path, or the
//! platform config directory), deserializes it into [`Config`] and passes
//! the indexing section on to the database as [`DatabaseOptions`]. Every
//! field has a default so a missing or partial file still works.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SearError};
use crate::types::DatabaseOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the index file lives
    pub database_path: PathBuf,

    /// Default log filter, overridable with `-v`/`-q` or `RUST_LOG`
    pub log_level: String,

    pub indexing: IndexingConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    pub case_sensitive: bool,
    pub skip_common_words: bool,
    pub index_variations: bool,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        let defaults = DatabaseOptions::default();
        IndexingConfig {
            case_sensitive: defaults.case_sensitive,
            skip_common_words: defaults.skip_common_words,
            index_variations: defaults.index_variations,
        }
    }
}

impl IndexingConfig {
    pub fn to_options(self) -> DatabaseOptions {
        DatabaseOptions {
            case_sensitive: self.case_sensitive,
            skip_common_words: self.skip_common_words,
            index_variations: self.index_variations,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: Self::default_database_path(),
            log_level: "info".to_string(),
            indexing: IndexingConfig::default(),
        }
    }
}

impl Config {
    /// Platform config file location (`config.toml` under the project
    /// config directory).
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "sear").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Platform data location of the index file, falling back to the
    /// working directory.
    pub fn default_database_path() -> PathBuf {
        ProjectDirs::from("", "", "sear")
            .map(|dirs| dirs.data_dir().join("index.sear"))
            .unwrap_or_else(|| PathBuf::from("index.sear"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = toml::from_str(&text)
            .map_err(|e| SearError::config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load an explicit config file, or the default location when it
    /// exists, or fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Config::default()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert!(!config.indexing.case_sensitive);
        assert!(!config.indexing.skip_common_words);
        assert!(config.indexing.index_variations);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            database_path = "/tmp/test.sear"

            [indexing]
            skip_common_words = true
            "#,
        )
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/test.sear"));
        assert_eq!(config.log_level, "info");
        assert!(config.indexing.skip_common_words);
        assert!(config.indexing.index_variations);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_level = \"debug\"\n").unwrap();
        let config = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_file_is_a_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_level = [broken\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, SearError::Config { .. }));
    }

    #[test]
    fn test_options_mapping() {
        let indexing = IndexingConfig {
            case_sensitive: true,
            skip_common_words: true,
            index_variations: false,
        };
        let options = indexing.to_options();
        assert!(options.case_sensitive);
        assert!(options.skip_common_words);
        assert!(!options.index_variations);
    }
}
