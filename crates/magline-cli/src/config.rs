//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use magline_mag::{JoinConfig, RequiredLists};
use serde::Deserialize;

/// Global configuration for magline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub join: JoinSection,
    pub workers: WorkersConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JoinSection {
    /// Field-of-study scores must be strictly greater than this
    pub field_of_study_threshold: f64,
    pub journals: bool,
    pub scored_fields: bool,
    pub allow_empty_authors: bool,
    pub allow_empty_references: bool,
    pub allow_empty_fields: bool,
    pub intern_authors: bool,
    pub intern_capacity: usize,
}

impl Default for JoinSection {
    fn default() -> Self {
        let join = JoinConfig::default();
        Self {
            field_of_study_threshold: join.field_of_study_score_threshold,
            journals: join.journals,
            scored_fields: join.scored_fields,
            allow_empty_authors: !join.required.authors,
            allow_empty_references: !join.required.references,
            allow_empty_fields: !join.required.fields,
            intern_authors: join.intern_authors,
            intern_capacity: join.intern_capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// Threads used to index the child files
    pub index: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            index: magline_core::default_workers(),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./magline.toml (current directory)
    /// 2. ~/.config/magline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("magline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "magline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Join settings before command-line overrides.
    pub fn join_config(&self) -> JoinConfig {
        let join = &self.join;
        JoinConfig {
            field_of_study_score_threshold: join.field_of_study_threshold,
            required: RequiredLists {
                authors: !join.allow_empty_authors,
                references: !join.allow_empty_references,
                fields: !join.allow_empty_fields,
            },
            journals: join.journals,
            scored_fields: join.scored_fields,
            index_workers: self.workers.index.max(1),
            intern_authors: join.intern_authors,
            intern_capacity: join.intern_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        let join = config.join_config();
        assert_eq!(join.field_of_study_score_threshold, 0.0);
        assert_eq!(join.required, RequiredLists::default());
        assert!(join.journals);
        assert!(config.workers.index >= 1);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[join]
field_of_study_threshold = 0.4
scored_fields = true
allow_empty_references = true

[workers]
index = 1
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let join = config.join_config();
        assert_eq!(join.field_of_study_score_threshold, 0.4);
        assert!(join.scored_fields);
        assert!(!join.required.references);
        assert!(join.required.authors);
        assert!(join.journals);
        assert_eq!(join.index_workers, 1);
    }

    #[test]
    fn zero_workers_still_runs() {
        let config: Config = toml::from_str("[workers]\nindex = 0\n").unwrap();
        assert_eq!(config.join_config().index_workers, 1);
    }

    #[test]
    fn from_file_reports_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("magline.toml");
        std::fs::write(&path, "[join\n").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("magline.toml"));
    }
}
