//! Configuration loading for Pathway.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.pathway/config.toml`)
//! 3. User config (`~/.pathway/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The engine runs with sensible defaults
//! when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::reward::DEFAULT_STREAK_THRESHOLD;
use crate::error::{FailOpen, PathwayError, Result};

/// Main configuration struct for Pathway.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Content catalog location.
    pub content: ContentConfig,
    /// Progression behavior.
    pub progression: ProgressionConfig,
    /// Reward policy.
    pub reward: RewardConfig,
    /// Learner record location.
    pub storage: StorageConfig,
}

/// Content catalog configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContentConfig {
    /// Path to the JSON catalog. Defaults to `.pathway/catalog.json`.
    pub catalog_path: Option<PathBuf>,
}

/// Progression configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Refuse to complete lessons that are still locked. Defaults to true;
    /// set false for a permissive mode that only logs a warning.
    pub enforce_lesson_order: bool,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            enforce_lesson_order: true,
        }
    }
}

/// Reward policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RewardConfig {
    /// Streak length at which the challenge streak bonus is paid.
    pub streak_threshold: u32,
}

/// Minimum valid streak threshold.
pub const MIN_STREAK_THRESHOLD: u32 = 1;

impl RewardConfig {
    /// Check if a streak threshold is valid (must be >= 1).
    ///
    /// A threshold of 0 would pay the bonus on every challenge.
    pub fn is_valid_streak_threshold(value: u32) -> bool {
        value >= MIN_STREAK_THRESHOLD
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            streak_threshold: DEFAULT_STREAK_THRESHOLD,
        }
    }
}

/// Learner record storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the learner record. Defaults to `~/.pathway/record.json`.
    pub record_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration with full precedence chain.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `~/.pathway/config.toml`.
    fn load_user_config() -> Option<Config> {
        let path = pathway_home()?.join("config.toml");
        Self::load_optional(&path, "loading user config")
    }

    /// Load project config from `.pathway/config.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let path = project_dir(cwd).join("config.toml");
        Self::load_optional(&path, "loading project config")
    }

    /// Missing files are skipped; unreadable ones fall back to defaults with a warning.
    fn load_optional(path: &Path, context: &str) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        Some(Self::load_from_file(path).fail_open_default(context))
    }

    /// Load config from a specific file path.
    fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| PathwayError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| PathwayError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // PATHWAY_CATALOG
        if let Ok(val) = env::var("PATHWAY_CATALOG") {
            if val.is_empty() {
                tracing::warn!("PATHWAY_CATALOG is empty, ignoring");
            } else {
                self.content.catalog_path = Some(PathBuf::from(val));
            }
        }

        // PATHWAY_RECORD
        if let Ok(val) = env::var("PATHWAY_RECORD") {
            if val.is_empty() {
                tracing::warn!("PATHWAY_RECORD is empty, ignoring");
            } else {
                self.storage.record_path = Some(PathBuf::from(val));
            }
        }

        // PATHWAY_ENFORCE_LESSON_ORDER
        if let Ok(val) = env::var("PATHWAY_ENFORCE_LESSON_ORDER") {
            self.progression.enforce_lesson_order = val == "true" || val == "1";
        }

        // PATHWAY_STREAK_THRESHOLD
        if let Ok(val) = env::var("PATHWAY_STREAK_THRESHOLD") {
            match val.parse::<u32>() {
                Ok(n) if RewardConfig::is_valid_streak_threshold(n) => {
                    self.reward.streak_threshold = n;
                }
                Ok(n) => tracing::warn!(
                    "Invalid PATHWAY_STREAK_THRESHOLD value '{}'. Must be >= {}. Using '{}'.",
                    n,
                    MIN_STREAK_THRESHOLD,
                    self.reward.streak_threshold
                ),
                Err(_) => tracing::warn!(
                    "Invalid PATHWAY_STREAK_THRESHOLD value '{}'. \
                    Expected a positive integer. Using '{}'.",
                    val,
                    self.reward.streak_threshold
                ),
            }
        }
    }

    /// Merge another config into this one, field by field.
    ///
    /// Non-default values from `other` win. As with any default-based merge,
    /// a higher layer cannot reset a lower layer's value back to the default.
    fn merge(mut self, other: Config) -> Self {
        if other.content.catalog_path.is_some() {
            self.content.catalog_path = other.content.catalog_path;
        }

        if other.progression.enforce_lesson_order
            != ProgressionConfig::default().enforce_lesson_order
        {
            self.progression.enforce_lesson_order = other.progression.enforce_lesson_order;
        }

        if other.reward.streak_threshold != RewardConfig::default().streak_threshold {
            if RewardConfig::is_valid_streak_threshold(other.reward.streak_threshold) {
                self.reward.streak_threshold = other.reward.streak_threshold;
            } else {
                tracing::warn!(
                    "Ignoring invalid reward.streak_threshold {}",
                    other.reward.streak_threshold
                );
            }
        }

        if other.storage.record_path.is_some() {
            self.storage.record_path = other.storage.record_path;
        }

        self
    }

    /// Resolve the catalog path for a working directory.
    pub fn catalog_path(&self, cwd: &Path) -> PathBuf {
        match &self.content.catalog_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => cwd.join(path),
            None => project_dir(cwd).join("catalog.json"),
        }
    }

    /// Resolve the learner record path.
    pub fn record_path(&self) -> Option<PathBuf> {
        self.storage
            .record_path
            .clone()
            .or_else(|| pathway_home().map(|home| home.join("record.json")))
    }
}

/// Get the Pathway home directory.
///
/// Checks `PATHWAY_HOME` first, then falls back to `~/.pathway`.
pub fn pathway_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("PATHWAY_HOME") {
        if home.is_empty() {
            tracing::warn!("PATHWAY_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("PATHWAY_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    dirs::home_dir().map(|home| home.join(".pathway"))
}

/// Project-level Pathway directory (`<cwd>/.pathway`).
pub fn project_dir(cwd: &Path) -> PathBuf {
    cwd.join(".pathway")
}
