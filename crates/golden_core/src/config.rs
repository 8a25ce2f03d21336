//! Configuration for golden image comparison runs

use crate::error::{CompareError, Result};
use crate::scheduler::SchedulerConfig;
use crate::types::LabelColor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Hash algorithm used by the local digest provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Sha256,
    Blake3,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(format!(
                "unknown digest algorithm '{other}' (expected md5, sha256 or blake3)"
            )),
        }
    }
}

/// Name, description and color of one label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSpec {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub color: LabelColor,
}

impl LabelSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, color: LabelColor) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            color,
        }
    }
}

/// Labels the classifier applies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelConfig {
    #[serde(default = "default_unchanged_label")]
    pub unchanged: LabelSpec,
    #[serde(default = "default_changed_label")]
    pub changed: LabelSpec,
    /// Prefix of the per-subject missing label; the subject tree name follows
    #[serde(default = "default_missing_prefix")]
    pub missing_prefix: String,
    #[serde(default = "default_missing_description")]
    pub missing_description: String,
    #[serde(default)]
    pub missing_color: LabelColor,
}

fn default_unchanged_label() -> LabelSpec {
    LabelSpec::new(
        "DI_Good",
        "The file exists on the golden image and wasn't changed.",
        LabelColor::Lime,
    )
}

fn default_changed_label() -> LabelSpec {
    LabelSpec::new(
        "DI_Changed",
        "The file exists on the golden image, but the content was changed.",
        LabelColor::Lime,
    )
}

fn default_missing_prefix() -> String {
    "DI_DELETED_".to_string()
}

fn default_missing_description() -> String {
    "The file exists on the golden image, but not on the dirty image.".to_string()
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            unchanged: default_unchanged_label(),
            changed: default_changed_label(),
            missing_prefix: default_missing_prefix(),
            missing_description: default_missing_description(),
            missing_color: LabelColor::Lime,
        }
    }
}

/// Main configuration for a comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Number of classification worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Interval between progress reports while waiting on the pool
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Hash algorithm for the local digest provider
    #[serde(default)]
    pub digest_algorithm: DigestAlgorithm,

    /// Whether the filesystem host follows symlinks
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Whether the filesystem host lists hidden entries
    #[serde(default = "default_include_hidden")]
    pub include_hidden: bool,

    /// Where the JSON label store lives. Hosts pick their own default when
    /// unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_store_path: Option<PathBuf>,

    #[serde(default)]
    pub labels: LabelConfig,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

fn default_progress_interval_ms() -> u64 {
    2_000
}

fn default_include_hidden() -> bool {
    true
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            progress_interval_ms: default_progress_interval_ms(),
            digest_algorithm: DigestAlgorithm::default(),
            follow_symlinks: false,
            include_hidden: default_include_hidden(),
            label_store_path: None,
            labels: LabelConfig::default(),
        }
    }
}

impl CompareConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CompareConfig =
            toml::from_str(&content).map_err(|e| CompareError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| CompareError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(CompareError::Config("workers must be at least 1".to_string()));
        }
        if self.labels.unchanged.name.is_empty() || self.labels.changed.name.is_empty() {
            return Err(CompareError::Config("label names must not be empty".to_string()));
        }
        if self.labels.unchanged.name == self.labels.changed.name {
            return Err(CompareError::Config(
                "unchanged and changed labels must have different names".to_string(),
            ));
        }
        Ok(())
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            workers: self.workers.max(1),
            progress_interval: Duration::from_millis(self.progress_interval_ms),
        }
    }
}
