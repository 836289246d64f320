// ABOUTME: Orchestrator configuration types and parsing for layerboot.yml.
// ABOUTME: Handles discovery, path resolution relative to the file, and validation.

mod layer;
mod preflight;
mod secret_source;
mod tool;
mod validation;

pub use layer::{LayerSettingsConfig, RetryConfig};
pub use preflight::{EndpointConfig, PreflightConfig};
pub use secret_source::SecretSource;
pub use tool::{ToolConfig, ToolsConfig};
pub use validation::ValidationConfig;

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "layerboot.yml";
pub const CONFIG_FILENAME_ALT: &str = "layerboot.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".layerboot/config.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_profiles_dir")]
    pub profiles_dir: PathBuf,

    #[serde(default = "default_journal_dir")]
    pub journal_dir: PathBuf,

    #[serde(default)]
    pub preflight: PreflightConfig,

    pub tools: ToolsConfig,

    #[serde(default)]
    pub secrets: HashMap<String, SecretSource>,

    #[serde(default)]
    pub layers: BTreeMap<String, LayerSettingsConfig>,

    #[serde(default)]
    pub validation: ValidationConfig,

    /// Directory the config was loaded from; relative paths and tool
    /// commands resolve against it.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_profiles_dir() -> PathBuf {
    PathBuf::from("customers")
}

fn default_journal_dir() -> PathBuf {
    PathBuf::from(".layerboot/runs")
}

/// Directory that relative paths in the config file at `path` resolve against.
///
/// `.layerboot/config.yml` belongs to the project directory above it. A bare
/// file name resolves against the current directory.
pub fn base_dir(path: &Path) -> &Path {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    if dir.file_name().is_some_and(|n| n == ".layerboot") {
        dir.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
    } else {
        dir
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?;

        Ok(config.relative_to(base_dir(path)))
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Resolve relative paths against `base`.
    pub fn relative_to(mut self, base: &Path) -> Self {
        if self.profiles_dir.is_relative() {
            self.profiles_dir = base.join(&self.profiles_dir);
        }
        if self.journal_dir.is_relative() {
            self.journal_dir = base.join(&self.journal_dir);
        }
        self.secrets = self
            .secrets
            .into_iter()
            .map(|(name, source)| (name, source.relative_to(base)))
            .collect();
        self.base_dir = base.to_path_buf();
        self
    }

    /// Check cross-references the deserializer cannot: secret names used by
    /// tools, layer names used for overrides, and numeric bounds.
    pub fn validate(&self, layer_names: &[&str]) -> Result<()> {
        for (tool, config) in self.tools.iter() {
            for (var, secret) in &config.secrets {
                if !self.secrets.contains_key(secret) {
                    return Err(Error::InvalidConfig(format!(
                        "tools.{tool}.secrets.{var} references undefined secret '{secret}'"
                    )));
                }
            }
        }

        for (name, settings) in &self.layers {
            if !layer_names.contains(&name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "layers.{name}: unknown layer (expected one of: {})",
                    layer_names.join(", ")
                )));
            }
            if let Some(attempts) = settings.retry.as_ref().and_then(|r| r.max_attempts)
                && attempts == 0
            {
                return Err(Error::InvalidConfig(format!(
                    "layers.{name}.retry.max_attempts must be at least 1"
                )));
            }
        }

        if self.validation.max_interval < self.validation.interval {
            return Err(Error::InvalidConfig(
                "validation.max_interval must not be shorter than validation.interval".to_string(),
            ));
        }

        Ok(())
    }
}
