//! Server configuration
//!
//! Loaded from YAML. Relative file paths are resolved against the directory
//! of the configuration file.

use anyhow::Context;
use gnmi_lite_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration path
pub const DEFAULT_CONFIG_PATH: &str = "config/gnmi-lite.yaml";

/// Environment variable selecting the configuration path
pub const CONFIG_ENV: &str = "GNMI_LITE_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// JSON document holding model identities, schema and enums
    pub model_path: PathBuf,
    /// Optional JSON (IETF or internal) configuration loaded at startup
    #[serde(default)]
    pub initial_config: Option<PathBuf>,
    /// Filter used when RUST_LOG is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_log_filter() -> String {
    "gnmi_lite_server=info,gnmi_lite_core=info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("config/mock-model.json"),
            initial_config: None,
            log_filter: default_log_filter(),
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        if let Some(dir) = path.parent() {
            config.resolve_relative_to(dir);
        }
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: ServerConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    fn resolve_relative_to(&mut self, dir: &Path) {
        if self.model_path.is_relative() {
            self.model_path = dir.join(&self.model_path);
        }
        if let Some(initial) = self.initial_config.as_mut() {
            if initial.is_relative() {
                *initial = dir.join(&*initial);
            }
        }
    }

    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn initial_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.initial_config = Some(path.into());
        self
    }

    pub fn subscription_buffer(mut self, size: usize) -> Self {
        self.engine = self.engine.subscription_buffer(size);
        self
    }
}
