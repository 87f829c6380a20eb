//! Configuration type definitions

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PodsyncResult;
use crate::push::DEFAULT_DESTINATION;

use super::loader::{self, ConfigWarning};

/// Which component this directory belongs to
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ComponentConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub application: Option<String>,

    /// OpenShift project (namespace) the pod runs in
    #[serde(default)]
    pub project: Option<String>,

    /// Watch root, relative to the component directory
    #[serde(default)]
    pub source_path: Option<PathBuf>,
}

/// Watch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Seconds of quiet before pushing
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,

    /// Extra gitignore-style globs
    #[serde(default)]
    pub ignores: Vec<String>,

    /// Ignore file to read instead of `.podsyncignore`
    #[serde(default)]
    pub ignore_file: Option<PathBuf>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
            ignores: Vec::new(),
            ignore_file: None,
        }
    }
}

impl WatchConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

fn default_delay_secs() -> u64 {
    1
}

/// Where and how to push
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub pod: Option<String>,

    #[serde(default)]
    pub container: Option<String>,

    #[serde(default = "default_destination")]
    pub destination: String,

    #[serde(default = "default_oc_binary")]
    pub oc_binary: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            pod: None,
            container: None,
            destination: default_destination(),
            oc_binary: default_oc_binary(),
        }
    }
}

fn default_destination() -> String {
    DEFAULT_DESTINATION.to_string()
}

fn default_oc_binary() -> String {
    "oc".to_string()
}

/// Local component configuration (`.podsync/config.yaml`)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub component: ComponentConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub push: PushConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> PodsyncResult<Self> {
        let (config, _warnings) = loader::load_with_warnings(path)?;
        Ok(config)
    }

    /// Load configuration and collect non-fatal warnings (e.g. unknown keys).
    pub fn load_with_warnings(path: &Path) -> PodsyncResult<(Self, Vec<ConfigWarning>)> {
        loader::load_with_warnings(path)
    }

    /// Load from the component directory, user config, or defaults
    pub fn load_or_default(component_dir: Option<&Path>) -> PodsyncResult<(Self, Vec<ConfigWarning>)> {
        loader::load_or_default(component_dir)
    }
}
