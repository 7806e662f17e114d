//! Host configuration
//!
//! Handles configuration loading, defaults, and deployment policy.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::traits::HostError;

/// What to do when activating a module whose name is already activated
/// at a different version (single-version mode only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Refuse the new activation
    #[default]
    Reject,
    /// Deactivate the old version, then activate the new one
    Replace,
}

/// Host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Directory scanned for exploded module/plugin archives
    #[serde(default = "default_deploy_dir")]
    pub deploy_dir: String,

    /// Root for per-module working directories
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Allow several versions of one module name to be Activated at once
    #[serde(default)]
    pub multi_version: bool,

    /// Conflict handling when `multi_version` is off
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,

    /// Plugin names to deploy (empty = all discovered)
    #[serde(default)]
    pub plugin_include: Vec<String>,

    /// Plugin names to skip; evaluated before registration, so an
    /// excluded plugin never becomes a delegation target
    #[serde(default)]
    pub plugin_exclude: Vec<String>,

    /// Per-module configuration overrides, merged over descriptor config
    #[serde(default)]
    pub module_configs: HashMap<String, HashMap<String, String>>,
}

fn default_deploy_dir() -> String {
    "deploy".to_string()
}

fn default_work_dir() -> String {
    "work".to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            deploy_dir: default_deploy_dir(),
            work_dir: default_work_dir(),
            multi_version: false,
            conflict_policy: ConflictPolicy::Reject,
            plugin_include: Vec::new(),
            plugin_exclude: Vec::new(),
            module_configs: HashMap::new(),
        }
    }
}

impl HostConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HostError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&contents)
            .map_err(|e| HostError::InvalidManifest(format!("failed to parse host config: {}", e)))
    }

    /// Whether a discovered plugin passes the include/exclude filters
    pub fn plugin_allowed(&self, name: &str) -> bool {
        if self.plugin_exclude.iter().any(|n| n == name) {
            return false;
        }
        self.plugin_include.is_empty() || self.plugin_include.iter().any(|n| n == name)
    }

    /// Configuration overrides for one module, if any
    pub fn module_config(&self, name: &str) -> Option<&HashMap<String, String>> {
        self.module_configs.get(name)
    }
}
