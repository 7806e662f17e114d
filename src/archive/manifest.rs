//! Manifest parsing and validation
//!
//! Handles parsing plugin.toml / module.toml manifests and validating
//! the identity fields before anything reaches a registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::module::model::ModuleDescriptor;
use crate::plugin::model::PluginDescriptor;
use crate::traits::HostError;

/// Plugin manifest (plugin.toml structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    /// Lower is preferred
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Exported symbol prefixes
    #[serde(default)]
    pub exports: Vec<String>,
    /// Exported resource prefixes
    #[serde(default)]
    pub resource_exports: Vec<String>,
    /// Names of plugins this plugin depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Symbols physically present in the archive
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Resources physically present in the archive
    #[serde(default)]
    pub resources: Vec<String>,
}

fn default_priority() -> i32 {
    100
}

impl PluginManifest {
    /// Load and validate a manifest from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HostError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| HostError::InvalidManifest(format!("failed to read manifest: {}", e)))?;

        let manifest: PluginManifest = toml::from_str(&contents)
            .map_err(|e| HostError::InvalidManifest(format!("failed to parse manifest: {}", e)))?;

        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), HostError> {
        validate_identity(&self.name, &self.version)?;
        for dep in &self.dependencies {
            if !is_valid_name(dep) {
                return Err(HostError::InvalidManifest(format!(
                    "invalid dependency name: {}",
                    dep
                )));
            }
        }
        Ok(())
    }

    pub fn to_descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            name: self.name.clone(),
            version: self.version.clone(),
            priority: self.priority,
            exports: self.exports.clone(),
            resource_exports: self.resource_exports.clone(),
            dependencies: self.dependencies.clone(),
            artifacts: self.artifacts.clone(),
            resources: self.resources.clone(),
        }
    }
}

/// Module manifest (module.toml structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    /// Plugin names this module delegates to, in declaration order
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Exported symbol prefixes; usually empty
    #[serde(default)]
    pub exports: Vec<String>,
    /// Symbols physically present in the archive
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Resources physically present in the archive
    #[serde(default)]
    pub resources: Vec<String>,
    /// Configuration handed to the activation hooks
    #[serde(default)]
    pub config: HashMap<String, String>,
}

impl ModuleManifest {
    /// Load and validate a manifest from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HostError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| HostError::InvalidManifest(format!("failed to read manifest: {}", e)))?;

        let manifest: ModuleManifest = toml::from_str(&contents)
            .map_err(|e| HostError::InvalidManifest(format!("failed to parse manifest: {}", e)))?;

        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), HostError> {
        validate_identity(&self.name, &self.version)?;
        for dep in &self.dependencies {
            if !is_valid_name(dep) {
                return Err(HostError::InvalidManifest(format!(
                    "invalid dependency name: {}",
                    dep
                )));
            }
        }
        Ok(())
    }

    pub fn to_descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            name: self.name.clone(),
            version: self.version.clone(),
            dependencies: self.dependencies.clone(),
            exports: self.exports.clone(),
            artifacts: self.artifacts.clone(),
            resources: self.resources.clone(),
            config: self.config.clone(),
        }
    }
}

fn validate_identity(name: &str, version: &str) -> Result<(), HostError> {
    if !is_valid_name(name) {
        return Err(HostError::InvalidManifest(format!(
            "invalid name: {:?} (must be alphanumeric with dashes/underscores)",
            name
        )));
    }
    if !is_valid_version(version) {
        return Err(HostError::InvalidManifest(format!(
            "invalid version: {:?} (expected semantic versioning)",
            version
        )));
    }
    Ok(())
}

/// Name format: starts alphanumeric; alphanumeric, dash, underscore; max 64
#[inline]
fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 64 {
        return false;
    }
    if !name.chars().next().map_or(false, |c| c.is_alphanumeric()) {
        return false;
    }
    name.chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// Version format: major.minor[.patch][-prerelease][+build]
#[inline]
fn is_valid_version(version: &str) -> bool {
    if version.is_empty() {
        return false;
    }

    let base = version.split('+').next().unwrap_or("");
    let version_part = base.split('-').next().unwrap_or("");

    let nums: Vec<&str> = version_part.split('.').collect();
    if nums.len() < 2 || nums.len() > 3 {
        return false;
    }

    nums.iter()
        .all(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) && n.parse::<u32>().is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_format() {
        assert!(is_valid_name("plugin-a"));
        assert!(is_valid_name("mod_1"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("-leading-dash"));
        assert!(!is_valid_name("has space"));
    }

    #[test]
    fn version_format() {
        assert!(is_valid_version("1.0"));
        assert!(is_valid_version("1.0.0"));
        assert!(is_valid_version("1.2.3-beta+build5"));
        assert!(!is_valid_version("1"));
        assert!(!is_valid_version("1.0.0.0"));
        assert!(!is_valid_version("a.b.c"));
    }

    #[test]
    fn plugin_manifest_parses_with_defaults() {
        let manifest: PluginManifest = toml::from_str(
            r#"
            name = "pluginA"
            version = "1.0.0"
            exports = ["com.acme.api"]
            artifacts = ["com.acme.api.Foo", "com.acme.internal.Bar"]
            "#,
        )
        .unwrap();

        assert_eq!(manifest.priority, 100);
        assert!(manifest.validate().is_ok());

        let descriptor = manifest.to_descriptor();
        assert_eq!(descriptor.exports, vec!["com.acme.api".to_string()]);
    }

    #[test]
    fn module_manifest_rejects_bad_version() {
        let manifest: ModuleManifest = toml::from_str(
            r#"
            name = "m1"
            version = "not-a-version"
            "#,
        )
        .unwrap();

        assert!(matches!(
            manifest.validate(),
            Err(HostError::InvalidManifest(_))
        ));
    }
}
