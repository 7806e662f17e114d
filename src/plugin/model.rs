//! Plugin model
//!
//! A plugin is immutable after registration: its export surface, artifact
//! set, and priority are fixed at discovery time.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::scope::artifact::{ArtifactSet, ExportIndex};
use crate::traits::PluginActivator;

/// Plugin identity: (name, version)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginIdentity {
    pub name: String,
    pub version: String,
}

impl PluginIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for PluginIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// Parsed plugin descriptor, as produced by an archive collaborator
///
/// This is the wire-independent form the core consumes; the archive layer
/// builds it from `plugin.toml`, embedders may build it programmatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub version: String,
    /// Lower is preferred during delegation ordering and service selection
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
    /// Symbols physically present in the plugin's artifacts
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Resources physically present in the plugin's artifacts
    #[serde(default)]
    pub resources: Vec<String>,
}

fn default_priority() -> i32 {
    100
}

/// A registered plugin
pub struct Plugin {
    identity: PluginIdentity,
    priority: i32,
    dependencies: Vec<String>,
    exports: ExportIndex,
    artifacts: ArtifactSet,
    location: Option<PathBuf>,
    activator: Option<Arc<dyn PluginActivator>>,
}

impl Plugin {
    pub fn new(descriptor: PluginDescriptor) -> Self {
        Self {
            identity: PluginIdentity::new(descriptor.name, descriptor.version),
            priority: descriptor.priority,
            dependencies: descriptor.dependencies,
            exports: ExportIndex::new(descriptor.exports, descriptor.resource_exports),
            artifacts: ArtifactSet::new(descriptor.artifacts, descriptor.resources),
            location: None,
            activator: None,
        }
    }

    /// Attach the on-disk location the plugin was discovered at
    pub fn with_location(mut self, location: PathBuf) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach an activation hook, run once at registration
    pub fn with_activator(mut self, activator: Arc<dyn PluginActivator>) -> Self {
        self.activator = Some(activator);
        self
    }

    pub fn identity(&self) -> &PluginIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn version(&self) -> &str {
        &self.identity.version
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn exports(&self) -> &ExportIndex {
        &self.exports
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    pub fn location(&self) -> Option<&PathBuf> {
        self.location.as_ref()
    }

    pub(crate) fn activator(&self) -> Option<&Arc<dyn PluginActivator>> {
        self.activator.as_ref()
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("identity", &self.identity)
            .field("priority", &self.priority)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
