//! Module model
//!
//! Holds the mutable per-module runtime state: lifecycle state, the
//! frozen resolution scope while the module is live, and the owned
//! working directory. Lifecycle transitions themselves are driven by the
//! host; a per-module async mutex serializes them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::scope::artifact::{ArtifactSet, ExportIndex};
use crate::scope::resolution::{ResolutionScope, ResolvedOwner};
use crate::traits::{HostError, ModuleActivator, ModuleState};

/// Module identity: (name, version). Names repeat across versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleIdentity {
    pub name: String,
    pub version: String,
}

impl ModuleIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// Parsed module descriptor, as produced by an archive collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub version: String,
    /// Names of plugins this module delegates to, in declaration order
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Exported symbol prefixes. Usually empty: modules share through the
    /// service registry, not through symbol delegation.
    #[serde(default)]
    pub exports: Vec<String>,
    /// Symbols physically present in the module's artifacts
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Resources physically present in the module's artifacts
    #[serde(default)]
    pub resources: Vec<String>,
    /// Module configuration handed to the activation hooks
    #[serde(default)]
    pub config: HashMap<String, String>,
}

/// Shared handle to an installed module
pub type ModuleHandle = Arc<Module>;

/// An installed module
pub struct Module {
    identity: ModuleIdentity,
    instance_id: String,
    dependencies: Vec<String>,
    exports: ExportIndex,
    artifacts: ArtifactSet,
    config: HashMap<String, String>,
    activator: Option<Arc<dyn ModuleActivator>>,
    state: RwLock<ModuleState>,
    scope: RwLock<Option<Arc<ResolutionScope>>>,
    work_dir: RwLock<Option<PathBuf>>,
    /// Serializes lifecycle transitions for this module
    transition: tokio::sync::Mutex<()>,
}

impl Module {
    pub(crate) fn new(
        descriptor: ModuleDescriptor,
        activator: Option<Arc<dyn ModuleActivator>>,
    ) -> Self {
        let identity = ModuleIdentity::new(descriptor.name, descriptor.version);
        let instance_id = format!("{}_{}", identity.name, uuid::Uuid::new_v4());
        Self {
            identity,
            instance_id,
            dependencies: descriptor.dependencies,
            exports: ExportIndex::new(descriptor.exports, Vec::new()),
            artifacts: ArtifactSet::new(descriptor.artifacts, descriptor.resources),
            config: descriptor.config,
            activator,
            state: RwLock::new(ModuleState::Resolved),
            scope: RwLock::new(None),
            work_dir: RwLock::new(None),
            transition: tokio::sync::Mutex::new(()),
        }
    }

    pub fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn version(&self) -> &str {
        &self.identity.version
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
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

    pub fn config(&self) -> &HashMap<String, String> {
        &self.config
    }

    pub fn state(&self) -> ModuleState {
        *self.state.read().expect("module state lock poisoned")
    }

    pub(crate) fn set_state(&self, state: ModuleState) {
        *self.state.write().expect("module state lock poisoned") = state;
    }

    /// The module's frozen resolution scope, present from Starting until
    /// teardown
    pub fn scope(&self) -> Option<Arc<ResolutionScope>> {
        self.scope.read().expect("module scope lock poisoned").clone()
    }

    pub(crate) fn set_scope(&self, scope: Arc<ResolutionScope>) {
        *self.scope.write().expect("module scope lock poisoned") = Some(scope);
    }

    pub(crate) fn clear_scope(&self) {
        *self.scope.write().expect("module scope lock poisoned") = None;
    }

    pub fn work_dir(&self) -> Option<PathBuf> {
        self.work_dir
            .read()
            .expect("module work dir lock poisoned")
            .clone()
    }

    pub(crate) fn set_work_dir(&self, dir: PathBuf) {
        *self.work_dir.write().expect("module work dir lock poisoned") = Some(dir);
    }

    pub(crate) fn take_work_dir(&self) -> Option<PathBuf> {
        self.work_dir
            .write()
            .expect("module work dir lock poisoned")
            .take()
    }

    pub(crate) fn activator(&self) -> Option<&Arc<dyn ModuleActivator>> {
        self.activator.as_ref()
    }

    pub(crate) fn transition_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.transition
    }

    /// Resolve a symbolic name through this module's scope.
    ///
    /// Only a live module resolves; Resolved, Deactivated, and Broken
    /// modules have no scope and report an invalid-state error rather
    /// than a symbol miss.
    pub fn resolve(&self, name: &str) -> Result<ResolvedOwner, HostError> {
        let scope = self.scope().ok_or_else(|| {
            HostError::InvalidState(format!(
                "module {} has no active resolution scope (state: {})",
                self.identity,
                self.state()
            ))
        })?;
        scope
            .resolve(name)
            .ok_or_else(|| HostError::SymbolNotFound(name.to_string()))
    }

    /// Resolve a resource name through this module's scope.
    pub fn resolve_resource(&self, name: &str) -> Result<ResolvedOwner, HostError> {
        let scope = self.scope().ok_or_else(|| {
            HostError::InvalidState(format!(
                "module {} has no active resolution scope (state: {})",
                self.identity,
                self.state()
            ))
        })?;
        scope
            .resolve_resource(name)
            .ok_or_else(|| HostError::SymbolNotFound(name.to_string()))
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("identity", &self.identity)
            .field("state", &self.state())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
