//! Core traits and interfaces of the module host
//!
//! Defines the lifecycle states, activation hooks, execution contexts,
//! and the error taxonomy shared by all host components.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::module::model::ModuleIdentity;
use crate::plugin::model::PluginIdentity;
use crate::scope::resolution::{ResolutionScope, ResolvedOwner};
use crate::service::registry::{Provider, ServiceRegistration, ServiceRegistry};

/// Module lifecycle state
///
/// States move forward only: a module never returns to an earlier state.
/// Uninstall is legal from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleState {
    /// Descriptor accepted, dependencies declared, not yet started
    Resolved,
    /// Activation hook running
    Starting,
    /// Running; symbols and services are visible
    Activated,
    /// Stopped; scope and working directory released
    Deactivated,
    /// Activation failed; listable for diagnosis, excluded from lookups
    Broken,
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModuleState::Resolved => "resolved",
            ModuleState::Starting => "starting",
            ModuleState::Activated => "activated",
            ModuleState::Deactivated => "deactivated",
            ModuleState::Broken => "broken",
        };
        write!(f, "{}", s)
    }
}

/// Activation hook implemented by module authors
///
/// `on_start` runs while the module is in the Starting state; returning an
/// error leaves the module Broken with its resources released. `on_stop`
/// runs during uninstall and is best-effort: errors are logged, never
/// propagated, so teardown always reaches a resource-clean state.
#[async_trait]
pub trait ModuleActivator: Send + Sync {
    /// Start the module. Services published here become visible once the
    /// module reaches Activated.
    async fn on_start(&self, ctx: &ModuleContext) -> anyhow::Result<()>;

    /// Stop the module (graceful shutdown).
    async fn on_stop(&self, _ctx: &ModuleContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Activation hook implemented by plugin authors
///
/// Runs exactly once, when the plugin is registered. Plugins are never
/// unloaded, so there is no stop counterpart.
#[async_trait]
pub trait PluginActivator: Send + Sync {
    async fn on_start(&self, ctx: &PluginContext) -> anyhow::Result<()>;
}

/// Context handed to a module's activation hooks
///
/// Carries the module's identity, its isolated working directory, its
/// frozen resolution scope, and a handle to the service registry with
/// provider attribution already applied.
#[derive(Clone)]
pub struct ModuleContext {
    identity: ModuleIdentity,
    instance_id: String,
    work_dir: PathBuf,
    config: HashMap<String, String>,
    scope: Arc<ResolutionScope>,
    services: Arc<ServiceRegistry>,
}

impl ModuleContext {
    pub(crate) fn new(
        identity: ModuleIdentity,
        instance_id: String,
        work_dir: PathBuf,
        config: HashMap<String, String>,
        scope: Arc<ResolutionScope>,
        services: Arc<ServiceRegistry>,
    ) -> Self {
        Self {
            identity,
            instance_id,
            work_dir,
            config,
            scope,
            services,
        }
    }

    /// Identity of the module this context belongs to
    pub fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    /// Unique id of this module instance (stable across start/stop of the
    /// same installation, distinct across reinstalls)
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// The module's private working directory
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Get a configuration value
    pub fn get_config(&self, key: &str) -> Option<&String> {
        self.config.get(key)
    }

    /// Get a configuration value with default
    pub fn get_config_or(&self, key: &str, default: &str) -> String {
        self.config
            .get(key)
            .map(|s| s.as_str())
            .unwrap_or(default)
            .to_string()
    }

    /// Resolve a symbolic name through the module's scope.
    ///
    /// Exhausting the scope is an expected outcome and surfaces as
    /// [`HostError::SymbolNotFound`]; the caller decides whether that is
    /// fatal.
    pub fn resolve(&self, name: &str) -> Result<ResolvedOwner, HostError> {
        self.scope
            .resolve(name)
            .ok_or_else(|| HostError::SymbolNotFound(name.to_string()))
    }

    /// Resolve a resource name through the module's scope.
    pub fn resolve_resource(&self, name: &str) -> Result<ResolvedOwner, HostError> {
        self.scope
            .resolve_resource(name)
            .ok_or_else(|| HostError::SymbolNotFound(name.to_string()))
    }

    /// Publish a service implementation attributed to this module.
    pub fn publish_service<T>(
        &self,
        unique_id: &str,
        service: Arc<T>,
        priority: i32,
    ) -> Arc<ServiceRegistration>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services.publish(
            unique_id,
            service,
            Provider::Module(self.identity.clone()),
            priority,
        )
    }

    /// Look up the preferred live implementation of a service type.
    pub fn lookup_service<T>(&self, unique_id: &str) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services.lookup::<T>(Some(unique_id))
    }
}

/// Context handed to a plugin's activation hook
#[derive(Clone)]
pub struct PluginContext {
    identity: PluginIdentity,
    priority: i32,
    services: Arc<ServiceRegistry>,
}

impl PluginContext {
    pub(crate) fn new(
        identity: PluginIdentity,
        priority: i32,
        services: Arc<ServiceRegistry>,
    ) -> Self {
        Self {
            identity,
            priority,
            services,
        }
    }

    /// Identity of the plugin this context belongs to
    pub fn identity(&self) -> &PluginIdentity {
        &self.identity
    }

    /// Publish a service implementation attributed to this plugin, using
    /// the plugin's declared priority.
    pub fn publish_service<T>(&self, unique_id: &str, service: Arc<T>) -> Arc<ServiceRegistration>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services.publish(
            unique_id,
            service,
            Provider::Plugin(self.identity.clone()),
            self.priority,
        )
    }
}

/// Host error taxonomy
#[derive(Debug, Error)]
pub enum HostError {
    #[error("duplicate module: {0} is already installed")]
    DuplicateModule(ModuleIdentity),

    #[error("duplicate plugin: {0} is already registered")]
    DuplicatePlugin(PluginIdentity),

    #[error("unresolved dependency: module {module} requires plugin {dependency}")]
    UnresolvedDependency {
        module: ModuleIdentity,
        dependency: String,
    },

    #[error("activation of module {module} failed: {cause:#}")]
    Activation {
        module: ModuleIdentity,
        cause: Arc<anyhow::Error>,
    },

    #[error("version conflict: {requested} cannot activate while {active} is activated")]
    VersionConflict {
        requested: ModuleIdentity,
        active: ModuleIdentity,
    },

    /// Resolution scope exhausted without a match. Expected and frequent;
    /// callers decide whether it is fatal.
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("module not found: {0}")]
    ModuleNotFound(String),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("deployment stage {stage} failed: {source}")]
    Deploy {
        stage: &'static str,
        #[source]
        source: Box<HostError>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
