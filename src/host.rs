//! Module host
//!
//! Owns one instance of every registry and drives modules through their
//! lifecycle. Each host process constructs exactly one `ModuleHost`;
//! there is no ambient global state - collaborators receive the handles
//! they need explicitly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{ConflictPolicy, HostConfig};
use crate::event::{LifecycleEvent, LifecycleEventBus, LifecycleListener};
use crate::module::model::{Module, ModuleDescriptor, ModuleHandle, ModuleIdentity};
use crate::module::registry::ModuleRegistry;
use crate::pipeline::DeployPipeline;
use crate::plugin::model::{Plugin, PluginDescriptor};
use crate::plugin::registry::PluginRegistry;
use crate::scope::artifact::ArtifactSet;
use crate::scope::resolution::{HostScope, ResolutionScope};
use crate::service::registry::{Provider, ServiceRegistration, ServiceRegistry};
use crate::traits::{
    HostError, ModuleActivator, ModuleContext, ModuleState, PluginActivator, PluginContext,
};

/// The module isolation runtime
pub struct ModuleHost {
    config: HostConfig,
    plugins: Arc<PluginRegistry>,
    modules: Arc<ModuleRegistry>,
    services: Arc<ServiceRegistry>,
    events: Arc<LifecycleEventBus>,
    host_scope: Arc<HostScope>,
    work_root: PathBuf,
}

impl ModuleHost {
    /// Create a host with an empty host scope
    pub fn new(config: HostConfig) -> Result<Self, HostError> {
        Self::with_host_scope(config, ArtifactSet::default())
    }

    /// Create a host whose own artifacts form the terminal resolution
    /// scope
    pub fn with_host_scope(
        config: HostConfig,
        host_artifacts: ArtifactSet,
    ) -> Result<Self, HostError> {
        let work_root = PathBuf::from(&config.work_dir);
        std::fs::create_dir_all(&work_root)?;

        info!(work_dir = %work_root.display(), "module host created");
        Ok(Self {
            config,
            plugins: Arc::new(PluginRegistry::new()),
            modules: Arc::new(ModuleRegistry::new()),
            services: Arc::new(ServiceRegistry::new()),
            events: Arc::new(LifecycleEventBus::new()),
            host_scope: Arc::new(HostScope::new(host_artifacts)),
            work_root,
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn plugins(&self) -> &Arc<PluginRegistry> {
        &self.plugins
    }

    pub fn modules(&self) -> &Arc<ModuleRegistry> {
        &self.modules
    }

    pub fn services(&self) -> &Arc<ServiceRegistry> {
        &self.services
    }

    /// Register a lifecycle listener
    pub fn add_listener(&self, listener: Arc<dyn LifecycleListener>) {
        self.events.add_listener(listener);
    }

    // ---- plugins ----

    /// Register a plugin from a parsed descriptor
    pub async fn register_plugin(
        &self,
        descriptor: PluginDescriptor,
    ) -> Result<Arc<Plugin>, HostError> {
        self.register_plugin_inner(Plugin::new(descriptor)).await
    }

    /// Register a plugin carrying an activation hook
    pub async fn register_plugin_with_activator(
        &self,
        descriptor: PluginDescriptor,
        activator: Arc<dyn PluginActivator>,
    ) -> Result<Arc<Plugin>, HostError> {
        self.register_plugin_inner(Plugin::new(descriptor).with_activator(activator))
            .await
    }

    pub(crate) async fn register_plugin_built(
        &self,
        plugin: Plugin,
    ) -> Result<Arc<Plugin>, HostError> {
        self.register_plugin_inner(plugin).await
    }

    async fn register_plugin_inner(&self, plugin: Plugin) -> Result<Arc<Plugin>, HostError> {
        if self.plugins.contains(plugin.name()) {
            return Err(HostError::DuplicatePlugin(plugin.identity().clone()));
        }

        let plugin = Arc::new(plugin);

        // The activator runs before the plugin becomes visible in the
        // registry; a failed plugin start leaves no trace behind.
        if let Some(activator) = plugin.activator() {
            let ctx = PluginContext::new(
                plugin.identity().clone(),
                plugin.priority(),
                Arc::clone(&self.services),
            );
            if let Err(e) = activator.on_start(&ctx).await {
                let removed = self
                    .services
                    .unpublish_provider(&Provider::Plugin(plugin.identity().clone()));
                error!(
                    plugin = %plugin.identity(),
                    unpublished = removed,
                    error = %format!("{:#}", e),
                    "plugin activation failed"
                );
                return Err(HostError::InvalidState(format!(
                    "plugin {} failed to start: {:#}",
                    plugin.identity(),
                    e
                )));
            }
        }

        if let Err(e) = self.plugins.register(Arc::clone(&plugin)) {
            self.services
                .unpublish_provider(&Provider::Plugin(plugin.identity().clone()));
            return Err(e);
        }
        Ok(plugin)
    }

    // ---- module lifecycle ----

    /// Install a module from a parsed descriptor. The module lands in
    /// Resolved; call [`activate`](Self::activate) to start it.
    pub fn install(&self, descriptor: ModuleDescriptor) -> Result<ModuleHandle, HostError> {
        self.install_inner(descriptor, None)
    }

    /// Install a module carrying activation hooks
    pub fn install_with_activator(
        &self,
        descriptor: ModuleDescriptor,
        activator: Arc<dyn ModuleActivator>,
    ) -> Result<ModuleHandle, HostError> {
        self.install_inner(descriptor, Some(activator))
    }

    fn install_inner(
        &self,
        descriptor: ModuleDescriptor,
        activator: Option<Arc<dyn ModuleActivator>>,
    ) -> Result<ModuleHandle, HostError> {
        let identity = ModuleIdentity::new(descriptor.name.clone(), descriptor.version.clone());

        // Surface missing plugin dependencies to the installer before
        // anything is registered.
        for dep in &descriptor.dependencies {
            if !self.plugins.contains(dep) {
                return Err(HostError::UnresolvedDependency {
                    module: identity,
                    dependency: dep.clone(),
                });
            }
        }

        let module: ModuleHandle = Arc::new(Module::new(descriptor, activator));
        self.modules.register(Arc::clone(&module))?;

        let work_dir = self.work_root.join(module.instance_id());
        if let Err(e) = std::fs::create_dir_all(&work_dir) {
            self.modules.unregister(&module);
            return Err(e.into());
        }
        module.set_work_dir(work_dir);

        info!(module = %identity, "installed module");
        Ok(module)
    }

    /// Activate an installed module: Resolved -> Starting -> Activated,
    /// or Broken if its activation hook fails.
    pub async fn activate(&self, module: &ModuleHandle) -> Result<(), HostError> {
        let _transition = module.transition_lock().lock().await;

        if module.state() != ModuleState::Resolved {
            return Err(HostError::InvalidState(format!(
                "cannot activate module {} from state {}",
                module.identity(),
                module.state()
            )));
        }

        // One activated version per name unless coexistence is enabled.
        if !self.config.multi_version {
            let active = self.modules.activated_by_name(module.name());
            for other in active {
                match self.config.conflict_policy {
                    ConflictPolicy::Reject => {
                        return Err(HostError::VersionConflict {
                            requested: module.identity().clone(),
                            active: other.identity().clone(),
                        });
                    }
                    ConflictPolicy::Replace => {
                        info!(
                            old = %other.identity(),
                            new = %module.identity(),
                            "replacing activated version"
                        );
                        self.uninstall(&other).await?;
                    }
                }
            }
        }

        // Build the scope and context before entering Starting; a missing
        // dependency leaves the module Resolved.
        let scope = Arc::new(self.build_scope(module)?);
        let ctx = self.module_context(module, Arc::clone(&scope))?;
        module.set_scope(scope);
        module.set_state(ModuleState::Starting);

        self.events.publish(&LifecycleEvent::BeforeModuleStart {
            module: module.identity().clone(),
        });
        let started = match module.activator() {
            Some(activator) => activator.on_start(&ctx).await,
            None => Ok(()),
        };

        match started {
            Ok(()) => {
                module.set_state(ModuleState::Activated);
                info!(module = %module.identity(), "module activated");
                self.events.publish(&LifecycleEvent::AfterModuleStarted {
                    module: module.identity().clone(),
                });
                Ok(())
            }
            Err(e) => {
                let cause = Arc::new(e);

                // Release everything the failed start may have acquired
                // before control returns to the caller.
                let removed = self
                    .services
                    .unpublish_provider(&Provider::Module(module.identity().clone()));
                module.clear_scope();
                self.remove_work_dir(module);
                module.set_state(ModuleState::Broken);

                error!(
                    module = %module.identity(),
                    unpublished = removed,
                    error = %format!("{:#}", cause),
                    "module activation failed"
                );
                self.events.publish(&LifecycleEvent::AfterModuleStartFailed {
                    module: module.identity().clone(),
                    error: Arc::clone(&cause),
                });

                Err(HostError::Activation {
                    module: module.identity().clone(),
                    cause,
                })
            }
        }
    }

    /// Uninstall a module. Idempotent: uninstalling an already-deactivated
    /// module is a no-op, and no teardown event fires twice.
    pub async fn uninstall(&self, module: &ModuleHandle) -> Result<(), HostError> {
        let _transition = module.transition_lock().lock().await;

        match module.state() {
            ModuleState::Deactivated => Ok(()),
            ModuleState::Broken => {
                // Resources were already released when the start failed;
                // only the diagnostic listing entry remains.
                self.modules.unregister(module);
                info!(module = %module.identity(), "removed broken module");
                Ok(())
            }
            ModuleState::Resolved => {
                self.remove_work_dir(module);
                module.set_state(ModuleState::Deactivated);
                self.modules.unregister(module);
                info!(module = %module.identity(), "uninstalled resolved module");
                Ok(())
            }
            ModuleState::Starting => Err(HostError::InvalidState(format!(
                "module {} is mid-transition",
                module.identity()
            ))),
            ModuleState::Activated => {
                self.events.publish(&LifecycleEvent::BeforeModuleRecycle {
                    module: module.identity().clone(),
                });

                // Stop hook is best-effort: teardown always reaches a
                // resource-clean state.
                if let Some(activator) = module.activator() {
                    if let Some(scope) = module.scope() {
                        match self.module_context(module, scope) {
                            Ok(ctx) => {
                                if let Err(e) = activator.on_stop(&ctx).await {
                                    warn!(
                                        module = %module.identity(),
                                        error = %format!("{:#}", e),
                                        "deactivation hook failed, continuing teardown"
                                    );
                                }
                            }
                            Err(e) => {
                                warn!(
                                    module = %module.identity(),
                                    error = %e,
                                    "could not build stop context, continuing teardown"
                                );
                            }
                        }
                    }
                }

                // All of this module's registrations are gone before the
                // uninstall call returns.
                let removed = self
                    .services
                    .unpublish_provider(&Provider::Module(module.identity().clone()));
                debug!(module = %module.identity(), removed, "unpublished module services");

                module.clear_scope();
                self.remove_work_dir(module);
                module.set_state(ModuleState::Deactivated);

                self.events
                    .publish(&LifecycleEvent::AfterModuleRecycleCleanup {
                        module: module.identity().clone(),
                    });
                self.modules.unregister(module);

                info!(module = %module.identity(), "module uninstalled");
                Ok(())
            }
        }
    }

    /// (name, version, state) for every installed module
    pub fn list_modules(&self) -> Vec<(String, String, ModuleState)> {
        self.modules.list()
    }

    /// Find an installed module by identity
    pub fn get_module(&self, identity: &ModuleIdentity) -> Option<ModuleHandle> {
        self.modules.get(identity)
    }

    // ---- services ----

    /// Publish a container-provided service
    pub fn publish_service<T>(
        &self,
        unique_id: &str,
        service: Arc<T>,
        priority: i32,
    ) -> Arc<ServiceRegistration>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services
            .publish(unique_id, service, Provider::Container, priority)
    }

    /// Preferred live implementation of a service type
    pub fn lookup_service<T>(&self, unique_id: Option<&str>) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services.lookup::<T>(unique_id)
    }

    /// All live registrations of a service type, selection order
    pub fn lookup_all_services<T>(&self, unique_id: Option<&str>) -> Vec<Arc<ServiceRegistration>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services.lookup_all::<T>(unique_id)
    }

    // ---- deployment ----

    /// Run the deployment pipeline over the configured deploy directory
    pub async fn deploy(&self) -> Result<(), HostError> {
        DeployPipeline::new().run(self).await.map(|_| ())
    }

    /// Uninstall every module, newest install first
    pub async fn shutdown(&self) -> Result<(), HostError> {
        info!("shutting down module host");
        for module in self.modules.all().into_iter().rev() {
            if let Err(e) = self.uninstall(&module).await {
                warn!(module = %module.identity(), error = %e, "error uninstalling module");
            }
        }
        info!("module host shut down");
        Ok(())
    }

    // ---- internals ----

    fn build_scope(&self, module: &ModuleHandle) -> Result<ResolutionScope, HostError> {
        let mut delegates = Vec::with_capacity(module.dependencies().len());
        for dep in module.dependencies() {
            let plugin = self
                .plugins
                .get(dep)
                .ok_or_else(|| HostError::UnresolvedDependency {
                    module: module.identity().clone(),
                    dependency: dep.clone(),
                })?;
            delegates.push(plugin);
        }

        Ok(ResolutionScope::new(
            module.identity().clone(),
            module.artifacts().clone(),
            delegates,
            Arc::clone(&self.host_scope),
        ))
    }

    fn module_context(
        &self,
        module: &ModuleHandle,
        scope: Arc<ResolutionScope>,
    ) -> Result<ModuleContext, HostError> {
        let work_dir = module.work_dir().ok_or_else(|| {
            HostError::InvalidState(format!(
                "module {} has no working directory",
                module.identity()
            ))
        })?;
        Ok(ModuleContext::new(
            module.identity().clone(),
            module.instance_id().to_string(),
            work_dir,
            module.config().clone(),
            scope,
            Arc::clone(&self.services),
        ))
    }

    /// Root of all per-module working directories, for diagnostics
    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    fn remove_work_dir(&self, module: &ModuleHandle) {
        if let Some(dir) = module.take_work_dir() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                if dir.exists() {
                    warn!(
                        module = %module.identity(),
                        dir = %dir.display(),
                        error = %e,
                        "failed to remove working directory"
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for ModuleHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHost")
            .field("plugins", &self.plugins.len())
            .field("modules", &self.modules.len())
            .field("services", &self.services.len())
            .finish()
    }
}

/// Helper used by deployment to merge host-side config overrides into a
/// module descriptor before install.
pub(crate) fn apply_config_overrides(
    descriptor: &mut ModuleDescriptor,
    overrides: Option<&HashMap<String, String>>,
) {
    if let Some(overrides) = overrides {
        for (key, value) in overrides {
            descriptor.config.insert(key.clone(), value.clone());
        }
    }
}
