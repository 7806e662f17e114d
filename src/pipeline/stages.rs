//! Standard pipeline stages

use async_trait::async_trait;
use tracing::{debug, info};

use crate::archive::discovery::{ArchiveDiscovery, ArchiveManifest};
use crate::host::{apply_config_overrides, ModuleHost};
use crate::pipeline::{DeployContext, DeployStage};
use crate::plugin::model::Plugin;
use crate::traits::HostError;

/// Discovers and classifies exploded archives in the deploy directory
pub struct ArchiveStage;

#[async_trait]
impl DeployStage for ArchiveStage {
    fn name(&self) -> &'static str {
        "archive-handling"
    }

    async fn execute(&self, host: &ModuleHost, ctx: &mut DeployContext) -> Result<(), HostError> {
        let discovery = ArchiveDiscovery::new(&host.config().deploy_dir);
        ctx.discovered = discovery.discover()?;
        Ok(())
    }
}

/// Registers discovered plugins, applying the include/exclude filters
///
/// Filters run before registration: an excluded plugin never reaches the
/// registry and can supply no delegation target.
pub struct PluginDeployStage;

#[async_trait]
impl DeployStage for PluginDeployStage {
    fn name(&self) -> &'static str {
        "plugin-deploy"
    }

    async fn execute(&self, host: &ModuleHost, ctx: &mut DeployContext) -> Result<(), HostError> {
        for archive in &ctx.discovered {
            let manifest = match &archive.manifest {
                ArchiveManifest::Plugin(m) => m,
                ArchiveManifest::Module(_) => continue,
            };

            if !host.config().plugin_allowed(&manifest.name) {
                debug!(plugin = %manifest.name, "plugin filtered out of deployment");
                ctx.excluded_plugins.push(manifest.name.clone());
                continue;
            }

            let plugin =
                Plugin::new(manifest.to_descriptor()).with_location(archive.directory.clone());
            let registered = host.register_plugin_built(plugin).await?;
            ctx.registered_plugins.push(registered.identity().clone());
        }

        info!(
            registered = ctx.registered_plugins.len(),
            excluded = ctx.excluded_plugins.len(),
            "plugin deploy complete"
        );
        Ok(())
    }
}

/// Installs and activates discovered modules
pub struct ModuleDeployStage;

#[async_trait]
impl DeployStage for ModuleDeployStage {
    fn name(&self) -> &'static str {
        "module-deploy"
    }

    async fn execute(&self, host: &ModuleHost, ctx: &mut DeployContext) -> Result<(), HostError> {
        for archive in &ctx.discovered {
            let manifest = match &archive.manifest {
                ArchiveManifest::Module(m) => m,
                ArchiveManifest::Plugin(_) => continue,
            };

            let mut descriptor = manifest.to_descriptor();
            let overrides = host.config().module_config(&descriptor.name);
            apply_config_overrides(&mut descriptor, overrides);

            let module = host.install(descriptor)?;
            host.activate(&module).await?;
            ctx.activated_modules.push(module.identity().clone());
        }

        info!(
            activated = ctx.activated_modules.len(),
            "module deploy complete"
        );
        Ok(())
    }
}
