//! Deployment pipeline
//!
//! An ordered sequence of named stages drives installation from a set of
//! discovered archives into fully activated modules. Execution is
//! sequential and synchronous; the first stage error aborts the rest and
//! surfaces to the caller - there is no partial-pipeline resume.

pub mod stages;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::archive::discovery::DiscoveredArchive;
use crate::host::ModuleHost;
use crate::module::model::ModuleIdentity;
use crate::plugin::model::PluginIdentity;
use crate::traits::HostError;

pub use stages::{ArchiveStage, ModuleDeployStage, PluginDeployStage};

/// State threaded through the pipeline stages
#[derive(Debug, Default)]
pub struct DeployContext {
    /// Output of archive handling: classified exploded archives
    pub discovered: Vec<DiscoveredArchive>,
    /// Plugins placed in the registry by plugin deploy
    pub registered_plugins: Vec<PluginIdentity>,
    /// Plugins dropped by the include/exclude filters
    pub excluded_plugins: Vec<String>,
    /// Modules activated by module deploy
    pub activated_modules: Vec<ModuleIdentity>,
}

/// One named pipeline stage
#[async_trait]
pub trait DeployStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, host: &ModuleHost, ctx: &mut DeployContext) -> Result<(), HostError>;
}

/// Pre/post extension point around every stage
pub trait PipelineHook: Send + Sync {
    fn before_stage(&self, _stage: &'static str, _ctx: &DeployContext) {}
    fn after_stage(&self, _stage: &'static str, _ctx: &DeployContext) {}
}

/// The ordered stage list
pub struct DeployPipeline {
    stages: Vec<Arc<dyn DeployStage>>,
    hooks: Vec<Arc<dyn PipelineHook>>,
}

impl DeployPipeline {
    /// Standard pipeline: archive handling, plugin deploy, module deploy
    pub fn new() -> Self {
        Self::with_stages(vec![
            Arc::new(ArchiveStage),
            Arc::new(PluginDeployStage),
            Arc::new(ModuleDeployStage),
        ])
    }

    pub fn with_stages(stages: Vec<Arc<dyn DeployStage>>) -> Self {
        Self {
            stages,
            hooks: Vec::new(),
        }
    }

    pub fn add_hook(&mut self, hook: Arc<dyn PipelineHook>) -> &mut Self {
        self.hooks.push(hook);
        self
    }

    /// Run all stages in order. Returns the final context on success.
    pub async fn run(&self, host: &ModuleHost) -> Result<DeployContext, HostError> {
        let mut ctx = DeployContext::default();

        for stage in &self.stages {
            let name = stage.name();
            debug!(stage = name, "entering pipeline stage");
            for hook in &self.hooks {
                hook.before_stage(name, &ctx);
            }

            stage
                .execute(host, &mut ctx)
                .await
                .map_err(|e| HostError::Deploy {
                    stage: name,
                    source: Box::new(e),
                })?;

            for hook in &self.hooks {
                hook.after_stage(name, &ctx);
            }
        }

        info!(
            plugins = ctx.registered_plugins.len(),
            modules = ctx.activated_modules.len(),
            "deployment pipeline complete"
        );
        Ok(ctx)
    }
}

impl Default for DeployPipeline {
    fn default() -> Self {
        Self::new()
    }
}
