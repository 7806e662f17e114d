//! Modhost - an in-process module isolation runtime
//!
//! Hosts multiple independently-versioned application modules and shared
//! plugin libraries inside a single process. Every module gets its own
//! resolution scope - an ordered visibility chain over its private
//! artifacts, its plugin dependencies' export surfaces, and the host
//! scope - while the service registry brokers controlled sharing between
//! modules, plugins, and the container.
//!
//! ## Architecture
//!
//! - **Isolation**: a symbol physically present in a plugin but not
//!   exported by it stays invisible to delegating modules
//! - **Lifecycle**: modules move Resolved -> Starting -> Activated ->
//!   Deactivated, or Broken on a failed start, and are garbage-collected
//!   without restarting the host
//! - **Sharing**: capabilities cross module boundaries only through
//!   explicit service publication, with plugin providers outranking
//!   container providers
//! - **Deployment**: a staged pipeline turns discovered archives into
//!   registered plugins and activated modules
//!
//! ## Example
//!
//! ```no_run
//! use modhost::{HostConfig, ModuleDescriptor, ModuleHost};
//!
//! # async fn run() -> Result<(), modhost::HostError> {
//! let host = ModuleHost::new(HostConfig::default())?;
//!
//! let module = host.install(ModuleDescriptor {
//!     name: "billing".to_string(),
//!     version: "1.0.0".to_string(),
//!     dependencies: vec![],
//!     exports: vec![],
//!     artifacts: vec!["billing.App".to_string()],
//!     resources: vec![],
//!     config: Default::default(),
//! })?;
//! host.activate(&module).await?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod event;
pub mod host;
pub mod module;
pub mod pipeline;
pub mod plugin;
pub mod scope;
pub mod service;
pub mod traits;

pub use config::{ConflictPolicy, HostConfig};
pub use event::{LifecycleEvent, LifecycleEventBus, LifecycleListener};
pub use host::ModuleHost;
pub use module::{ModuleDescriptor, ModuleHandle, ModuleIdentity};
pub use pipeline::{DeployPipeline, DeployStage, PipelineHook};
pub use plugin::{Plugin, PluginDescriptor, PluginIdentity};
pub use scope::{ArtifactSet, ResolvedOwner};
pub use service::{Provider, ServiceRegistration, ServiceRegistry};
pub use traits::{
    HostError, ModuleActivator, ModuleContext, ModuleState, PluginActivator, PluginContext,
};
