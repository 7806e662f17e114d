//! Test utilities for module host testing
//!
//! Provides a host fixture with isolated directories plus a set of stub
//! activators and a throwaway service trait.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use modhost::{
    HostConfig, LifecycleEvent, LifecycleListener, ModuleActivator, ModuleContext, ModuleDescriptor,
    ModuleHost, PluginActivator, PluginContext, PluginDescriptor,
};

/// Test fixture owning a host with isolated work/deploy directories
pub struct HostFixture {
    pub temp: TempDir,
    pub host: ModuleHost,
}

impl HostFixture {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config<F: FnOnce(&mut HostConfig)>(customize: F) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();

        let temp = TempDir::new().expect("failed to create temp dir");
        let mut config = HostConfig {
            work_dir: temp.path().join("work").to_string_lossy().to_string(),
            deploy_dir: temp.path().join("deploy").to_string_lossy().to_string(),
            ..HostConfig::default()
        };
        customize(&mut config);

        let host = ModuleHost::new(config).expect("failed to create host");
        Self { temp, host }
    }

    pub fn deploy_dir(&self) -> PathBuf {
        self.temp.path().join("deploy")
    }

    /// Write an exploded archive directory containing the given manifest
    pub fn write_archive(&self, dir_name: &str, manifest_file: &str, contents: &str) -> PathBuf {
        let dir = self.deploy_dir().join(dir_name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(manifest_file), contents).unwrap();
        dir
    }
}

pub fn plugin_descriptor(name: &str, exports: &[&str], artifacts: &[&str]) -> PluginDescriptor {
    PluginDescriptor {
        name: name.to_string(),
        version: "1.0.0".to_string(),
        priority: 100,
        exports: exports.iter().map(|s| s.to_string()).collect(),
        resource_exports: Vec::new(),
        dependencies: Vec::new(),
        artifacts: artifacts.iter().map(|s| s.to_string()).collect(),
        resources: Vec::new(),
    }
}

pub fn module_descriptor(name: &str, version: &str, dependencies: &[&str]) -> ModuleDescriptor {
    ModuleDescriptor {
        name: name.to_string(),
        version: version.to_string(),
        dependencies: dependencies.iter().map(|s| s.to_string()).collect(),
        exports: Vec::new(),
        artifacts: Vec::new(),
        resources: Vec::new(),
        config: HashMap::new(),
    }
}

/// Throwaway capability used by service tests
pub trait Echo: Send + Sync {
    fn echo(&self) -> String;
}

pub struct FixedEcho(pub &'static str);

impl Echo for FixedEcho {
    fn echo(&self) -> String {
        self.0.to_string()
    }
}

/// Module activator that publishes one Echo service on start
pub struct PublishingActivator {
    pub unique_id: &'static str,
    pub value: &'static str,
    pub priority: i32,
}

#[async_trait]
impl ModuleActivator for PublishingActivator {
    async fn on_start(&self, ctx: &ModuleContext) -> anyhow::Result<()> {
        ctx.publish_service::<dyn Echo>(self.unique_id, Arc::new(FixedEcho(self.value)), self.priority);
        Ok(())
    }
}

/// Plugin activator that publishes one Echo service on start
pub struct PluginPublisher {
    pub unique_id: &'static str,
    pub value: &'static str,
}

#[async_trait]
impl PluginActivator for PluginPublisher {
    async fn on_start(&self, ctx: &PluginContext) -> anyhow::Result<()> {
        ctx.publish_service::<dyn Echo>(self.unique_id, Arc::new(FixedEcho(self.value)));
        Ok(())
    }
}

/// Module activator whose start always fails
pub struct FailingActivator;

#[async_trait]
impl ModuleActivator for FailingActivator {
    async fn on_start(&self, _ctx: &ModuleContext) -> anyhow::Result<()> {
        anyhow::bail!("activation exploded")
    }
}

/// Module activator that publishes a service, then fails
pub struct PublishThenFailActivator;

#[async_trait]
impl ModuleActivator for PublishThenFailActivator {
    async fn on_start(&self, ctx: &ModuleContext) -> anyhow::Result<()> {
        ctx.publish_service::<dyn Echo>("doomed", Arc::new(FixedEcho("never visible")), 0);
        anyhow::bail!("failed after publishing")
    }
}

/// Module activator counting start/stop invocations; stop can be made to
/// fail to exercise best-effort teardown
pub struct CountingActivator {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub fail_on_stop: bool,
}

impl CountingActivator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            fail_on_stop: false,
        })
    }

    pub fn failing_stop() -> Arc<Self> {
        Arc::new(Self {
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            fail_on_stop: true,
        })
    }
}

#[async_trait]
impl ModuleActivator for CountingActivator {
    async fn on_start(&self, _ctx: &ModuleContext) -> anyhow::Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_stop(&self, _ctx: &ModuleContext) -> anyhow::Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_stop {
            anyhow::bail!("stop hook misbehaved")
        }
        Ok(())
    }
}

/// Lifecycle listener recording event labels in dispatch order
pub struct RecordingListener {
    pub priority: i32,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl RecordingListener {
    pub fn new() -> (Arc<Self>, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (
            Arc::new(Self {
                priority: 100,
                log: Arc::clone(&log),
            }),
            log,
        )
    }
}

impl LifecycleListener for RecordingListener {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn on_event(&self, event: &LifecycleEvent) {
        let label = match event {
            LifecycleEvent::BeforeModuleStart { module } => format!("before-start:{}", module),
            LifecycleEvent::AfterModuleStarted { module } => format!("after-started:{}", module),
            LifecycleEvent::AfterModuleStartFailed { module, .. } => {
                format!("start-failed:{}", module)
            }
            LifecycleEvent::BeforeModuleRecycle { module } => format!("before-recycle:{}", module),
            LifecycleEvent::AfterModuleRecycleCleanup { module } => {
                format!("after-cleanup:{}", module)
            }
        };
        self.log.lock().unwrap().push(label);
    }
}
