//! Plugin registry
//!
//! Append-only registry of all loaded plugins. Plugin names are unique
//! within a host process; there is no unregister in normal operation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::plugin::model::Plugin;
use crate::traits::HostError;

#[derive(Default)]
struct Inner {
    by_name: HashMap<String, Arc<Plugin>>,
    /// Registration order, for stable priority ties
    order: Vec<Arc<Plugin>>,
}

/// Registry of all loaded plugins
#[derive(Default)]
pub struct PluginRegistry {
    inner: RwLock<Inner>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin. Fails if the name is already taken.
    pub fn register(&self, plugin: Arc<Plugin>) -> Result<(), HostError> {
        let mut inner = self.inner.write().expect("plugin registry lock poisoned");

        if inner.by_name.contains_key(plugin.name()) {
            return Err(HostError::DuplicatePlugin(plugin.identity().clone()));
        }

        info!(
            plugin = %plugin.identity(),
            priority = plugin.priority(),
            "registered plugin"
        );
        inner
            .by_name
            .insert(plugin.name().to_string(), Arc::clone(&plugin));
        inner.order.push(plugin);
        Ok(())
    }

    /// Look up a plugin by name
    pub fn get(&self, name: &str) -> Option<Arc<Plugin>> {
        let inner = self.inner.read().expect("plugin registry lock poisoned");
        inner.by_name.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        let inner = self.inner.read().expect("plugin registry lock poisoned");
        inner.by_name.contains_key(name)
    }

    /// All plugins, priority ascending, registration order on ties
    pub fn all_in_priority_order(&self) -> Vec<Arc<Plugin>> {
        let inner = self.inner.read().expect("plugin registry lock poisoned");
        let mut plugins = inner.order.clone();
        plugins.sort_by_key(|p| p.priority());
        debug!(count = plugins.len(), "listed plugins in priority order");
        plugins
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().expect("plugin registry lock poisoned");
        inner.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::model::PluginDescriptor;

    fn plugin(name: &str, version: &str, priority: i32) -> Arc<Plugin> {
        Arc::new(Plugin::new(PluginDescriptor {
            name: name.to_string(),
            version: version.to_string(),
            priority,
            exports: Vec::new(),
            resource_exports: Vec::new(),
            dependencies: Vec::new(),
            artifacts: Vec::new(),
            resources: Vec::new(),
        }))
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let registry = PluginRegistry::new();
        registry.register(plugin("a", "1.0.0", 100)).unwrap();

        let err = registry.register(plugin("a", "2.0.0", 100)).unwrap_err();
        assert!(matches!(err, HostError::DuplicatePlugin(_)));
    }

    #[test]
    fn priority_order_is_stable() {
        let registry = PluginRegistry::new();
        registry.register(plugin("first", "1.0.0", 100)).unwrap();
        registry.register(plugin("preferred", "1.0.0", 10)).unwrap();
        registry.register(plugin("second", "1.0.0", 100)).unwrap();

        let names: Vec<_> = registry
            .all_in_priority_order()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["preferred", "first", "second"]);
    }
}
