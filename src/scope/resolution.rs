//! Resolution scopes
//!
//! A scope is built once, when a module's plugin dependencies resolve,
//! and is frozen before the module enters Starting. Concurrent readers
//! need no locking because nothing mutates after construction.
//!
//! Resolution walks the chain in strict order: the module's own
//! artifacts, then each plugin delegate (filtered by the plugin's
//! declared exports), then the host scope with no filtering. First match
//! wins; there is no merging or shadowing detection. A miss is reported
//! as absence, not an error - the calling symbol loader decides how to
//! surface it.

use std::sync::Arc;

use crate::module::model::ModuleIdentity;
use crate::plugin::model::{Plugin, PluginIdentity};
use crate::scope::artifact::ArtifactSet;

/// Who owns a resolved symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedOwner {
    /// The requesting module's own artifacts
    Module(ModuleIdentity),
    /// A plugin delegate, through its export surface
    Plugin(PluginIdentity),
    /// The host container's own scope
    Host,
}

/// The container's terminal scope
///
/// Consulted last and unfiltered: whatever the host process itself
/// carries is visible to every module.
#[derive(Debug, Default)]
pub struct HostScope {
    artifacts: ArtifactSet,
}

impl HostScope {
    pub fn new(artifacts: ArtifactSet) -> Self {
        Self { artifacts }
    }

    pub fn contains_symbol(&self, name: &str) -> bool {
        self.artifacts.contains_symbol(name)
    }

    pub fn contains_resource(&self, name: &str) -> bool {
        self.artifacts.contains_resource(name)
    }
}

/// One module's frozen visibility chain
pub struct ResolutionScope {
    owner: ModuleIdentity,
    artifacts: ArtifactSet,
    /// Plugin delegates in plugin priority order, declaration order on ties
    delegates: Vec<Arc<Plugin>>,
    host: Arc<HostScope>,
}

impl ResolutionScope {
    pub(crate) fn new(
        owner: ModuleIdentity,
        artifacts: ArtifactSet,
        mut delegates: Vec<Arc<Plugin>>,
        host: Arc<HostScope>,
    ) -> Self {
        // Stable sort keeps declaration order among equal priorities.
        delegates.sort_by_key(|p| p.priority());
        Self {
            owner,
            artifacts,
            delegates,
            host,
        }
    }

    /// The module this scope belongs to
    pub fn owner(&self) -> &ModuleIdentity {
        &self.owner
    }

    /// Plugin delegates in resolution order
    pub fn delegates(&self) -> impl Iterator<Item = &Arc<Plugin>> {
        self.delegates.iter()
    }

    /// Resolve a symbolic name. `None` means the chain is exhausted.
    ///
    /// A symbol physically present in a delegate but not covered by its
    /// declared exports stays invisible here - that is the isolation
    /// guarantee this type exists for.
    pub fn resolve(&self, name: &str) -> Option<ResolvedOwner> {
        if self.artifacts.contains_symbol(name) {
            return Some(ResolvedOwner::Module(self.owner.clone()));
        }

        for plugin in &self.delegates {
            if plugin.exports().exports_symbol(name) && plugin.artifacts().contains_symbol(name) {
                return Some(ResolvedOwner::Plugin(plugin.identity().clone()));
            }
        }

        if self.host.contains_symbol(name) {
            return Some(ResolvedOwner::Host);
        }

        None
    }

    /// Resolve a resource name, mirroring [`resolve`](Self::resolve) over
    /// the resource surface.
    pub fn resolve_resource(&self, name: &str) -> Option<ResolvedOwner> {
        if self.artifacts.contains_resource(name) {
            return Some(ResolvedOwner::Module(self.owner.clone()));
        }

        for plugin in &self.delegates {
            if plugin.exports().exports_resource(name) && plugin.artifacts().contains_resource(name)
            {
                return Some(ResolvedOwner::Plugin(plugin.identity().clone()));
            }
        }

        if self.host.contains_resource(name) {
            return Some(ResolvedOwner::Host);
        }

        None
    }
}

impl std::fmt::Debug for ResolutionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionScope")
            .field("owner", &self.owner)
            .field(
                "delegates",
                &self
                    .delegates
                    .iter()
                    .map(|p| p.identity().to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::model::PluginDescriptor;

    fn plugin(name: &str, priority: i32, exports: &[&str], artifacts: &[&str]) -> Arc<Plugin> {
        Arc::new(Plugin::new(PluginDescriptor {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            priority,
            exports: exports.iter().map(|s| s.to_string()).collect(),
            resource_exports: Vec::new(),
            dependencies: Vec::new(),
            artifacts: artifacts.iter().map(|s| s.to_string()).collect(),
            resources: Vec::new(),
        }))
    }

    fn scope_with(delegates: Vec<Arc<Plugin>>, host: HostScope) -> ResolutionScope {
        ResolutionScope::new(
            ModuleIdentity::new("m1", "1.0.0"),
            ArtifactSet::from_symbols(vec!["m1.App".to_string()]),
            delegates,
            Arc::new(host),
        )
    }

    #[test]
    fn own_artifacts_win_first() {
        let scope = scope_with(Vec::new(), HostScope::default());
        assert_eq!(
            scope.resolve("m1.App"),
            Some(ResolvedOwner::Module(ModuleIdentity::new("m1", "1.0.0")))
        );
    }

    #[test]
    fn unexported_plugin_symbol_is_invisible() {
        let p = plugin(
            "pluginA",
            100,
            &["com.acme.api"],
            &["com.acme.api.Foo", "com.acme.internal.Bar"],
        );
        let scope = scope_with(vec![p], HostScope::default());

        assert_eq!(
            scope.resolve("com.acme.api.Foo"),
            Some(ResolvedOwner::Plugin(PluginIdentity::new(
                "pluginA", "1.0.0"
            )))
        );
        // Physically present but not exported: must not resolve.
        assert_eq!(scope.resolve("com.acme.internal.Bar"), None);
    }

    #[test]
    fn lower_priority_delegate_wins() {
        let shared = "com.acme.api.Foo";
        let low = plugin("low", 10, &["com.acme.api"], &[shared]);
        let high = plugin("high", 200, &["com.acme.api"], &[shared]);
        // Declared in the "wrong" order; priority sorting fixes it.
        let scope = scope_with(vec![high, low], HostScope::default());

        assert_eq!(
            scope.resolve(shared),
            Some(ResolvedOwner::Plugin(PluginIdentity::new("low", "1.0.0")))
        );
    }

    #[test]
    fn host_scope_is_terminal_and_unfiltered() {
        let host = HostScope::new(ArtifactSet::from_symbols(vec!["host.Runtime".to_string()]));
        let scope = scope_with(Vec::new(), host);

        assert_eq!(scope.resolve("host.Runtime"), Some(ResolvedOwner::Host));
        assert_eq!(scope.resolve("nowhere.Symbol"), None);
    }
}
