//! Module registry
//!
//! Bookkeeping for all installed modules. Uniqueness is enforced on
//! (name, version): an identity stays taken until the module holding it
//! is uninstalled, so a Broken module must be explicitly removed before
//! the same version can be installed again.

use std::sync::RwLock;
use tracing::{debug, info};

use crate::module::model::{ModuleHandle, ModuleIdentity};
use crate::traits::{HostError, ModuleState};

/// Registry of installed modules, in install order
#[derive(Default)]
pub struct ModuleRegistry {
    modules: RwLock<Vec<ModuleHandle>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an installed module. Fails if the identity is taken.
    pub fn register(&self, module: ModuleHandle) -> Result<(), HostError> {
        let mut modules = self.modules.write().expect("module registry lock poisoned");

        if modules.iter().any(|m| m.identity() == module.identity()) {
            return Err(HostError::DuplicateModule(module.identity().clone()));
        }

        info!(module = %module.identity(), "registered module");
        modules.push(module);
        Ok(())
    }

    /// Remove a module from the registry. Idempotent.
    pub fn unregister(&self, module: &ModuleHandle) {
        let mut modules = self.modules.write().expect("module registry lock poisoned");
        let before = modules.len();
        modules.retain(|m| !std::sync::Arc::ptr_eq(m, module));
        if modules.len() < before {
            debug!(module = %module.identity(), "unregistered module");
        }
    }

    /// Find a module by identity
    pub fn get(&self, identity: &ModuleIdentity) -> Option<ModuleHandle> {
        let modules = self.modules.read().expect("module registry lock poisoned");
        modules.iter().find(|m| m.identity() == identity).cloned()
    }

    /// All Activated modules carrying the given name
    pub fn activated_by_name(&self, name: &str) -> Vec<ModuleHandle> {
        let modules = self.modules.read().expect("module registry lock poisoned");
        modules
            .iter()
            .filter(|m| m.name() == name && m.state() == ModuleState::Activated)
            .cloned()
            .collect()
    }

    /// All registered modules, in install order
    pub fn all(&self) -> Vec<ModuleHandle> {
        let modules = self.modules.read().expect("module registry lock poisoned");
        modules.clone()
    }

    /// (name, version, state) triples, ordered by name then version
    pub fn list(&self) -> Vec<(String, String, ModuleState)> {
        let modules = self.modules.read().expect("module registry lock poisoned");
        let mut listed: Vec<_> = modules
            .iter()
            .map(|m| (m.name().to_string(), m.version().to_string(), m.state()))
            .collect();
        listed.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        listed
    }

    pub fn len(&self) -> usize {
        self.modules
            .read()
            .expect("module registry lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
