//! Lifecycle event dispatch
//!
//! Listeners observe module lifecycle transitions. Dispatch is
//! synchronous on the task driving the transition, in ascending listener
//! priority, so a listener sees the world exactly as the transition left
//! it.

use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::module::model::ModuleIdentity;

/// A module lifecycle event
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// The module is about to run its activation hook
    BeforeModuleStart { module: ModuleIdentity },
    /// The activation hook returned successfully
    AfterModuleStarted { module: ModuleIdentity },
    /// The activation hook failed; the module is Broken
    AfterModuleStartFailed {
        module: ModuleIdentity,
        error: Arc<anyhow::Error>,
    },
    /// Teardown is about to release the module's resources
    BeforeModuleRecycle { module: ModuleIdentity },
    /// Teardown released the module's resources
    AfterModuleRecycleCleanup { module: ModuleIdentity },
}

impl LifecycleEvent {
    /// Identity of the module the event concerns
    pub fn module(&self) -> &ModuleIdentity {
        match self {
            LifecycleEvent::BeforeModuleStart { module }
            | LifecycleEvent::AfterModuleStarted { module }
            | LifecycleEvent::AfterModuleStartFailed { module, .. }
            | LifecycleEvent::BeforeModuleRecycle { module }
            | LifecycleEvent::AfterModuleRecycleCleanup { module } => module,
        }
    }
}

/// Observer of module lifecycle transitions
pub trait LifecycleListener: Send + Sync {
    /// Dispatch order; lower runs first
    fn priority(&self) -> i32 {
        100
    }

    fn on_event(&self, event: &LifecycleEvent);
}

/// Listener registry with priority-ordered synchronous dispatch
#[derive(Default)]
pub struct LifecycleEventBus {
    listeners: RwLock<Vec<Arc<dyn LifecycleListener>>>,
}

impl LifecycleEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Re-sorts so dispatch stays priority-ordered,
    /// registration order on ties.
    pub fn add_listener(&self, listener: Arc<dyn LifecycleListener>) {
        let mut listeners = self.listeners.write().expect("event bus lock poisoned");
        listeners.push(listener);
        listeners.sort_by_key(|l| l.priority());
    }

    /// Dispatch an event to every listener, synchronously, in priority
    /// order.
    pub fn publish(&self, event: &LifecycleEvent) {
        let listeners = {
            let guard = self.listeners.read().expect("event bus lock poisoned");
            guard.clone()
        };
        debug!(?event, listeners = listeners.len(), "dispatching lifecycle event");
        for listener in listeners {
            listener.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        priority: i32,
        log: Arc<Mutex<Vec<i32>>>,
    }

    impl LifecycleListener for Recorder {
        fn priority(&self) -> i32 {
            self.priority
        }

        fn on_event(&self, _event: &LifecycleEvent) {
            self.log.lock().unwrap().push(self.priority);
        }
    }

    #[test]
    fn listeners_run_in_priority_order() {
        let bus = LifecycleEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for priority in [30, 10, 20] {
            bus.add_listener(Arc::new(Recorder {
                priority,
                log: Arc::clone(&log),
            }));
        }

        bus.publish(&LifecycleEvent::BeforeModuleStart {
            module: ModuleIdentity::new("m", "1.0.0"),
        });

        assert_eq!(*log.lock().unwrap(), vec![10, 20, 30]);
    }
}
