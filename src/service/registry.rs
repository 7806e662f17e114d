//! Service registry
//!
//! Publish/lookup broker keyed by (service type, unique id). Selection
//! order: provider rank first (plugin providers outrank module providers
//! outrank container providers, regardless of numeric priority), then
//! numeric priority ascending, then publication order.
//!
//! This is the host's primary shared-mutable structure. Buckets are
//! immutable snapshots behind an `Arc`: publication builds a new snapshot
//! and swaps it in under the map lock, so a concurrent lookup sees either
//! the old bucket or the new one, never a half-written registration.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::module::model::ModuleIdentity;
use crate::plugin::model::PluginIdentity;

/// Who published a service registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    Plugin(PluginIdentity),
    Module(ModuleIdentity),
    Container,
}

impl Provider {
    /// Selection rank; lower outranks. Provider type dominates numeric
    /// priority.
    fn rank(&self) -> u8 {
        match self {
            Provider::Plugin(_) => 0,
            Provider::Module(_) => 1,
            Provider::Container => 2,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Plugin(id) => write!(f, "plugin {}", id),
            Provider::Module(id) => write!(f, "module {}", id),
            Provider::Container => write!(f, "container"),
        }
    }
}

/// One published service implementation
pub struct ServiceRegistration {
    type_id: TypeId,
    type_name: &'static str,
    unique_id: String,
    provider: Provider,
    priority: i32,
    seq: u64,
    /// Holds an `Arc<T>` for the published service type `T`
    instance: Box<dyn Any + Send + Sync>,
}

impl ServiceRegistration {
    /// Recover the implementation. Returns `None` if `T` is not the type
    /// this registration was published under.
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.instance.downcast_ref::<Arc<T>>().cloned()
    }

    pub fn service_type(&self) -> &'static str {
        self.type_name
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    fn sort_key(&self) -> (u8, i32, u64) {
        (self.provider.rank(), self.priority, self.seq)
    }
}

impl std::fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistration")
            .field("service_type", &self.type_name)
            .field("unique_id", &self.unique_id)
            .field("provider", &self.provider)
            .field("priority", &self.priority)
            .finish()
    }
}

type Bucket = Arc<Vec<Arc<ServiceRegistration>>>;

/// Publish/lookup broker for cross-module capability sharing
#[derive(Default)]
pub struct ServiceRegistry {
    seq: AtomicU64,
    buckets: RwLock<HashMap<(TypeId, String), Bucket>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a service implementation.
    ///
    /// Visibility is atomic: once this returns, every lookup observes the
    /// registration in full.
    pub fn publish<T>(
        &self,
        unique_id: &str,
        service: Arc<T>,
        provider: Provider,
        priority: i32,
    ) -> Arc<ServiceRegistration>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let registration = Arc::new(ServiceRegistration {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            unique_id: unique_id.to_string(),
            provider,
            priority,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            instance: Box::new(service),
        });

        let mut buckets = self.buckets.write().expect("service registry lock poisoned");
        let key = (registration.type_id, registration.unique_id.clone());
        let current = buckets.get(&key).cloned().unwrap_or_default();
        let mut next: Vec<_> = current.iter().cloned().collect();
        next.push(Arc::clone(&registration));
        next.sort_by_key(|r| r.sort_key());
        buckets.insert(key, Arc::new(next));

        info!(
            service = registration.type_name,
            unique_id = %registration.unique_id,
            provider = %registration.provider,
            priority = registration.priority,
            "published service"
        );
        registration
    }

    /// Preferred live implementation of `T`, or `None`.
    ///
    /// With a unique id, only that bucket is consulted; without one, the
    /// best registration across all of `T`'s unique ids wins.
    pub fn lookup<T>(&self, unique_id: Option<&str>) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.lookup_registration::<T>(unique_id)
            .and_then(|r| r.get::<T>())
    }

    /// Preferred live registration of `T`, or `None`.
    pub fn lookup_registration<T>(&self, unique_id: Option<&str>) -> Option<Arc<ServiceRegistration>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.lookup_all::<T>(unique_id).into_iter().next()
    }

    /// All live registrations of `T`, selection order
    pub fn lookup_all<T>(&self, unique_id: Option<&str>) -> Vec<Arc<ServiceRegistration>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        let snapshots: Vec<Bucket> = {
            let buckets = self.buckets.read().expect("service registry lock poisoned");
            match unique_id {
                Some(uid) => buckets
                    .get(&(type_id, uid.to_string()))
                    .cloned()
                    .into_iter()
                    .collect(),
                None => buckets
                    .iter()
                    .filter(|((tid, _), _)| *tid == type_id)
                    .map(|(_, bucket)| bucket.clone())
                    .collect(),
            }
        };

        let mut all: Vec<_> = snapshots
            .iter()
            .flat_map(|b| b.iter().cloned())
            .collect();
        all.sort_by_key(|r| r.sort_key());
        all
    }

    /// Remove every registration matching the predicate. Returns the
    /// number removed.
    pub fn unpublish_matching<F>(&self, predicate: F) -> usize
    where
        F: Fn(&ServiceRegistration) -> bool,
    {
        let mut buckets = self.buckets.write().expect("service registry lock poisoned");
        let mut removed = 0;

        buckets.retain(|_, bucket| {
            let kept: Vec<_> = bucket
                .iter()
                .filter(|r| !predicate(r))
                .cloned()
                .collect();
            removed += bucket.len() - kept.len();
            if kept.is_empty() {
                false
            } else if kept.len() != bucket.len() {
                *bucket = Arc::new(kept);
                true
            } else {
                true
            }
        });

        if removed > 0 {
            debug!(removed, "unpublished service registrations");
        }
        removed
    }

    /// Remove every registration attributed to the given provider
    pub fn unpublish_provider(&self, provider: &Provider) -> usize {
        self.unpublish_matching(|r| r.provider() == provider)
    }

    /// Total number of live registrations
    pub fn len(&self) -> usize {
        let buckets = self.buckets.read().expect("service registry lock poisoned");
        buckets.values().map(|b| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
