//! Root container and scopes.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use cmdpipe::errors::{ResolutionError, ResolutionResult};
use cmdpipe::services::{ServiceInstance, ServiceKey, ServiceProvider, ServiceResolver, ServiceScope};
use cmdpipe::types::ScopeId;
use parking_lot::Mutex;

use crate::collection::{Lifetime, Registration};

/// Counts of scope lifecycle events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// Scopes created so far.
    pub scopes_created: u64,
    /// Scopes disposed so far.
    pub scopes_disposed: u64,
}

impl ContainerStats {
    /// Scopes created but not yet disposed.
    pub const fn live_scopes(&self) -> u64 {
        self.scopes_created.saturating_sub(self.scopes_disposed)
    }
}

/// Thread-safe root provider built from a
/// [`ServiceCollection`](crate::ServiceCollection).
///
/// Resolving `dyn ServiceProvider` from the container or any of its scopes
/// yields a weak handle back to the container itself.
pub struct ServiceContainer {
    registrations: HashMap<ServiceKey, Registration>,
    singletons: Mutex<HashMap<ServiceKey, ServiceInstance>>,
    scopes_created: AtomicU64,
    scopes_disposed: AtomicU64,
    me: Weak<Self>,
}

impl ServiceContainer {
    pub(crate) fn new(registrations: HashMap<ServiceKey, Registration>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            registrations,
            singletons: Mutex::new(HashMap::new()),
            scopes_created: AtomicU64::new(0),
            scopes_disposed: AtomicU64::new(0),
            me: me.clone(),
        })
    }

    /// Creates a scope with its concrete type.
    pub fn scope(self: &Arc<Self>) -> Arc<MemoryScope> {
        self.scopes_created.fetch_add(1, Ordering::Relaxed);
        let scope = Arc::new(MemoryScope {
            id: ScopeId::new(),
            root: Arc::clone(self),
            instances: Mutex::new(HashMap::new()),
            disposed: AtomicBool::new(false),
        });
        tracing::trace!(scope_id = %scope.id, "scope created");
        scope
    }

    /// Scope lifecycle counters.
    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            scopes_created: self.scopes_created.load(Ordering::Relaxed),
            scopes_disposed: self.scopes_disposed.load(Ordering::Relaxed),
        }
    }

    /// The lifetime `T` was registered with, if any.
    pub fn lifetime_of<T: ?Sized + 'static>(&self) -> Option<Lifetime> {
        self.registrations
            .get(&ServiceKey::of::<T>())
            .map(|registration| registration.lifetime)
    }

    fn registration(&self, key: ServiceKey) -> ResolutionResult<&Registration> {
        self.registrations
            .get(&key)
            .ok_or(ResolutionError::NotRegistered {
                type_name: key.type_name(),
            })
    }

    fn self_handle(&self) -> ServiceInstance {
        let handle: Arc<dyn ServiceProvider> = Arc::new(ContainerHandle(self.me.clone()));
        ServiceInstance::new(handle)
    }

    fn resolve_singleton(&self, key: ServiceKey, registration: &Registration) -> ResolutionResult<ServiceInstance> {
        if let Some(existing) = self.singletons.lock().get(&key) {
            return Ok(existing.clone());
        }
        // The factory may resolve other singletons, so it runs unlocked.
        let created = (registration.factory)(self)?;
        Ok(self.singletons.lock().entry(key).or_insert(created).clone())
    }
}

impl ServiceResolver for ServiceContainer {
    fn resolve_service(&self, key: ServiceKey) -> ResolutionResult<ServiceInstance> {
        if key == ServiceKey::of::<dyn ServiceProvider>() {
            return Ok(self.self_handle());
        }
        let registration = self.registration(key)?;
        match registration.lifetime {
            Lifetime::Singleton => self.resolve_singleton(key, registration),
            Lifetime::Scoped => Err(ResolutionError::ScopedFromRoot {
                type_name: key.type_name(),
            }),
            Lifetime::Transient => (registration.factory)(self),
        }
    }
}

impl ServiceProvider for ServiceContainer {
    fn create_scope(&self) -> Arc<dyn ServiceScope> {
        ContainerHandle(self.me.clone()).create_scope()
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("registrations", &self.registrations.len())
            .field("singletons", &self.singletons.lock().len())
            .field("stats", &self.stats())
            .finish()
    }
}

/// One dependency scope of a [`ServiceContainer`].
///
/// Scoped instances are cached per scope; singletons come from the root.
/// Disposing drops the cached instances and makes every later resolution
/// fail.
pub struct MemoryScope {
    id: ScopeId,
    root: Arc<ServiceContainer>,
    instances: Mutex<HashMap<ServiceKey, ServiceInstance>>,
    disposed: AtomicBool,
}

impl MemoryScope {
    /// Number of scoped instances created in this scope so far.
    pub fn cached_instances(&self) -> usize {
        self.instances.lock().len()
    }

    fn ensure_live(&self) -> ResolutionResult<()> {
        if self.is_disposed() {
            return Err(ResolutionError::ScopeDisposed {
                scope_id: self.id.to_string(),
            });
        }
        Ok(())
    }

    fn resolve_scoped(&self, key: ServiceKey, registration: &Registration) -> ResolutionResult<ServiceInstance> {
        if let Some(existing) = self.instances.lock().get(&key) {
            return Ok(existing.clone());
        }
        let created = (registration.factory)(self)?;
        let mut instances = self.instances.lock();
        // dispose() flips the flag before draining the cache under this lock
        self.ensure_live()?;
        Ok(instances.entry(key).or_insert(created).clone())
    }
}

impl ServiceResolver for MemoryScope {
    fn resolve_service(&self, key: ServiceKey) -> ResolutionResult<ServiceInstance> {
        self.ensure_live()?;
        if key == ServiceKey::of::<dyn ServiceProvider>() {
            return Ok(self.root.self_handle());
        }
        let registration = self.root.registration(key)?;
        match registration.lifetime {
            Lifetime::Singleton => self.root.resolve_singleton(key, registration),
            Lifetime::Scoped => self.resolve_scoped(key, registration),
            Lifetime::Transient => (registration.factory)(self),
        }
    }
}

impl ServiceScope for MemoryScope {
    fn id(&self) -> ScopeId {
        self.id
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let released = std::mem::take(&mut *self.instances.lock());
        self.root.scopes_disposed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(scope_id = %self.id, instances = released.len(), "scope disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for MemoryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryScope")
            .field("id", &self.id)
            .field("instances", &self.cached_instances())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

/// Weak handle to a container, handed out as `dyn ServiceProvider`.
///
/// Once the container is gone, resolutions fail and new scopes come back
/// already disposed.
struct ContainerHandle(Weak<ServiceContainer>);

impl ServiceResolver for ContainerHandle {
    fn resolve_service(&self, key: ServiceKey) -> ResolutionResult<ServiceInstance> {
        match self.0.upgrade() {
            Some(root) => root.resolve_service(key),
            None => Err(ResolutionError::NotRegistered {
                type_name: key.type_name(),
            }),
        }
    }
}

impl ServiceProvider for ContainerHandle {
    fn create_scope(&self) -> Arc<dyn ServiceScope> {
        match self.0.upgrade() {
            Some(root) => root.scope(),
            None => Arc::new(DetachedScope(ScopeId::new())),
        }
    }
}

/// Scope handed out after the container was dropped.
struct DetachedScope(ScopeId);

impl ServiceResolver for DetachedScope {
    fn resolve_service(&self, _key: ServiceKey) -> ResolutionResult<ServiceInstance> {
        Err(ResolutionError::ScopeDisposed {
            scope_id: self.0.to_string(),
        })
    }
}

impl ServiceScope for DetachedScope {
    fn id(&self) -> ScopeId {
        self.0
    }

    fn dispose(&self) {}

    fn is_disposed(&self) -> bool {
        true
    }
}
