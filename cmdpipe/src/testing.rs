//! Minimal service provider for unit tests inside this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::{ResolutionError, ResolutionResult};
use crate::services::{ServiceInstance, ServiceKey, ServiceProvider, ServiceResolver, ServiceScope};
use crate::types::ScopeId;

type Factory = Arc<dyn Fn() -> ServiceInstance + Send + Sync>;

/// Every registration is scoped: one instance per scope.
#[derive(Default)]
pub(crate) struct TestProvider {
    factories: HashMap<ServiceKey, Factory>,
    pub(crate) disposed: Arc<AtomicUsize>,
}

impl TestProvider {
    pub(crate) fn with_scoped<T, F>(mut self, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        self.factories
            .insert(ServiceKey::of::<T>(), Arc::new(move || ServiceInstance::new(factory())));
        self
    }
}

impl ServiceResolver for TestProvider {
    fn resolve_service(&self, key: ServiceKey) -> ResolutionResult<ServiceInstance> {
        Err(ResolutionError::ScopedFromRoot {
            type_name: key.type_name(),
        })
    }
}

impl ServiceProvider for TestProvider {
    fn create_scope(&self) -> Arc<dyn ServiceScope> {
        Arc::new(TestScope {
            id: ScopeId::new(),
            factories: self.factories.clone(),
            instances: Mutex::new(HashMap::new()),
            disposed: AtomicBool::new(false),
            disposals: Arc::clone(&self.disposed),
        })
    }
}

struct TestScope {
    id: ScopeId,
    factories: HashMap<ServiceKey, Factory>,
    instances: Mutex<HashMap<ServiceKey, ServiceInstance>>,
    disposed: AtomicBool,
    disposals: Arc<AtomicUsize>,
}

impl ServiceResolver for TestScope {
    fn resolve_service(&self, key: ServiceKey) -> ResolutionResult<ServiceInstance> {
        if self.is_disposed() {
            return Err(ResolutionError::ScopeDisposed {
                scope_id: self.id.to_string(),
            });
        }
        let factory = self.factories.get(&key).ok_or(ResolutionError::NotRegistered {
            type_name: key.type_name(),
        })?;
        Ok(self
            .instances
            .lock()
            .entry(key)
            .or_insert_with(|| factory())
            .clone())
    }
}

impl ServiceScope for TestScope {
    fn id(&self) -> ScopeId {
        self.id
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.instances.lock().clear();
            self.disposals.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}
