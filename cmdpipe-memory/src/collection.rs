//! Service registrations.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cmdpipe::errors::ResolutionResult;
use cmdpipe::executor::{CommandExecutor, ExecutorOptions};
use cmdpipe::services::{ResolveExt, ServiceInstance, ServiceKey, ServiceProvider, ServiceResolver};

use crate::container::ServiceContainer;

/// How long a resolved instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// One instance for the whole container, created on first use.
    Singleton,
    /// One instance per scope.
    Scoped,
    /// A new instance for every resolution.
    Transient,
}

pub(crate) type Factory = Arc<dyn Fn(&dyn ServiceResolver) -> ResolutionResult<ServiceInstance> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) lifetime: Lifetime,
    pub(crate) factory: Factory,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

/// Builder collecting registrations before the container is created.
///
/// Factories receive the resolver they are being resolved from: the root
/// container for singletons and the current scope for scoped and transient
/// services. Registering the same type twice keeps the last registration.
#[derive(Debug, Default)]
pub struct ServiceCollection {
    registrations: HashMap<ServiceKey, Registration>,
}

impl ServiceCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` with the given lifetime.
    #[must_use]
    pub fn add<T, F>(mut self, lifetime: Lifetime, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ServiceResolver) -> ResolutionResult<Arc<T>> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move |resolver: &dyn ServiceResolver| {
            factory(resolver).map(ServiceInstance::new)
        });
        self.registrations
            .insert(ServiceKey::of::<T>(), Registration { lifetime, factory });
        self
    }

    /// Registers a lazily created singleton.
    #[must_use]
    pub fn add_singleton<T, F>(self, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ServiceResolver) -> ResolutionResult<Arc<T>> + Send + Sync + 'static,
    {
        self.add(Lifetime::Singleton, factory)
    }

    /// Registers a service created once per scope.
    #[must_use]
    pub fn add_scoped<T, F>(self, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ServiceResolver) -> ResolutionResult<Arc<T>> + Send + Sync + 'static,
    {
        self.add(Lifetime::Scoped, factory)
    }

    /// Registers a service created on every resolution.
    #[must_use]
    pub fn add_transient<T, F>(self, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ServiceResolver) -> ResolutionResult<Arc<T>> + Send + Sync + 'static,
    {
        self.add(Lifetime::Transient, factory)
    }

    /// Registers an existing instance as a singleton.
    #[must_use]
    pub fn add_instance<T>(self, instance: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add_singleton(move |_| Ok(Arc::clone(&instance)))
    }

    /// Registers a singleton [`CommandExecutor`] backed by the container
    /// being built.
    ///
    /// The executor holds a weak handle to the container, so the container
    /// can still be dropped.
    #[must_use]
    pub fn add_command_executor(self, options: ExecutorOptions) -> Self {
        self.add_singleton(move |resolver| {
            let provider = resolver.resolve::<dyn ServiceProvider>()?;
            Ok(Arc::new(CommandExecutor::new(provider, options.clone())))
        })
    }

    /// Whether `T` has a registration.
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.registrations.contains_key(&ServiceKey::of::<T>())
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Freezes the registrations into a container.
    pub fn build(self) -> Arc<ServiceContainer> {
        ServiceContainer::new(self.registrations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registrations_are_keyed_by_type() {
        let empty = ServiceCollection::new();
        assert!(empty.is_empty());

        let services = empty
            .add_instance(Arc::new(1_u32))
            .add_scoped(|_| Ok(Arc::new(2_u32)))
            .add_command_executor(ExecutorOptions::new());

        assert_eq!(services.len(), 2);
        assert!(services.contains::<u32>());
        assert!(services.contains::<CommandExecutor>());
        assert!(!services.contains::<String>());
    }
}
