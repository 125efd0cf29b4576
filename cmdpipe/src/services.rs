//! Service resolution contract consumed by the executor.
//!
//! cmdpipe does not ship a dependency injection container of its own. Hosts
//! plug one in by implementing [`ServiceProvider`] (root resolution plus scope
//! creation) and [`ServiceScope`] (resolution within one scope). The
//! `cmdpipe-memory` crate provides a ready in-memory implementation.
//!
//! The traits are object safe: resolution goes through a [`ServiceKey`] and
//! returns a type-erased [`ServiceInstance`]. The [`ResolveExt`] extension
//! turns that back into a typed `Arc<T>`.
//!
//! ```rust,ignore
//! use cmdpipe::services::ResolveExt;
//!
//! let clock: Arc<dyn Clock> = scope.resolve::<dyn Clock>()?;
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::errors::{ResolutionError, ResolutionResult};
use crate::types::ScopeId;

/// Key identifying a service registration by type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
}

impl ServiceKey {
    /// The key for services of type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The `TypeId` of the service type.
    pub const fn type_id(&self) -> TypeId {
        self.id
    }

    /// The fully qualified name of the service type.
    pub const fn type_name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceKey").field(&self.name).finish()
    }
}

/// A resolved service with its type erased.
///
/// The concrete value is always an `Arc<T>` for the `T` named by the
/// [`ServiceKey`] it was resolved with. Use [`ServiceInstance::new`] to build
/// one and [`ServiceInstance::downcast`] to get the `Arc<T>` back.
#[derive(Clone)]
pub struct ServiceInstance(Arc<dyn Any + Send + Sync>);

impl ServiceInstance {
    /// Wraps a service.
    pub fn new<T: ?Sized + Send + Sync + 'static>(service: Arc<T>) -> Self {
        Self(Arc::new(service))
    }

    /// Recovers the typed service, or `None` if it is not an `Arc<T>`.
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.0.downcast_ref::<Arc<T>>().cloned()
    }

    /// Whether two instances refer to the same underlying service.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceInstance").finish_non_exhaustive()
    }
}

/// Anything that can resolve services by type.
pub trait ServiceResolver: Send + Sync {
    /// Resolves the service registered under `key`.
    fn resolve_service(&self, key: ServiceKey) -> ResolutionResult<ServiceInstance>;
}

/// One dependency resolution scope.
///
/// Scoped services resolve to the same instance for the lifetime of the
/// scope. After [`ServiceScope::dispose`] every resolution fails with
/// [`ResolutionError::ScopeDisposed`].
pub trait ServiceScope: ServiceResolver {
    /// Identifies this scope in logs.
    fn id(&self) -> ScopeId;

    /// Releases the scope and its scoped instances. Must be idempotent.
    fn dispose(&self);

    /// Whether [`ServiceScope::dispose`] has been called.
    fn is_disposed(&self) -> bool;
}

/// The root of a host's service container.
pub trait ServiceProvider: ServiceResolver {
    /// Creates a new, independent scope.
    fn create_scope(&self) -> Arc<dyn ServiceScope>;
}

/// Typed resolution helpers for every [`ServiceResolver`].
pub trait ResolveExt {
    /// Resolves the service registered for `T`.
    fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> ResolutionResult<Arc<T>>;

    /// Resolves `T`, returning `None` when it is not registered.
    ///
    /// Every other failure is still reported as an error.
    fn try_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> ResolutionResult<Option<Arc<T>>> {
        match self.resolve::<T>() {
            Ok(service) => Ok(Some(service)),
            Err(ResolutionError::NotRegistered { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<R: ServiceResolver + ?Sized> ResolveExt for R {
    fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> ResolutionResult<Arc<T>> {
        let key = ServiceKey::of::<T>();
        self.resolve_service(key)?
            .downcast::<T>()
            .ok_or(ResolutionError::TypeMismatch {
                type_name: key.type_name(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    struct Fixed(HashMap<ServiceKey, ServiceInstance>);

    impl ServiceResolver for Fixed {
        fn resolve_service(&self, key: ServiceKey) -> ResolutionResult<ServiceInstance> {
            self.0
                .get(&key)
                .cloned()
                .ok_or(ResolutionError::NotRegistered {
                    type_name: key.type_name(),
                })
        }
    }

    #[test]
    fn test_resolves_trait_objects_and_sized_types() {
        let mut services = HashMap::new();
        let greeter: Arc<dyn Greeter> = Arc::new(English);
        services.insert(ServiceKey::of::<dyn Greeter>(), ServiceInstance::new(greeter));
        services.insert(ServiceKey::of::<u32>(), ServiceInstance::new(Arc::new(42_u32)));
        let resolver = Fixed(services);

        assert_eq!(resolver.resolve::<dyn Greeter>().unwrap().greet(), "hello");
        assert_eq!(*resolver.resolve::<u32>().unwrap(), 42);
    }

    #[test]
    fn test_try_resolve_maps_only_not_registered_to_none() {
        let resolver = Fixed(HashMap::new());
        assert!(resolver.try_resolve::<u32>().unwrap().is_none());
    }

    #[test]
    fn test_mismatched_instance_is_reported() {
        let mut services = HashMap::new();
        services.insert(ServiceKey::of::<u32>(), ServiceInstance::new(Arc::new("nope")));
        let resolver = Fixed(services);

        assert_eq!(
            resolver.resolve::<u32>().unwrap_err(),
            ResolutionError::TypeMismatch { type_name: "u32" }
        );
    }

    #[test]
    fn test_clones_share_the_same_instance() {
        let instance = ServiceInstance::new(Arc::new(7_u64));
        let rewrapped = ServiceInstance::new(instance.downcast::<u64>().unwrap());

        assert!(instance.ptr_eq(&instance.clone()));
        assert!(!instance.ptr_eq(&rewrapped));
    }
}
