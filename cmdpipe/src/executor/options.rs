//! Executor setup: middleware order, initial shared data, configuration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::config::ExecutorConfig;
use crate::errors::ResolutionResult;
use crate::middleware::Middleware;
use crate::services::{ResolveExt, ServiceScope};

type ResolveFn = fn(&dyn ServiceScope) -> ResolutionResult<Arc<dyn Middleware>>;

/// How one pipeline stage is obtained.
#[derive(Clone)]
pub enum MiddlewareRegistration {
    /// A pre-built instance shared by every invocation.
    Instance(Arc<dyn Middleware>),
    /// Resolved by type from each invocation's scope.
    Resolved {
        /// Name of the middleware type.
        type_name: &'static str,
        /// Resolves the middleware from a scope.
        resolve: ResolveFn,
    },
}

impl MiddlewareRegistration {
    /// Registration that resolves `M` from the invocation scope.
    pub fn of<M: Middleware>() -> Self {
        Self::Resolved {
            type_name: std::any::type_name::<M>(),
            resolve: resolve_as_middleware::<M>,
        }
    }

    pub(crate) fn materialize(&self, scope: &dyn ServiceScope) -> ResolutionResult<Arc<dyn Middleware>> {
        match self {
            Self::Instance(middleware) => Ok(Arc::clone(middleware)),
            Self::Resolved { resolve, .. } => resolve(scope),
        }
    }
}

fn resolve_as_middleware<M: Middleware>(
    scope: &dyn ServiceScope,
) -> ResolutionResult<Arc<dyn Middleware>> {
    let middleware: Arc<dyn Middleware> = scope.resolve::<M>()?;
    Ok(middleware)
}

impl fmt::Debug for MiddlewareRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(middleware) => f.debug_tuple("Instance").field(&middleware.name()).finish(),
            Self::Resolved { type_name, .. } => f.debug_tuple("Resolved").field(type_name).finish(),
        }
    }
}

/// Everything a [`CommandExecutor`](super::CommandExecutor) is built from.
///
/// # Example
///
/// ```rust,ignore
/// let options = ExecutorOptions::new()
///     .with_middleware_instance(Arc::new(LoggingMiddleware::new()))
///     .with_middleware::<TenantMiddleware>()
///     .with_shared_data("region", "eu-west-1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    pub(crate) middleware: Vec<MiddlewareRegistration>,
    pub(crate) shared_data: HashMap<String, Value>,
    pub(crate) config: ExecutorConfig,
}

impl ExecutorOptions {
    /// Empty pipeline, no shared data, default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware resolved by type from each invocation's scope.
    ///
    /// `M` must be registered with the host container.
    #[must_use]
    pub fn with_middleware<M: Middleware>(mut self) -> Self {
        self.middleware.push(MiddlewareRegistration::of::<M>());
        self
    }

    /// Appends a pre-built middleware instance.
    #[must_use]
    pub fn with_middleware_instance(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(MiddlewareRegistration::Instance(middleware));
        self
    }

    /// Seeds the executor's shared data.
    #[must_use]
    pub fn with_shared_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.shared_data.insert(key.into(), value.into());
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Registered middleware, in execution order.
    pub fn middleware(&self) -> &[MiddlewareRegistration] {
        &self.middleware
    }
}
