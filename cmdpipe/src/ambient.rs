//! Ambient scope bridge.
//!
//! While a command invocation runs, its dependency scope is bound to a
//! task-local slot. Code anywhere in the invocation's call graph, including
//! synchronous helpers and code resumed after an `.await` on another worker
//! thread, can reach the scope without threading a parameter through every
//! call.
//!
//! The binding belongs to the invocation's future, not to a thread:
//!
//! - concurrent invocations never observe each other's scope
//! - nested invocations shadow the outer scope and restore it on return
//! - nothing stays bound after the invocation returns
//! - tasks spawned from inside an invocation start unbound unless wrapped
//!   with [`propagate`]
//!
//! Prefer [`ExecutionContext::services`](crate::context::ExecutionContext::services)
//! when a context is at hand; this module exists for the code that has none.

use std::future::Future;
use std::sync::Arc;

use crate::errors::{ResolutionError, ResolutionResult};
use crate::services::{ResolveExt, ServiceScope};

tokio::task_local! {
    static CURRENT_SCOPE: Arc<dyn ServiceScope>;
}

/// Runs `future` with `scope` bound as the ambient scope.
pub(crate) async fn within<F: Future>(scope: Arc<dyn ServiceScope>, future: F) -> F::Output {
    CURRENT_SCOPE.scope(scope, future).await
}

/// The scope bound to the current invocation, if any.
pub fn current_scope() -> Option<Arc<dyn ServiceScope>> {
    CURRENT_SCOPE.try_with(Arc::clone).ok()
}

/// Whether the caller is running inside a command invocation.
pub fn in_invocation() -> bool {
    CURRENT_SCOPE.try_with(|_| ()).is_ok()
}

/// Resolves `T` from the ambient scope.
///
/// Fails with [`ResolutionError::NoAmbientScope`] outside an invocation.
pub fn resolve<T: ?Sized + Send + Sync + 'static>() -> ResolutionResult<Arc<T>> {
    current_scope()
        .ok_or(ResolutionError::NoAmbientScope {
            type_name: std::any::type_name::<T>(),
        })?
        .resolve::<T>()
}

/// Carries the current ambient scope into `future`.
///
/// The scope is captured when `propagate` is called, so call it inside the
/// invocation and hand the result to `tokio::spawn`. Outside an invocation
/// the future runs unbound. A spawned future that outlives its invocation
/// sees a disposed scope and its resolutions fail with
/// [`ResolutionError::ScopeDisposed`].
pub fn propagate<F: Future>(future: F) -> impl Future<Output = F::Output> {
    let scope = current_scope();
    async move {
        match scope {
            Some(scope) => within(scope, future).await,
            None => future.await,
        }
    }
}
