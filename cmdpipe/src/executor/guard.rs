//! Scoped acquisition of a dependency scope with guaranteed release.

use std::sync::Arc;

use crate::services::ServiceScope;

/// Owns one invocation's scope and disposes it exactly once.
///
/// Disposal happens on drop, so it also runs when the pipeline returns an
/// error, when a step panics, and when the caller drops the `invoke` future
/// before it completes.
pub(crate) struct ScopeGuard {
    scope: Arc<dyn ServiceScope>,
}

impl ScopeGuard {
    pub(crate) fn new(scope: Arc<dyn ServiceScope>) -> Self {
        tracing::trace!(scope_id = %scope.id(), "scope acquired");
        Self { scope }
    }

    pub(crate) const fn scope(&self) -> &Arc<dyn ServiceScope> {
        &self.scope
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if self.scope.is_disposed() {
            tracing::warn!(scope_id = %self.scope.id(), "scope was disposed before its invocation ended");
            return;
        }
        self.scope.dispose();
        tracing::trace!(scope_id = %self.scope.id(), "scope released");
    }
}
