//! Opt-in cancellation for the rest of the chain.

use async_trait::async_trait;

use super::{Middleware, Next};
use crate::context::ExecutionContext;
use crate::errors::{CommandError, CommandResult};

/// Stops the invocation when its cancellation token fires.
///
/// If the token is already cancelled the command never starts. Otherwise the
/// rest of the chain races the token, and the in-flight steps are dropped at
/// their next suspension point once it fires. Either way the invocation
/// fails with [`CommandError::Cancelled`].
///
/// The chain is polled before the token, so a command that completes in the
/// same wake-up as the cancellation keeps its result.
///
/// Without this middleware the executor only passes the token along.
#[derive(Debug, Clone, Copy, Default)]
pub struct CancellationMiddleware;

#[async_trait]
impl Middleware for CancellationMiddleware {
    async fn handle(&self, ctx: &mut ExecutionContext, next: Next<'_>) -> CommandResult<()> {
        let token = ctx.cancellation().clone();
        if token.is_cancelled() {
            tracing::debug!(trace_id = %ctx.trace_id(), "cancelled before execution");
            return Err(CommandError::Cancelled);
        }

        tokio::select! {
            biased;
            outcome = next.run(ctx) => outcome,
            () = token.cancelled() => {
                tracing::debug!("cancelled during execution");
                Err(CommandError::Cancelled)
            }
        }
    }

    fn name(&self) -> &str {
        "cancellation"
    }
}
