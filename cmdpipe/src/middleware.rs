//! Middleware chain wrapping command execution.
//!
//! Middleware form an onion around the command. The executor walks the list
//! from index 0: each middleware receives the context and a [`Next`] bound to
//! the rest of the chain. The last link runs the command itself.
//!
//! ```text
//! invoke ─▶ A before ─▶ B before ─▶ command ─▶ B after ─▶ A after ─▶ return
//! ```
//!
//! A middleware may:
//!
//! - inspect or mutate the context (data stores) before calling `next`
//! - skip `next` entirely, in which case the command never runs
//! - handle an error returned by `next`
//! - do work after `next` returns, when the execution state is final
//!
//! [`Next::run`] consumes the continuation, so the rest of the chain can run
//! at most once per middleware.
//!
//! # Example: Recording Order
//!
//! ```rust,ignore
//! use cmdpipe::middleware::{Middleware, Next};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Middleware for Audit {
//!     async fn handle(&self, ctx: &mut ExecutionContext, next: Next<'_>) -> CommandResult<()> {
//!         ctx.pipeline_data().set("audited", true);
//!         let outcome = next.run(ctx).await;
//!         tracing::info!(executed = ctx.is_executed(), "audit complete");
//!         outcome
//!     }
//! }
//! ```

mod cancellation;
mod logging;

pub use cancellation::CancellationMiddleware;
pub use logging::LoggingMiddleware;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::command::{produces_value, Command};
use crate::context::ExecutionContext;
use crate::errors::CommandResult;

/// A pipeline stage wrapping command execution.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Handles one invocation. Call `next.run(ctx)` to continue the chain.
    async fn handle(&self, ctx: &mut ExecutionContext, next: Next<'_>) -> CommandResult<()>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// The innermost link of the chain.
#[async_trait]
pub(crate) trait Terminal: Send + Sync {
    async fn complete(&self, ctx: &mut ExecutionContext) -> CommandResult<()>;
}

/// Terminal link that runs a command and records its output.
pub(crate) struct CommandStep<'c, C> {
    command: &'c C,
}

impl<'c, C> CommandStep<'c, C> {
    pub(crate) const fn new(command: &'c C) -> Self {
        Self { command }
    }
}

#[async_trait]
impl<C: Command> Terminal for CommandStep<'_, C> {
    async fn complete(&self, ctx: &mut ExecutionContext) -> CommandResult<()> {
        let output = self.command.execute(ctx).await?;
        ctx.record_output(output, produces_value::<C::Output>());
        Ok(())
    }
}

/// Continuation to the remainder of the pipeline.
pub struct Next<'a> {
    middleware: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn Terminal,
}

impl<'a> Next<'a> {
    pub(crate) fn new(middleware: &'a [Arc<dyn Middleware>], terminal: &'a dyn Terminal) -> Self {
        Self {
            middleware,
            terminal,
        }
    }

    /// Number of middleware still ahead of the command.
    pub const fn remaining(&self) -> usize {
        self.middleware.len()
    }

    /// Runs the rest of the chain: the next middleware, or the command if
    /// this is the last link.
    pub fn run<'c>(self, ctx: &'c mut ExecutionContext) -> BoxFuture<'c, CommandResult<()>>
    where
        'a: 'c,
    {
        Box::pin(async move {
            match self.middleware.split_first() {
                Some((current, rest)) => {
                    tracing::trace!(middleware = current.name(), "entering middleware");
                    current.handle(ctx, Next::new(rest, self.terminal)).await
                }
                None => self.terminal.complete(ctx).await,
            }
        })
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.middleware.len())
            .finish_non_exhaustive()
    }
}
