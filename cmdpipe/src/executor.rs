//! Command executor orchestrating scope creation and the middleware pipeline.
//!
//! Each [`CommandExecutor::invoke`] call:
//!
//! 1. creates a fresh dependency scope from the host's [`ServiceProvider`]
//! 2. binds it as the [ambient](crate::ambient) scope for the invocation
//! 3. builds an [`ExecutionContext`] with a new trace id, the executor's
//!    shared data and empty pipeline data
//! 4. materializes the configured middleware from the scope and runs the
//!    chain, with the command as the innermost link
//! 5. disposes the scope, whatever the outcome
//!
//! The executor is `Send + Sync` and meant to be shared: many invocations
//! can run concurrently, each with its own scope and context. Only the shared
//! data store is common to all of them.

mod config;
mod guard;
mod options;

pub use config::{ExecutorConfig, SlowInvocationThresholdMs};
pub use options::{ExecutorOptions, MiddlewareRegistration};

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::ambient;
use crate::command::Command;
use crate::context::ExecutionContext;
use crate::data::DataStore;
use crate::errors::{CommandResult, ResolutionResult};
use crate::metrics::{ExecutorMetrics, MetricsSnapshot};
use crate::middleware::{CommandStep, Middleware, Next};
use crate::services::{ResolveExt, ServiceProvider, ServiceResolver, ServiceScope};
use crate::types::CommandType;
use guard::ScopeGuard;

/// Runs commands through the configured middleware pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use cmdpipe::executor::{CommandExecutor, ExecutorOptions};
///
/// let executor = CommandExecutor::new(
///     provider,
///     ExecutorOptions::new()
///         .with_middleware_instance(Arc::new(LoggingMiddleware::new())),
/// );
///
/// let sum = executor
///     .invoke(&SumTwoNumbers { left: 5, right: 3 }, CancellationToken::new())
///     .await?;
/// assert_eq!(sum, Some(8));
/// ```
pub struct CommandExecutor {
    provider: Arc<dyn ServiceProvider>,
    middleware: Vec<MiddlewareRegistration>,
    shared_data: Arc<DataStore>,
    config: ExecutorConfig,
    metrics: ExecutorMetrics,
}

impl CommandExecutor {
    /// Creates an executor resolving services from `provider`.
    pub fn new(provider: Arc<dyn ServiceProvider>, options: ExecutorOptions) -> Self {
        let ExecutorOptions {
            middleware,
            shared_data,
            config,
        } = options;

        Self {
            provider,
            middleware,
            shared_data: Arc::new(DataStore::with_entries(shared_data)),
            config,
            metrics: ExecutorMetrics::new(),
        }
    }

    /// Data shared by every invocation on this executor.
    pub fn shared_data(&self) -> &DataStore {
        &self.shared_data
    }

    /// The active configuration.
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Current invocation counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Invokes `command` through the pipeline.
    ///
    /// Returns `Some(output)` when the command ran (`Some(())` for commands
    /// without a result) and `None` when a middleware skipped it. Errors from
    /// the command or any middleware are returned unchanged. The cancellation
    /// token is handed to every step but never polled by the executor.
    pub async fn invoke<C: Command>(
        &self,
        command: &C,
        cancellation: CancellationToken,
    ) -> CommandResult<Option<C::Output>> {
        let guard = ScopeGuard::new(self.provider.create_scope());
        let scope = Arc::clone(guard.scope());
        let mut ctx = ExecutionContext::new(
            CommandType::of::<C>(),
            cancellation,
            Arc::clone(&self.shared_data),
            Arc::clone(&scope),
        );

        let span = tracing::info_span!(
            "command.invoke",
            command = ctx.command_type().name(),
            trace_id = %ctx.trace_id(),
            scope_id = %scope.id(),
        );

        let started = Instant::now();
        self.record(ExecutorMetrics::record_started);

        let outcome = ambient::within(scope, self.run_pipeline(command, &mut ctx))
            .instrument(span.clone())
            .await;

        let elapsed = started.elapsed();
        span.in_scope(|| self.finish(&mut ctx, outcome, elapsed))
    }

    fn finish<T: 'static>(
        &self,
        ctx: &mut ExecutionContext,
        outcome: CommandResult<()>,
        elapsed: Duration,
    ) -> CommandResult<Option<T>> {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        if elapsed > self.config.slow_invocation_threshold.as_duration() {
            tracing::warn!(elapsed_ms, "slow command invocation");
        }

        match outcome {
            Ok(()) if ctx.is_executed() => {
                tracing::debug!(elapsed_ms, has_result = ctx.has_result(), "command executed");
                self.record(ExecutorMetrics::record_completed);
                Ok(ctx.take_output::<T>())
            }
            Ok(()) => {
                tracing::debug!(elapsed_ms, "pipeline short-circuited before the command");
                self.record(ExecutorMetrics::record_short_circuited);
                Ok(None)
            }
            Err(error) => {
                tracing::debug!(elapsed_ms, %error, "command invocation failed");
                self.record(ExecutorMetrics::record_failed);
                Err(error)
            }
        }
    }

    async fn run_pipeline<C: Command>(&self, command: &C, ctx: &mut ExecutionContext) -> CommandResult<()> {
        tracing::debug!("command invocation started");
        let middleware = self.materialize_middleware(ctx.services().as_ref())?;
        let step = CommandStep::new(command);
        Next::new(&middleware, &step).run(ctx).await
    }

    fn materialize_middleware(
        &self,
        scope: &dyn ServiceScope,
    ) -> ResolutionResult<Vec<Arc<dyn Middleware>>> {
        self.middleware
            .iter()
            .map(|registration| registration.materialize(scope))
            .collect()
    }

    fn record(&self, update: fn(&ExecutorMetrics)) {
        if self.config.record_metrics {
            update(&self.metrics);
        }
    }
}

impl fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("middleware", &self.middleware)
            .field("shared_data", &self.shared_data)
            .field("config", &self.config)
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}

/// Invokes commands through the [`CommandExecutor`] registered with a
/// resolver.
///
/// ```rust,ignore
/// use cmdpipe::executor::InvokeExt;
///
/// let sum = container.invoke(&SumTwoNumbers { left: 5, right: 3 }, token).await?;
/// ```
#[async_trait]
pub trait InvokeExt {
    /// Resolves the executor and invokes `command`.
    async fn invoke<C: Command>(
        &self,
        command: &C,
        cancellation: CancellationToken,
    ) -> CommandResult<Option<C::Output>>;
}

#[async_trait]
impl<R: ServiceResolver + ?Sized> InvokeExt for R {
    async fn invoke<C: Command>(
        &self,
        command: &C,
        cancellation: CancellationToken,
    ) -> CommandResult<Option<C::Output>> {
        let executor = self.resolve::<CommandExecutor>()?;
        executor.invoke(command, cancellation).await
    }
}
