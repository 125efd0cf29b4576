//! Structured logging around each invocation.

use std::time::Instant;

use async_trait::async_trait;
use tracing::Level;

use super::{Middleware, Next};
use crate::context::ExecutionContext;
use crate::errors::CommandResult;

macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {
        if $level == Level::ERROR {
            tracing::error!($($arg)+)
        } else if $level == Level::WARN {
            tracing::warn!($($arg)+)
        } else if $level == Level::INFO {
            tracing::info!($($arg)+)
        } else if $level == Level::DEBUG {
            tracing::debug!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    };
}

/// Logs the start and outcome of every command passing through it.
///
/// Place it first in the chain to see the final outcome, including errors
/// that inner middleware did not handle.
#[derive(Debug, Clone, Copy)]
pub struct LoggingMiddleware {
    level: Level,
}

impl LoggingMiddleware {
    /// Logs at `INFO`.
    pub const fn new() -> Self {
        Self { level: Level::INFO }
    }

    /// Logs at `level`.
    pub const fn with_level(level: Level) -> Self {
        Self { level }
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, ctx: &mut ExecutionContext, next: Next<'_>) -> CommandResult<()> {
        let command = ctx.command_type().name();
        let trace_id = ctx.trace_id();
        event_at!(self.level, command, %trace_id, "command starting");

        let started = Instant::now();
        let outcome = next.run(ctx).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &outcome {
            Ok(()) => event_at!(
                self.level,
                command,
                %trace_id,
                executed = ctx.is_executed(),
                has_result = ctx.has_result(),
                elapsed_ms,
                "command finished"
            ),
            Err(error) => event_at!(
                self.level,
                command,
                %trace_id,
                %error,
                elapsed_ms,
                "command failed"
            ),
        }
        outcome
    }

    fn name(&self) -> &str {
        "logging"
    }
}
