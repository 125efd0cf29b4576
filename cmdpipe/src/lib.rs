//! `cmdpipe` - Command execution pipeline with scoped dependency resolution
//!
//! Commands are self-contained units of application logic. They are invoked
//! through a [`CommandExecutor`], which gives every invocation its own
//! dependency scope, its own [`ExecutionContext`], and runs it through an
//! ordered chain of [`Middleware`] with onion-style before/after semantics.
//!
//! # Overview
//!
//! - [`command`]: the [`Command`] trait, for both value-producing and unit commands
//! - [`context`]: per-invocation state threaded through the pipeline
//! - [`data`]: shared (executor-lifetime) and pipeline (invocation-lifetime) data stores
//! - [`middleware`]: the middleware trait, the [`Next`] continuation and built-in stages
//! - [`executor`]: the orchestrator and its configuration surface
//! - [`services`]: the dependency resolution contract a host container implements
//! - [`ambient`]: task-local access to the current invocation's scope
//! - [`metrics`]: invocation counters
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cmdpipe::prelude::*;
//!
//! struct SumTwoNumbers(i64, i64);
//!
//! #[async_trait::async_trait]
//! impl Command for SumTwoNumbers {
//!     type Output = i64;
//!
//!     async fn execute(&self, _ctx: &ExecutionContext) -> CommandResult<i64> {
//!         Ok(self.0 + self.1)
//!     }
//! }
//!
//! let executor = CommandExecutor::new(provider, ExecutorOptions::new());
//! let sum = executor.invoke(&SumTwoNumbers(5, 3), CancellationToken::new()).await?;
//! assert_eq!(sum, Some(8));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ambient;
pub mod command;
pub mod context;
pub mod data;
pub mod errors;
pub mod executor;
pub mod metrics;
pub mod middleware;
pub mod services;
pub mod types;

pub use command::Command;
pub use context::ExecutionContext;
pub use data::DataStore;
pub use errors::{CommandError, CommandResult, DataError, ResolutionError};
pub use executor::{
    CommandExecutor, ExecutorConfig, ExecutorOptions, InvokeExt, MiddlewareRegistration,
    SlowInvocationThresholdMs,
};
pub use metrics::{ExecutorMetrics, MetricsSnapshot};
pub use middleware::{CancellationMiddleware, LoggingMiddleware, Middleware, Next};
pub use services::{
    ResolveExt, ServiceInstance, ServiceKey, ServiceProvider, ServiceResolver, ServiceScope,
};
pub use tokio_util::sync::CancellationToken;
pub use types::{CommandType, ScopeId, TraceId};

/// Everything needed to write commands and middleware.
pub mod prelude {
    pub use crate::command::Command;
    pub use crate::context::ExecutionContext;
    pub use crate::errors::{CommandError, CommandResult};
    pub use crate::executor::{CommandExecutor, ExecutorOptions, InvokeExt};
    pub use crate::middleware::{Middleware, Next};
    pub use crate::services::ResolveExt;
    pub use tokio_util::sync::CancellationToken;
}

#[cfg(test)]
mod testing;
