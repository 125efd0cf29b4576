//! Per-invocation execution context.
//!
//! One [`ExecutionContext`] is built for every
//! [`CommandExecutor::invoke`](crate::executor::CommandExecutor::invoke) call
//! and threaded by reference through every middleware and into the command.
//! Mutations made by one step are visible to every later step and to every
//! step unwinding afterward.
//!
//! The execution state (`is_executed`, `has_result`, `result`) is written
//! only by the terminal pipeline step inside this crate. Middleware receive
//! `&mut ExecutionContext` so they can hand it on, but there is no public way
//! to change those fields. Before the command runs they read
//! `false`/`false`/`None`; after it returns they read their final values.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::data::DataStore;
use crate::services::ServiceScope;
use crate::types::{CommandType, TraceId};

/// Mutable state for one command invocation.
pub struct ExecutionContext {
    command_type: CommandType,
    cancellation: CancellationToken,
    trace_id: TraceId,
    started_at: DateTime<Utc>,
    shared_data: Arc<DataStore>,
    pipeline_data: DataStore,
    services: Arc<dyn ServiceScope>,
    executed: bool,
    has_result: bool,
    output: Option<Box<dyn Any + Send + Sync>>,
}

impl ExecutionContext {
    pub(crate) fn new(
        command_type: CommandType,
        cancellation: CancellationToken,
        shared_data: Arc<DataStore>,
        services: Arc<dyn ServiceScope>,
    ) -> Self {
        Self {
            command_type,
            cancellation,
            trace_id: TraceId::new(),
            started_at: Utc::now(),
            shared_data,
            pipeline_data: DataStore::new(),
            services,
            executed: false,
            has_result: false,
            output: None,
        }
    }

    /// The runtime type of the command being invoked.
    pub const fn command_type(&self) -> CommandType {
        self.command_type
    }

    /// The caller's cancellation token, unchanged.
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Correlates every step of this invocation.
    pub const fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// When the invocation started.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Data shared by every invocation on the same executor.
    pub fn shared_data(&self) -> &DataStore {
        &self.shared_data
    }

    /// Data visible only to this invocation.
    pub const fn pipeline_data(&self) -> &DataStore {
        &self.pipeline_data
    }

    /// The dependency scope created for this invocation.
    pub fn services(&self) -> &Arc<dyn ServiceScope> {
        &self.services
    }

    /// Whether the command body has completed successfully.
    pub const fn is_executed(&self) -> bool {
        self.executed
    }

    /// Whether the command produced a value.
    ///
    /// Always `false` for commands whose output is `()`.
    pub const fn has_result(&self) -> bool {
        self.has_result
    }

    /// The command's result, if it produced one of type `T`.
    pub fn result<T: 'static>(&self) -> Option<&T> {
        if !self.has_result {
            return None;
        }
        self.output.as_ref()?.downcast_ref::<T>()
    }

    pub(crate) fn record_output<T: Send + Sync + 'static>(&mut self, output: T, has_result: bool) {
        self.executed = true;
        self.has_result = has_result;
        self.output = Some(Box::new(output));
    }

    pub(crate) fn take_output<T: 'static>(&mut self) -> Option<T> {
        let output = self.output.take()?;
        output.downcast::<T>().ok().map(|boxed| *boxed)
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("command_type", &self.command_type)
            .field("trace_id", &self.trace_id)
            .field("scope_id", &self.services.id())
            .field("started_at", &self.started_at)
            .field("executed", &self.executed)
            .field("has_result", &self.has_result)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}
