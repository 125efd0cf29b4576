//! Command pattern implementation for cmdpipe.
//!
//! A command is a self-contained unit of application logic with a single
//! execution entry point. Commands that produce nothing use `Output = ()`;
//! commands that produce a value name its type. Both shapes run through the
//! same pipeline.
//!
//! # Example: Summing Two Numbers
//!
//! ```rust,ignore
//! use cmdpipe::command::Command;
//! use cmdpipe::context::ExecutionContext;
//! use cmdpipe::errors::CommandResult;
//! use async_trait::async_trait;
//!
//! struct SumTwoNumbers {
//!     left: i64,
//!     right: i64,
//! }
//!
//! #[async_trait]
//! impl Command for SumTwoNumbers {
//!     type Output = i64;
//!
//!     async fn execute(&self, _ctx: &ExecutionContext) -> CommandResult<i64> {
//!         Ok(self.left + self.right)
//!     }
//! }
//!
//! let sum = executor.invoke(&SumTwoNumbers { left: 5, right: 3 }, token).await?;
//! assert_eq!(sum, Some(8));
//! ```
//!
//! # Who Calls `execute`
//!
//! [`Command::execute`] needs an [`ExecutionContext`], and only the executor
//! can build one. Application code implements `execute` but reaches it only
//! through [`CommandExecutor::invoke`](crate::executor::CommandExecutor::invoke),
//! so every run goes through scope creation and the middleware chain.

use std::any::TypeId;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::errors::CommandResult;

/// A unit of work executed by the [`CommandExecutor`](crate::executor::CommandExecutor).
///
/// # Type Parameters
///
/// * `Output` - The value the command produces. Use `()` for commands that
///   produce nothing; the context then reports `has_result() == false` even
///   after execution.
///
/// # Implementation Guide
///
/// 1. **Fields**: Keep the command's domain arguments as plain fields
/// 2. **Dependencies**: Resolve services from `ctx.services()` (or the
///    [`ambient`](crate::ambient) bridge), never from globals
/// 3. **Cancellation**: Check `ctx.cancellation()` at points where stopping
///    early is safe; the executor never cancels a running command
/// 4. **Errors**: Return a [`CommandError`](crate::errors::CommandError); it
///    reaches the caller unchanged unless a middleware handles it
#[async_trait]
pub trait Command: Send + Sync + 'static {
    /// The value produced by a successful execution.
    type Output: Send + Sync + 'static;

    /// Runs the command's logic.
    async fn execute(&self, ctx: &ExecutionContext) -> CommandResult<Self::Output>;
}

/// Whether `T` carries a value, i.e. is anything other than `()`.
pub(crate) fn produces_value<T: 'static>() -> bool {
    TypeId::of::<T>() != TypeId::of::<()>()
}
