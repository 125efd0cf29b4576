//! In-memory service container for `cmdpipe`
//!
//! This crate provides an implementation of the
//! [`ServiceProvider`](cmdpipe::ServiceProvider) and
//! [`ServiceScope`](cmdpipe::ServiceScope) traits from the cmdpipe crate,
//! useful for tests and for hosts that do not bring their own container.
//!
//! ```rust,ignore
//! use cmdpipe_memory::ServiceCollection;
//!
//! let container = ServiceCollection::new()
//!     .add_singleton(|_| Ok(Arc::new(SystemClock)))
//!     .add_scoped(|_| Ok(Arc::new(UnitOfWork::default())))
//!     .add_command_executor(ExecutorOptions::new())
//!     .build();
//!
//! let sum = container.invoke(&SumTwoNumbers(5, 3), CancellationToken::new()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::significant_drop_tightening)]

mod collection;
mod container;

pub use collection::{Lifetime, ServiceCollection};
pub use container::{ContainerStats, MemoryScope, ServiceContainer};
