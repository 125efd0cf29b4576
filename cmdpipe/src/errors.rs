//! Error types for cmdpipe.
//!
//! Errors are split by subsystem so callers can match on what actually went
//! wrong:
//!
//! - **CommandError**: anything that stops a command invocation, raised by the
//!   command body, by a middleware, or while setting up the pipeline
//! - **DataError**: failures reading or writing a [`DataStore`](crate::data::DataStore)
//! - **ResolutionError**: failures resolving a service from a scope or provider
//!
//! The executor never wraps errors produced inside the pipeline. Whatever
//! `CommandError` a command or middleware returns is exactly what the caller
//! of [`CommandExecutor::invoke`](crate::executor::CommandExecutor::invoke)
//! receives, unless an outer middleware handles it first.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use cmdpipe::errors::{CommandError, CommandResult};
//!
//! async fn withdraw(balance: u64, amount: u64) -> CommandResult<u64> {
//!     if amount > balance {
//!         return Err(CommandError::BusinessRuleViolation(
//!             "Insufficient funds".to_string()
//!         ));
//!     }
//!     Ok(balance - amount)
//! }
//! ```

use thiserror::Error;

/// Errors that can occur while invoking a command.
///
/// # Error Handling Strategy
///
/// - **ValidationFailed**: Fix the input and invoke again
/// - **BusinessRuleViolation**: Show a user-friendly error message
/// - **Failed**: The command body failed for a domain-specific reason
/// - **Cancelled**: A cancellation-aware step observed the token and stopped
/// - **Resolution**: A required service could not be resolved from the scope
/// - **Data**: A shared or pipeline data lookup failed
/// - **Internal**: Log and investigate - indicates a bug
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// The command input was rejected.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A business rule was violated during command execution.
    #[error("Business rule violation: {0}")]
    BusinessRuleViolation(String),

    /// The command or a middleware failed.
    #[error("Command failed: {0}")]
    Failed(String),

    /// The invocation observed its cancellation token and stopped.
    #[error("Command execution was cancelled")]
    Cancelled,

    /// A service could not be resolved.
    #[error("Service resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    /// A data store operation failed.
    #[error("Data access failed: {0}")]
    Data(#[from] DataError),

    /// An unexpected internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by [`DataStore`](crate::data::DataStore) operations.
///
/// A key that exists with a `null` value is *present*; only an absent key
/// produces [`DataError::NotFound`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// The key is not present in the store.
    #[error("Key '{key}' not found")]
    NotFound {
        /// The key that was looked up
        key: String,
    },

    /// A value could not be converted into its stored representation.
    #[error("Failed to serialize value for key '{key}': {message}")]
    Serialization {
        /// The key being written
        key: String,
        /// The underlying serializer message
        message: String,
    },

    /// A stored value could not be converted into the requested type.
    #[error("Failed to deserialize value for key '{key}': {message}")]
    Deserialization {
        /// The key being read
        key: String,
        /// The underlying deserializer message
        message: String,
    },
}

/// Errors raised while resolving services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// No registration exists for the requested type.
    #[error("No service registered for type {type_name}")]
    NotRegistered {
        /// Name of the requested type
        type_name: &'static str,
    },

    /// A scoped service was requested from the root provider.
    #[error("Scoped service {type_name} cannot be resolved outside a scope")]
    ScopedFromRoot {
        /// Name of the requested type
        type_name: &'static str,
    },

    /// The scope has already been disposed.
    #[error("Scope {scope_id} has been disposed")]
    ScopeDisposed {
        /// The disposed scope
        scope_id: String,
    },

    /// Ambient resolution was attempted outside any command invocation.
    #[error("No ambient scope is bound; resolve {type_name} inside a command invocation")]
    NoAmbientScope {
        /// Name of the requested type
        type_name: &'static str,
    },

    /// The registered instance does not have the requested type.
    #[error("Service registered for {type_name} has a different type")]
    TypeMismatch {
        /// Name of the requested type
        type_name: &'static str,
    },

    /// A service factory failed.
    #[error("Factory for {type_name} failed: {message}")]
    Factory {
        /// Name of the requested type
        type_name: &'static str,
        /// What the factory reported
        message: String,
    },
}

/// Type alias for results of command execution.
pub type CommandResult<T> = Result<T, CommandError>;

/// Type alias for results of data store operations.
pub type DataResult<T> = Result<T, DataError>;

/// Type alias for results of service resolution.
pub type ResolutionResult<T> = Result<T, ResolutionError>;
