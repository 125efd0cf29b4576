//! Core identifier types for cmdpipe.
//!
//! Identifiers use smart constructors so an instance is always valid once it
//! exists, following the "parse, don't validate" principle.

use std::any::{type_name, TypeId};
use std::fmt;

use nutype::nutype;
use uuid::Uuid;

/// A unique identifier correlating every step of one command invocation.
///
/// `TraceId` values are guaranteed to be `UUIDv7`, so they sort by creation time
/// in logs and telemetry.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Creates a new `TraceId` with the current timestamp.
    pub fn new() -> Self {
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies one dependency-resolution scope.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct ScopeId(Uuid);

impl ScopeId {
    /// Creates a new `ScopeId` with the current timestamp.
    pub fn new() -> Self {
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of a command's runtime type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandType {
    id: TypeId,
    name: &'static str,
}

impl CommandType {
    /// Returns the identity of `C`.
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: type_name::<C>(),
        }
    }

    /// The `TypeId` of the command.
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// The fully qualified type name of the command.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this is the identity of `C`.
    pub fn is<C: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<C>()
    }
}

impl fmt::Debug for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CommandType").field(&self.name).finish()
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
