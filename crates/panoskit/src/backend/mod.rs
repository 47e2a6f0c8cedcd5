//! Backend abstraction for device entry operations.
//!
//! The [`Backend`] trait is the uniform {read, create, update, delete,
//! rename, list} interface keyed by (scope, kind, name), allowing for:
//! - The PAN-OS REST API ([`rest::RestBackend`])
//! - An in-process entry store for tests and offline runs
//!   ([`memory::MemoryBackend`])

pub mod memory;
pub mod rest;

use crate::error::Result;
use crate::location::Scope;
use crate::types::{CallContext, WireEntry};

/// Backend trait for entry operations.
///
/// Implementations report a missing entry as [`crate::Error::NotFound`] and a
/// name collision as [`crate::Error::AlreadyExists`]; everything else the
/// device rejects is [`crate::Error::Validation`].
pub trait Backend: Send + Sync {
    /// Short name for logs (e.g. "rest", "memory").
    fn name(&self) -> &'static str;

    /// Read one entry.
    fn read(&self, ctx: &CallContext, scope: &Scope, kind: &str, name: &str)
    -> Result<WireEntry>;

    /// Create an entry. Fails with `AlreadyExists` on a name collision.
    fn create(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        entry: &WireEntry,
    ) -> Result<WireEntry>;

    /// Replace the body of an existing entry.
    fn update(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        name: &str,
        entry: &WireEntry,
    ) -> Result<WireEntry>;

    /// Delete an entry.
    fn delete(&self, ctx: &CallContext, scope: &Scope, kind: &str, name: &str) -> Result<()>;

    /// Rename an entry in place.
    fn rename(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()>;

    /// List entries, optionally only those whose name starts with `prefix`.
    fn list(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<WireEntry>>;
}
