//! Device client adapter.
//!
//! [`Client`] is what the reconciler talks to. It wraps a [`Backend`],
//! applies the default per-call deadline, refuses to start a call once the
//! context is cancelled, logs every call, and owns the two NotFound rules
//! that belong to the adapter: `read_optional` turns NotFound into `None`,
//! and `delete` treats NotFound as success.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::location::Scope;
use crate::types::{CallContext, Operation, WireEntry};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Uniform entry client keyed by (scope, kind, name).
#[derive(Clone)]
pub struct Client {
    backend: Arc<dyn Backend>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("backend", &self.backend.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Client {
    /// Create a client over a backend.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            timeout: None,
        }
    }

    /// Default deadline for calls whose context sets none.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Name of the underlying backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn effective(&self, ctx: &CallContext) -> CallContext {
        let mut ctx = ctx.clone();
        if ctx.timeout.is_none() {
            ctx.timeout = self.timeout;
        }
        ctx
    }

    fn call<T>(
        &self,
        ctx: &CallContext,
        operation: Operation,
        kind: &str,
        name: &str,
        scope: &Scope,
        f: impl FnOnce(&CallContext) -> Result<T>,
    ) -> Result<T> {
        ctx.cancel.check()?;
        let ctx = self.effective(ctx);
        let started = Instant::now();
        log::debug!("{operation} {kind} '{name}' at {scope}");
        let result = f(&ctx);
        match &result {
            Ok(_) => log::trace!(
                "{operation} {kind} '{name}' ok in {}ms",
                started.elapsed().as_millis()
            ),
            Err(e) => log::debug!("{operation} {kind} '{name}' failed: {e}"),
        }
        result
    }

    /// Read an entry; a missing entry is [`Error::NotFound`].
    pub fn read(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        name: &str,
    ) -> Result<WireEntry> {
        self.call(ctx, Operation::Read, kind, name, scope, |ctx| {
            self.backend.read(ctx, scope, kind, name)
        })
    }

    /// Read an entry; a missing entry is `None`.
    pub fn read_optional(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        name: &str,
    ) -> Result<Option<WireEntry>> {
        match self.read(ctx, scope, kind, name) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create an entry.
    pub fn create(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        entry: &WireEntry,
    ) -> Result<WireEntry> {
        self.call(ctx, Operation::Create, kind, &entry.name, scope, |ctx| {
            self.backend.create(ctx, scope, kind, entry)
        })
    }

    /// Replace the body of an existing entry.
    pub fn update(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        name: &str,
        entry: &WireEntry,
    ) -> Result<WireEntry> {
        self.call(ctx, Operation::Update, kind, name, scope, |ctx| {
            self.backend.update(ctx, scope, kind, name, entry)
        })
    }

    /// Delete an entry. Deleting a missing entry succeeds.
    pub fn delete(&self, ctx: &CallContext, scope: &Scope, kind: &str, name: &str) -> Result<()> {
        let result = self.call(ctx, Operation::Delete, kind, name, scope, |ctx| {
            self.backend.delete(ctx, scope, kind, name)
        });
        match result {
            Err(Error::NotFound { .. }) => {
                log::debug!("{kind} '{name}' already absent at {scope}");
                Ok(())
            }
            other => other,
        }
    }

    /// Rename an entry in place.
    pub fn rename(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        self.call(ctx, Operation::Rename, kind, old_name, scope, |ctx| {
            self.backend.rename(ctx, scope, kind, old_name, new_name)
        })
    }

    /// List entries, optionally filtered by name prefix.
    pub fn list(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<WireEntry>> {
        self.call(
            ctx,
            Operation::List,
            kind,
            prefix.unwrap_or("*"),
            scope,
            |ctx| self.backend.list(ctx, scope, kind, prefix),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::types::CancelToken;
    use serde_json::json;

    fn setup() -> (Arc<MemoryBackend>, Client) {
        let backend = Arc::new(MemoryBackend::new());
        let client = Client::new(backend.clone());
        (backend, client)
    }

    #[test]
    fn test_read_optional_maps_not_found() {
        let (_, client) = setup();
        let ctx = CallContext::new();
        let entry = client
            .read_optional(&ctx, &Scope::Shared, "address", "missing")
            .unwrap();
        assert!(entry.is_none());
    }

    #[test]
    fn test_delete_missing_is_success() {
        let (_, client) = setup();
        let ctx = CallContext::new();
        client
            .delete(&ctx, &Scope::Shared, "address", "missing")
            .unwrap();
    }

    #[test]
    fn test_cancelled_before_call() {
        let (backend, client) = setup();
        let cancel = CancelToken::new();
        cancel.cancel();
        let ctx = CallContext::new().with_cancel(cancel);
        let entry = WireEntry::new("a1").with_field("fqdn", json!("example.com"));
        let err = client
            .create(&ctx, &Scope::Shared, "address", &entry)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(backend.journal().unwrap().is_empty());
    }

    #[test]
    fn test_default_timeout_applies() {
        let backend = Arc::new(MemoryBackend::new().with_latency(Duration::from_millis(40)));
        let client = Client::new(backend).with_timeout(Duration::from_millis(5));
        let err = client
            .read(&CallContext::new(), &Scope::Shared, "address", "a1")
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { operation: "read", .. }));
    }

    #[test]
    fn test_context_timeout_overrides_default() {
        let backend = Arc::new(MemoryBackend::new().with_latency(Duration::from_millis(10)));
        let client = Client::new(backend).with_timeout(Duration::from_millis(1));
        let ctx = CallContext::new().with_timeout(Duration::from_secs(5));
        let err = client
            .read(&ctx, &Scope::Shared, "address", "a1")
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
