//! In-process entry store.
//!
//! Implements the [`Backend`] contract over a map of entries without any
//! PAN-OS semantics. Test suites and offline runs use it; it can also inject
//! latency, failures and validation errors, and journals every call.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::location::Scope;
use crate::types::{CallContext, Operation, WireEntry};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Validation hook: return `Err(message)` to reject an entry on create/update.
pub type Validator = Box<dyn Fn(&Scope, &str, &WireEntry) -> std::result::Result<(), String> + Send + Sync>;

/// One journaled backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub operation: Operation,
    pub scope: Scope,
    pub kind: String,
    pub name: String,
}

#[derive(Debug)]
struct InjectedFailure {
    operation: Operation,
    kind: String,
    error: Error,
}

#[derive(Debug, Default)]
struct Store {
    entries: BTreeMap<(Scope, String), BTreeMap<String, WireEntry>>,
    journal: Vec<JournalEntry>,
    failures: Vec<InjectedFailure>,
}

/// Backend keeping entries in memory.
#[derive(Default)]
pub struct MemoryBackend {
    store: Mutex<Store>,
    latency: Option<Duration>,
    validator: Option<Validator>,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("latency", &self.latency)
            .field("validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

impl MemoryBackend {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Reject entries the validator refuses, as a device would.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Fail the next `operation` on `kind` with `error`.
    pub fn fail_next(&self, operation: Operation, kind: &str, error: Error) -> Result<()> {
        self.lock()?.failures.push(InjectedFailure {
            operation,
            kind: kind.to_string(),
            error,
        });
        Ok(())
    }

    /// Every call made so far, in order.
    pub fn journal(&self) -> Result<Vec<JournalEntry>> {
        Ok(self.lock()?.journal.clone())
    }

    /// Forget journaled calls.
    pub fn clear_journal(&self) -> Result<()> {
        self.lock()?.journal.clear();
        Ok(())
    }

    /// Total number of stored entries across all scopes and kinds.
    pub fn entry_count(&self) -> Result<usize> {
        Ok(self.lock()?.entries.values().map(BTreeMap::len).sum())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|_| Error::Other("memory backend lock poisoned".to_string()))
    }

    /// Journal the call, apply latency and deadline, and pop injected failures.
    fn begin(
        &self,
        ctx: &CallContext,
        operation: Operation,
        scope: &Scope,
        kind: &str,
        name: &str,
    ) -> Result<MutexGuard<'_, Store>> {
        ctx.cancel.check()?;

        if let Some(latency) = self.latency {
            match ctx.timeout {
                Some(timeout) if latency > timeout => {
                    thread::sleep(timeout);
                    return Err(Error::Timeout {
                        operation: operation.as_str(),
                        after: timeout,
                    });
                }
                _ => thread::sleep(latency),
            }
        }

        let mut store = self.lock()?;
        store.journal.push(JournalEntry {
            operation,
            scope: scope.clone(),
            kind: kind.to_string(),
            name: name.to_string(),
        });

        if let Some(pos) = store
            .failures
            .iter()
            .position(|f| f.operation == operation && f.kind == kind)
        {
            let failure = store.failures.remove(pos);
            return Err(failure.error);
        }

        Ok(store)
    }

    fn validate(&self, scope: &Scope, kind: &str, entry: &WireEntry) -> Result<()> {
        if let Some(validator) = &self.validator {
            validator(scope, kind, entry).map_err(|message| Error::Validation { message })?;
        }
        Ok(())
    }
}

fn bucket_key(scope: &Scope, kind: &str) -> (Scope, String) {
    (scope.clone(), kind.to_string())
}

impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn read(&self, ctx: &CallContext, scope: &Scope, kind: &str, name: &str) -> Result<WireEntry> {
        let store = self.begin(ctx, Operation::Read, scope, kind, name)?;
        store
            .entries
            .get(&bucket_key(scope, kind))
            .and_then(|bucket| bucket.get(name))
            .cloned()
            .ok_or_else(|| Error::not_found(kind, name))
    }

    fn create(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        entry: &WireEntry,
    ) -> Result<WireEntry> {
        let mut store = self.begin(ctx, Operation::Create, scope, kind, &entry.name)?;
        let bucket = store.entries.entry(bucket_key(scope, kind)).or_default();
        if bucket.contains_key(&entry.name) {
            return Err(Error::already_exists(&entry.name));
        }
        self.validate(scope, kind, entry)?;
        bucket.insert(entry.name.clone(), entry.clone());
        Ok(entry.clone())
    }

    fn update(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        name: &str,
        entry: &WireEntry,
    ) -> Result<WireEntry> {
        let mut store = self.begin(ctx, Operation::Update, scope, kind, name)?;
        let bucket = store.entries.entry(bucket_key(scope, kind)).or_default();
        if !bucket.contains_key(name) {
            return Err(Error::not_found(kind, name));
        }
        let updated = entry.renamed(name);
        self.validate(scope, kind, &updated)?;
        bucket.insert(name.to_string(), updated.clone());
        Ok(updated)
    }

    fn delete(&self, ctx: &CallContext, scope: &Scope, kind: &str, name: &str) -> Result<()> {
        let mut store = self.begin(ctx, Operation::Delete, scope, kind, name)?;
        let removed = store
            .entries
            .get_mut(&bucket_key(scope, kind))
            .and_then(|bucket| bucket.remove(name));
        match removed {
            Some(_) => Ok(()),
            None => Err(Error::not_found(kind, name)),
        }
    }

    fn rename(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        let mut store = self.begin(ctx, Operation::Rename, scope, kind, old_name)?;
        let bucket = store.entries.entry(bucket_key(scope, kind)).or_default();
        if bucket.contains_key(new_name) {
            return Err(Error::already_exists(new_name));
        }
        let entry = bucket
            .remove(old_name)
            .ok_or_else(|| Error::not_found(kind, old_name))?;
        bucket.insert(new_name.to_string(), entry.renamed(new_name));
        Ok(())
    }

    fn list(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<WireEntry>> {
        let store = self.begin(ctx, Operation::List, scope, kind, prefix.unwrap_or_default())?;
        let Some(bucket) = store.entries.get(&bucket_key(scope, kind)) else {
            return Ok(Vec::new());
        };
        Ok(bucket
            .values()
            .filter(|entry| prefix.is_none_or(|p| entry.name.starts_with(p)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CancelToken;
    use serde_json::json;

    fn dg() -> Scope {
        Scope::DeviceGroup {
            name: "dg1".to_string(),
        }
    }

    fn address(name: &str, netmask: &str) -> WireEntry {
        WireEntry::new(name).with_field("ip-netmask", json!(netmask))
    }

    #[test]
    fn test_create_read_delete() {
        let backend = MemoryBackend::new();
        let ctx = CallContext::new();
        backend
            .create(&ctx, &dg(), "address", &address("a1", "10.0.0.1/32"))
            .unwrap();

        let entry = backend.read(&ctx, &dg(), "address", "a1").unwrap();
        assert_eq!(entry.fields["ip-netmask"], json!("10.0.0.1/32"));

        backend.delete(&ctx, &dg(), "address", "a1").unwrap();
        assert!(backend.read(&ctx, &dg(), "address", "a1").unwrap_err().is_not_found());
    }

    #[test]
    fn test_create_existing_fails() {
        let backend = MemoryBackend::new();
        let ctx = CallContext::new();
        let entry = address("a1", "10.0.0.1/32");
        backend.create(&ctx, &dg(), "address", &entry).unwrap();
        let err = backend.create(&ctx, &dg(), "address", &entry).unwrap_err();
        assert_eq!(err.to_string(), "entry 'a1' already exists");
    }

    #[test]
    fn test_scopes_are_disjoint() {
        let backend = MemoryBackend::new();
        let ctx = CallContext::new();
        backend
            .create(&ctx, &dg(), "address", &address("a1", "10.0.0.1/32"))
            .unwrap();
        assert!(backend.read(&ctx, &Scope::Shared, "address", "a1").is_err());
        assert!(backend.read(&ctx, &dg(), "tag", "a1").is_err());
    }

    #[test]
    fn test_rename() {
        let backend = MemoryBackend::new();
        let ctx = CallContext::new();
        backend
            .create(&ctx, &dg(), "address", &address("a1", "10.0.0.1/32"))
            .unwrap();
        backend
            .create(&ctx, &dg(), "address", &address("a2", "10.0.0.2/32"))
            .unwrap();

        let err = backend.rename(&ctx, &dg(), "address", "a1", "a2").unwrap_err();
        assert!(err.is_already_exists());

        backend.rename(&ctx, &dg(), "address", "a1", "a3").unwrap();
        let entry = backend.read(&ctx, &dg(), "address", "a3").unwrap();
        assert_eq!(entry.name, "a3");
        assert_eq!(entry.fields["ip-netmask"], json!("10.0.0.1/32"));

        let err = backend.rename(&ctx, &dg(), "address", "a1", "a4").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_with_prefix() {
        let backend = MemoryBackend::new();
        let ctx = CallContext::new();
        for name in ["test-acc-x-1", "test-acc-x-2", "other"] {
            backend
                .create(&ctx, &dg(), "address", &address(name, "10.0.0.1/32"))
                .unwrap();
        }
        let entries = backend
            .list(&ctx, &dg(), "address", Some("test-acc-x"))
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(backend.list(&ctx, &dg(), "address", None).unwrap().len(), 3);
    }

    #[test]
    fn test_validator_rejects_entry() {
        let backend = MemoryBackend::new().with_validator(Box::new(|_, kind, entry| {
            if kind == "address_group" && entry.fields.contains_key("static") {
                return Err("static 'missing' is not a valid reference".to_string());
            }
            Ok(())
        }));
        let ctx = CallContext::new();
        let entry = WireEntry::new("g1").with_field("static", json!({"member": ["missing"]}));
        let err = backend
            .create(&ctx, &dg(), "address_group", &entry)
            .unwrap_err();
        assert_eq!(err.to_string(), "static 'missing' is not a valid reference");
        assert_eq!(backend.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_injected_failure_is_consumed_once() {
        let backend = MemoryBackend::new();
        let ctx = CallContext::new();
        backend
            .fail_next(
                Operation::Create,
                "address",
                Error::transport("connection reset", None),
            )
            .unwrap();
        let entry = address("a1", "10.0.0.1/32");
        assert!(backend.create(&ctx, &dg(), "address", &entry).is_err());
        assert!(backend.create(&ctx, &dg(), "address", &entry).is_ok());
    }

    #[test]
    fn test_latency_beyond_deadline_times_out() {
        let backend = MemoryBackend::new().with_latency(Duration::from_millis(50));
        let ctx = CallContext::new().with_timeout(Duration::from_millis(5));
        let err = backend
            .create(&ctx, &dg(), "address", &address("a1", "10.0.0.1/32"))
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { operation: "create", .. }));
        assert_eq!(backend.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_cancelled_context_makes_no_call() {
        let backend = MemoryBackend::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let ctx = CallContext::new().with_cancel(cancel);
        let err = backend.read(&ctx, &dg(), "address", "a1").unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(backend.journal().unwrap().is_empty());
    }

    #[test]
    fn test_journal_records_calls_in_order() {
        let backend = MemoryBackend::new();
        let ctx = CallContext::new();
        let _ = backend.read(&ctx, &dg(), "address", "a1");
        backend
            .create(&ctx, &dg(), "address", &address("a1", "10.0.0.1/32"))
            .unwrap();
        let ops: Vec<Operation> = backend
            .journal()
            .unwrap()
            .into_iter()
            .map(|j| j.operation)
            .collect();
        assert_eq!(ops, vec![Operation::Read, Operation::Create]);
    }
}
