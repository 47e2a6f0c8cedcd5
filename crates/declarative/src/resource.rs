//! Resource trait for declarative entry management
//!
//! A Resource exposes the five lifecycle callbacks a controller drives:
//! create, read, update, delete and import. [`EntryResource`] implements
//! them for any kind described by an [`objects::Schema`].

use crate::context::ApplyContext;
use crate::error::Result;
use crate::executor::execute;
use crate::planner::{self, UpdateLookup};
use crate::types::{ApplyResult, Command, EntryState, EntryStatus, Outcome};
use objects::{Schema, Value, codec};
use panoskit::{Client, Location, Scope, WireEntry, resolve_for};
use std::fmt;

/// Core trait for reconciled resources
///
/// Every callback receives canonical or user trees and returns the
/// post-transition observed state. Callbacks never retry; device errors
/// surface unmodified.
pub trait Resource: Send + Sync + fmt::Debug {
    /// Object kind, e.g. `address`
    fn kind(&self) -> &'static str;

    /// Canonical desired state as it would be stored after apply
    fn plan(&self, location: &Location, desired: &Value) -> Result<EntryState>;

    /// Create a new entry; an existing entry with the same name is a conflict
    fn create(
        &self,
        ctx: &mut ApplyContext<'_>,
        location: &Location,
        desired: &Value,
    ) -> Result<Outcome>;

    /// Refresh stored state; `None` when the entry no longer exists
    fn read(&self, ctx: &mut ApplyContext<'_>, prior: &EntryState) -> Result<Option<EntryState>>;

    /// Converge an existing entry, renaming when the name changed
    fn update(
        &self,
        ctx: &mut ApplyContext<'_>,
        prior: &EntryState,
        desired: &Value,
    ) -> Result<Outcome>;

    /// Remove an entry; an already missing entry is success
    fn delete(&self, ctx: &mut ApplyContext<'_>, prior: &EntryState) -> Result<Outcome>;

    /// Adopt an existing entry into state
    fn import(
        &self,
        ctx: &mut ApplyContext<'_>,
        location: &Location,
        name: &str,
    ) -> Result<EntryState>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Schema-driven resource backed by a device client.
#[derive(Clone)]
pub struct EntryResource {
    schema: &'static Schema,
    client: Client,
}

impl fmt::Debug for EntryResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryResource")
            .field("kind", &self.schema.kind)
            .field("client", &self.client)
            .finish()
    }
}

impl EntryResource {
    pub fn new(schema: &'static Schema, client: Client) -> Self {
        Self { schema, client }
    }

    /// Resource for a registered kind.
    pub fn for_kind(kind: &str, client: Client) -> Result<Self> {
        Ok(Self::new(objects::kinds::require(kind)?, client))
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Classify `prior` against a planned state. A rename is reported as
    /// conflicted when the target name is already taken on the device.
    pub fn status(
        &self,
        ctx: &ApplyContext<'_>,
        prior: Option<&EntryState>,
        planned: &EntryState,
    ) -> Result<EntryStatus> {
        let status = EntryStatus::classify(prior, Some(&planned.attributes));
        if status != EntryStatus::Renamed {
            return Ok(status);
        }
        let scope = self.scope(&planned.location)?;
        let taken = self
            .client
            .read_optional(&ctx.call, &scope, self.schema.kind, &planned.name)?
            .is_some();
        Ok(if taken {
            EntryStatus::Conflicted
        } else {
            EntryStatus::Renamed
        })
    }

    fn scope(&self, location: &Location) -> Result<Scope> {
        Ok(resolve_for(location, self.schema.kind, &self.schema.scopes)?)
    }

    fn observe(&self, location: &Location, entry: &WireEntry) -> Result<EntryState> {
        let observed = codec::decode(self.schema, entry)?;
        EntryState::new(self.schema.kind, location, &observed)
    }

    /// Read an entry back after mutation and build its state.
    fn read_back(
        &self,
        ctx: &ApplyContext<'_>,
        scope: &Scope,
        location: &Location,
        name: &str,
        operation: &'static str,
    ) -> Result<EntryState> {
        let entry = self
            .client
            .read_optional(&ctx.call, scope, self.schema.kind, name)?
            .ok_or_else(|| crate::error::Error::Vanished {
                kind: self.schema.kind.to_string(),
                name: name.to_string(),
                operation,
            })?;
        self.observe(location, &entry)
    }

    /// Run commands and read the result back, honoring dry-run.
    fn converge(
        &self,
        ctx: &mut ApplyContext<'_>,
        scope: &Scope,
        location: &Location,
        name: &str,
        commands: Vec<Command>,
        operation: &'static str,
    ) -> Result<Outcome> {
        let summary = execute(&self.client, ctx, scope, self.schema.kind, &commands)?;
        if ctx.dry_run {
            return Ok(Outcome {
                result: ApplyResult::Skipped {
                    reason: "dry run".to_string(),
                },
                commands,
                state: None,
                summary,
            });
        }
        let state = self.read_back(ctx, scope, location, name, operation)?;
        Ok(Outcome {
            result: ApplyResult::from_commands(&commands),
            commands,
            state: Some(state),
            summary,
        })
    }

    /// Look up both names of a pending rename.
    fn look_up_update(
        &self,
        ctx: &ApplyContext<'_>,
        scope: &Scope,
        prior: &EntryState,
        desired_name: &str,
    ) -> Result<UpdateLookup> {
        if prior.name == desired_name {
            return Ok(UpdateLookup::SameName);
        }
        let kind = self.schema.kind;
        if self
            .client
            .read_optional(&ctx.call, scope, kind, desired_name)?
            .is_some()
        {
            log::debug!("{kind} rename target '{desired_name}' already exists at {scope}");
            return Ok(UpdateLookup::TargetExists);
        }
        match self.client.read_optional(&ctx.call, scope, kind, &prior.name)? {
            None => {
                log::warn!(
                    "{kind} '{}' disappeared at {scope}; creating '{desired_name}' instead of renaming",
                    prior.name
                );
                Ok(UpdateLookup::SourceMissing)
            }
            Some(entry) => Ok(UpdateLookup::SourcePresent(codec::decode(self.schema, &entry)?)),
        }
    }
}

impl Resource for EntryResource {
    fn kind(&self) -> &'static str {
        self.schema.kind
    }

    fn plan(&self, location: &Location, desired: &Value) -> Result<EntryState> {
        self.scope(location)?;
        let canonical = codec::canonicalize(self.schema, desired)?;
        EntryState::new(self.schema.kind, location, &canonical)
    }

    fn create(
        &self,
        ctx: &mut ApplyContext<'_>,
        location: &Location,
        desired: &Value,
    ) -> Result<Outcome> {
        let scope = self.scope(location)?;
        let entry = codec::encode(self.schema, desired)?;
        let existing = self
            .client
            .read_optional(&ctx.call, &scope, self.schema.kind, &entry.name)?
            .is_some();
        let name = entry.name.clone();
        let commands = planner::decide_create(&entry, existing)?;
        self.converge(ctx, &scope, location, &name, commands, "create")
    }

    fn read(&self, ctx: &mut ApplyContext<'_>, prior: &EntryState) -> Result<Option<EntryState>> {
        let scope = self.scope(&prior.location)?;
        match self
            .client
            .read_optional(&ctx.call, &scope, self.schema.kind, &prior.name)?
        {
            None => {
                log::warn!(
                    "{} '{}' no longer exists at {scope}",
                    self.schema.kind,
                    prior.name
                );
                Ok(None)
            }
            Some(entry) => self.observe(&prior.location, &entry).map(Some),
        }
    }

    fn update(
        &self,
        ctx: &mut ApplyContext<'_>,
        prior: &EntryState,
        desired: &Value,
    ) -> Result<Outcome> {
        let scope = self.scope(&prior.location)?;
        let canonical = codec::canonicalize(self.schema, desired)?;
        let entry = codec::encode(self.schema, &canonical)?;
        let lookup = self.look_up_update(ctx, &scope, prior, &entry.name)?;
        let name = entry.name.clone();
        let commands = planner::decide_update(prior, &canonical, &entry, lookup)?;
        self.converge(ctx, &scope, &prior.location, &name, commands, "update")
    }

    fn delete(&self, ctx: &mut ApplyContext<'_>, prior: &EntryState) -> Result<Outcome> {
        let scope = self.scope(&prior.location)?;
        let commands = planner::decide_delete(prior);
        let summary = execute(&self.client, ctx, &scope, self.schema.kind, &commands)?;
        let result = if ctx.dry_run {
            ApplyResult::Skipped {
                reason: "dry run".to_string(),
            }
        } else {
            ApplyResult::Removed
        };
        Ok(Outcome {
            result,
            commands,
            state: None,
            summary,
        })
    }

    fn import(
        &self,
        ctx: &mut ApplyContext<'_>,
        location: &Location,
        name: &str,
    ) -> Result<EntryState> {
        let scope = self.scope(location)?;
        let found = self
            .client
            .read_optional(&ctx.call, &scope, self.schema.kind, name)?;
        let entry = planner::decide_import(self.schema.kind, name, found)?;
        self.observe(location, &entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use panoskit::{Backend, CallContext, MemoryBackend, Operation};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (Arc<MemoryBackend>, EntryResource) {
        let backend = Arc::new(MemoryBackend::new());
        let resource = EntryResource::for_kind("address", Client::new(backend.clone())).unwrap();
        (backend, resource)
    }

    fn location() -> Location {
        Location::device_group("test-acc-abc123")
    }

    fn scope() -> Scope {
        Scope::DeviceGroup {
            name: "test-acc-abc123".into(),
        }
    }

    fn address(name: &str, netmask: &str) -> Value {
        Value::object([
            ("name", Value::from(name)),
            ("ip_netmask", Value::from(netmask)),
        ])
    }

    fn mutations(backend: &MemoryBackend) -> Vec<(Operation, String)> {
        backend
            .journal()
            .unwrap()
            .into_iter()
            .filter(|j| j.operation.is_mutation())
            .map(|j| (j.operation, j.name))
            .collect()
    }

    fn apply(resource: &EntryResource, value: &Value) -> EntryState {
        let mut ctx = ApplyContext::default();
        resource
            .create(&mut ctx, &location(), value)
            .unwrap()
            .state
            .unwrap()
    }

    #[test]
    fn test_create_then_read() {
        let (_, resource) = setup();
        let desired = address("a", "10.0.0.1/32");
        let state = apply(&resource, &desired);
        assert_eq!(state, resource.plan(&location(), &desired).unwrap());

        let mut ctx = ApplyContext::default();
        let refreshed = resource.read(&mut ctx, &state).unwrap();
        assert_eq!(refreshed, Some(state));
    }

    #[test]
    fn test_create_conflict() {
        let (backend, resource) = setup();
        apply(&resource, &address("a", "10.0.0.1/32"));
        backend.clear_journal().unwrap();

        let mut ctx = ApplyContext::default();
        let err = resource
            .create(&mut ctx, &location(), &address("a", "10.0.0.2/32"))
            .unwrap_err();
        assert_eq!(err.to_string(), "entry 'a' already exists");
        assert!(mutations(&backend).is_empty());
    }

    #[test]
    fn test_read_missing_is_absent() {
        let (backend, resource) = setup();
        let state = apply(&resource, &address("a", "10.0.0.1/32"));
        backend
            .delete(&CallContext::new(), &scope(), "address", "a")
            .unwrap();
        let mut ctx = ApplyContext::default();
        assert_eq!(resource.read(&mut ctx, &state).unwrap(), None);
    }

    #[test]
    fn test_update_is_idempotent() {
        let (backend, resource) = setup();
        let desired = address("a", "10.0.0.1/32");
        let state = apply(&resource, &desired);
        backend.clear_journal().unwrap();

        let mut ctx = ApplyContext::default();
        let outcome = resource.update(&mut ctx, &state, &desired).unwrap();
        assert_eq!(outcome.result, ApplyResult::NoChange);
        assert!(outcome.commands.is_empty());
        assert!(mutations(&backend).is_empty());
    }

    #[test]
    fn test_rename_then_update() {
        let (backend, resource) = setup();
        let state = apply(&resource, &address("p", "10.0.0.1/32"));
        backend.clear_journal().unwrap();

        let mut ctx = ApplyContext::default();
        let outcome = resource
            .update(&mut ctx, &state, &address("p-renamed", "10.0.0.2/32"))
            .unwrap();
        assert_eq!(outcome.result, ApplyResult::Renamed);
        assert_eq!(outcome.summary.renamed, 1);
        assert_eq!(outcome.summary.modified, 1);
        assert_eq!(outcome.summary.total_changes(), 2);
        let state = outcome.state.unwrap();
        assert_eq!(state.name, "p-renamed");
        assert_eq!(state.attributes.get("ip_netmask"), Some(&Value::from("10.0.0.2/32")));
        assert_eq!(
            mutations(&backend),
            vec![
                (Operation::Rename, "p".to_string()),
                (Operation::Update, "p-renamed".to_string())
            ]
        );
    }

    #[test]
    fn test_rename_preserves_body() {
        let (_, resource) = setup();
        let state = apply(&resource, &address("p", "10.0.0.1/32"));
        let mut ctx = ApplyContext::default();
        let renamed = resource
            .update(&mut ctx, &state, &address("p2", "10.0.0.1/32"))
            .unwrap()
            .state
            .unwrap();
        assert_eq!(renamed.body(), state.body());
    }

    #[test]
    fn test_rename_with_missing_source_creates() {
        let (backend, resource) = setup();
        let state = apply(&resource, &address("p", "10.0.0.1/32"));
        backend
            .delete(&CallContext::new(), &scope(), "address", "p")
            .unwrap();
        backend.clear_journal().unwrap();

        let mut ctx = ApplyContext::default();
        let outcome = resource
            .update(&mut ctx, &state, &address("p-renamed", "10.0.0.2/32"))
            .unwrap();
        assert_eq!(outcome.result, ApplyResult::Created);
        assert_eq!(
            mutations(&backend),
            vec![(Operation::Create, "p-renamed".to_string())]
        );
    }

    #[test]
    fn test_rename_into_existing_target_is_non_destructive() {
        let (backend, resource) = setup();
        let state = apply(&resource, &address("p", "10.0.0.1/32"));
        let blocker = WireEntry::new("p-renamed").with_field("fqdn", json!("blocker.example.com"));
        backend
            .create(&CallContext::new(), &scope(), "address", &blocker)
            .unwrap();
        backend.clear_journal().unwrap();

        let mut ctx = ApplyContext::default();
        let err = resource
            .update(&mut ctx, &state, &address("p-renamed", "10.0.0.2/32"))
            .unwrap_err();
        assert_eq!(err.to_string(), "entry 'p-renamed' already exists");
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert!(mutations(&backend).is_empty());

        let call = CallContext::new();
        assert_eq!(
            backend.read(&call, &scope(), "address", "p-renamed").unwrap(),
            blocker
        );
        let source = backend.read(&call, &scope(), "address", "p").unwrap();
        assert_eq!(source.fields["ip-netmask"], json!("10.0.0.1/32"));
    }

    #[test]
    fn test_status_checks_rename_target() {
        let (backend, resource) = setup();
        let state = apply(&resource, &address("p", "10.0.0.1/32"));
        let ctx = ApplyContext::default();
        let status = |desired: &Value| {
            let planned = resource.plan(&location(), desired).unwrap();
            resource.status(&ctx, Some(&state), &planned).unwrap()
        };

        assert_eq!(status(&address("p", "10.0.0.1/32")), EntryStatus::Clean);
        assert_eq!(status(&address("p", "10.0.0.2/32")), EntryStatus::Drifted);
        assert_eq!(status(&address("p2", "10.0.0.1/32")), EntryStatus::Renamed);

        backend
            .create(&CallContext::new(), &scope(), "address", &WireEntry::new("p2"))
            .unwrap();
        assert_eq!(status(&address("p2", "10.0.0.1/32")), EntryStatus::Conflicted);

        let planned = resource.plan(&location(), &address("q", "10.0.0.1/32")).unwrap();
        assert_eq!(resource.status(&ctx, None, &planned).unwrap(), EntryStatus::Absent);
    }

    #[test]
    fn test_delete_missing_is_success() {
        let (backend, resource) = setup();
        let state = apply(&resource, &address("a", "10.0.0.1/32"));
        let mut ctx = ApplyContext::default();
        resource.delete(&mut ctx, &state).unwrap();
        let outcome = resource.delete(&mut ctx, &state).unwrap();
        assert_eq!(outcome.result, ApplyResult::Removed);
        assert_eq!(backend.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_import() {
        let (_, resource) = setup();
        let state = apply(&resource, &address("a", "10.0.0.1/32"));
        let mut ctx = ApplyContext::default();
        let imported = resource.import(&mut ctx, &location(), "a").unwrap();
        assert_eq!(imported, state);

        let err = resource.import(&mut ctx, &location(), "ghost").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_invalid_location() {
        let (backend, resource) = setup();
        let mut ctx = ApplyContext::default();
        let err = resource
            .create(&mut ctx, &Location::default(), &address("a", "10.0.0.1/32"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLocation);

        let err = resource
            .create(&mut ctx, &Location::template("t"), &address("a", "10.0.0.1/32"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLocation);
        assert!(backend.journal().unwrap().is_empty());
    }

    #[test]
    fn test_schema_mismatch_is_fatal() {
        let (backend, resource) = setup();
        let state = apply(&resource, &address("a", "10.0.0.1/32"));
        let drifted = WireEntry::new("a")
            .with_field("ip-netmask", json!("10.0.0.1/32"))
            .with_field("color", json!("red"));
        backend
            .update(&CallContext::new(), &scope(), "address", "a", &drifted)
            .unwrap();
        let mut ctx = ApplyContext::default();
        let err = resource.read(&mut ctx, &state).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    }

    #[test]
    fn test_validation_error_forwarded() {
        let backend = Arc::new(MemoryBackend::new().with_validator(Box::new(
            |_: &Scope, _: &str, entry: &WireEntry| {
                if entry.fields.get("ip-netmask") == Some(&json!("bogus")) {
                    Err("'bogus' is not a valid IP address".to_string())
                } else {
                    Ok(())
                }
            },
        )));
        let resource = EntryResource::for_kind("address", Client::new(backend)).unwrap();
        let mut ctx = ApplyContext::default();
        let err = resource
            .create(&mut ctx, &location(), &address("a", "bogus"))
            .unwrap_err();
        assert_eq!(err.to_string(), "'bogus' is not a valid IP address");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_dry_run_decides_without_mutating() {
        let (backend, resource) = setup();
        let mut ctx = ApplyContext::default().with_dry_run(true);
        let outcome = resource
            .create(&mut ctx, &location(), &address("a", "10.0.0.1/32"))
            .unwrap();
        assert!(matches!(outcome.result, ApplyResult::Skipped { .. }));
        assert_eq!(outcome.commands.len(), 1);
        assert_eq!(outcome.summary.skipped, 1);
        assert_eq!(outcome.summary.total_changes(), 0);
        assert!(mutations(&backend).is_empty());
        assert_eq!(backend.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_cancellation_stops_io() {
        let (backend, resource) = setup();
        let call = CallContext::new();
        call.cancel.cancel();
        let mut ctx = ApplyContext::new(call);
        let err = resource
            .create(&mut ctx, &location(), &address("a", "10.0.0.1/32"))
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(backend.journal().unwrap().is_empty());
    }

    #[test]
    fn test_deadline_is_transport_error() {
        let backend = Arc::new(MemoryBackend::new().with_latency(Duration::from_millis(50)));
        let client = Client::new(backend).with_timeout(Duration::from_millis(5));
        let resource = EntryResource::for_kind("address", client).unwrap();
        let mut ctx = ApplyContext::default();
        let err = resource
            .create(&mut ctx, &location(), &address("a", "10.0.0.1/32"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
