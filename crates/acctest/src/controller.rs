//! Minimal IaC controller.
//!
//! Holds state keyed by resource address, computes plans and drives the
//! resource callbacks. Only what the scenarios need: refresh, plan, apply,
//! destroy and import.

use crate::config::RenderedResource;
use anyhow::{Context, Result};
use declarative::{
    ApplyContext, AttrChange, EntryResource, EntryState, EntryStatus, ExecuteSummary,
    ProgressCallback, Resource, compute_diffs,
};
use objects::Value;
use panoskit::{CallContext, Client, Location};
use serde::Serialize;
use std::fmt;

/// Planned action for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    NoOp,
    Create,
    Update,
    /// Location changed: destroy, then create
    Replace,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::NoOp => "no-op",
            Action::Create => "create",
            Action::Update => "update",
            Action::Replace => "replace",
            Action::Delete => "delete",
        }
    }

    /// Parse the `as_str` form.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "no-op" | "noop" | "no_op" => Some(Action::NoOp),
            "create" => Some(Action::Create),
            "update" => Some(Action::Update),
            "replace" => Some(Action::Replace),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateEntry {
    pub address: String,
    pub state: EntryState,
}

/// Controller state, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct State {
    entries: Vec<StateEntry>,
}

impl State {
    pub fn get(&self, address: &str) -> Option<&EntryState> {
        self.entries
            .iter()
            .find(|e| e.address == address)
            .map(|e| &e.state)
    }

    /// Replace in place, or append when new.
    pub fn upsert(&mut self, address: &str, state: EntryState) {
        match self.entries.iter_mut().find(|e| e.address == address) {
            Some(entry) => entry.state = state,
            None => self.entries.push(StateEntry {
                address: address.to_string(),
                state,
            }),
        }
    }

    pub fn remove(&mut self, address: &str) -> Option<EntryState> {
        let pos = self.entries.iter().position(|e| e.address == address)?;
        Some(self.entries.remove(pos).state)
    }

    pub fn entries(&self) -> &[StateEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Planned change for one address.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedChange {
    pub address: String,
    pub kind: String,
    pub action: Action,
    /// How the stored entry relates to its declaration
    pub status: EntryStatus,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub changes: Vec<AttrChange>,
}

/// A full plan: one change per declared or stored address.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Plan {
    pub changes: Vec<PlannedChange>,
}

impl Plan {
    /// Whether every change is a no-op.
    pub fn is_empty(&self) -> bool {
        self.changes.iter().all(|c| c.action == Action::NoOp)
    }

    pub fn action_for(&self, address: &str) -> Option<Action> {
        self.changes
            .iter()
            .find(|c| c.address == address)
            .map(|c| c.action)
    }

    /// Changes other than no-ops.
    pub fn pending(&self) -> impl Iterator<Item = &PlannedChange> {
        self.changes.iter().filter(|c| c.action != Action::NoOp)
    }

    /// One line per pending change, e.g. `update panos_address.a`.
    pub fn describe(&self) -> String {
        self.pending()
            .map(|c| format!("{} {}", c.action, c.address))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Drives resource callbacks against one client.
pub struct Controller {
    client: Client,
    call: CallContext,
    state: State,
    progress: Option<Box<dyn ProgressCallback>>,
    applied: ExecuteSummary,
}

impl Controller {
    pub fn new(client: Client, call: CallContext) -> Self {
        Self {
            client,
            call,
            state: State::default(),
            progress: None,
            applied: ExecuteSummary::default(),
        }
    }

    /// Observe every executed command.
    #[must_use]
    pub fn with_progress(mut self, progress: Box<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Replace the context used for later calls.
    pub fn set_call(&mut self, call: CallContext) {
        self.call = call;
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Commands sent by the most recent [`Controller::apply`], including
    /// those of a partial apply that stopped at an error.
    pub fn applied(&self) -> &ExecuteSummary {
        &self.applied
    }

    fn resource(&self, kind: &str) -> Result<EntryResource> {
        Ok(EntryResource::for_kind(kind, self.client.clone())?)
    }

    fn context(&mut self) -> ApplyContext<'_> {
        let ctx = ApplyContext::new(self.call.clone());
        match self.progress.as_mut() {
            Some(progress) => ctx.with_progress(&mut **progress),
            None => ctx,
        }
    }

    /// Re-read every stored entry; entries gone from the device are dropped.
    pub fn refresh(&mut self) -> Result<()> {
        let addresses: Vec<(String, EntryState)> = self
            .state
            .entries()
            .iter()
            .map(|e| (e.address.clone(), e.state.clone()))
            .collect();
        for (address, prior) in addresses {
            let resource = self.resource(&prior.kind)?;
            let mut ctx = self.context();
            let refreshed = resource
                .read(&mut ctx, &prior)
                .with_context(|| format!("refreshing {address}"))?;
            match refreshed {
                Some(state) => self.state.upsert(&address, state),
                None => {
                    log::info!("{address} was removed outside of the controller");
                    self.state.remove(&address);
                }
            }
        }
        Ok(())
    }

    /// Compare stored state with the declared resources.
    pub fn plan(&self, config: &[RenderedResource]) -> Result<Plan> {
        let mut plan = Plan::default();
        for declared in config {
            let resource = self.resource(&declared.kind)?;
            let planned = resource
                .plan(&declared.location, &declared.desired)
                .with_context(|| declared.address.clone())?;
            let prior = self.state.get(&declared.address);
            let status = resource
                .status(&ApplyContext::new(self.call.clone()), prior, &planned)
                .with_context(|| declared.address.clone())?;
            let action = match prior {
                None => Action::Create,
                Some(prior) if prior.location != declared.location => Action::Replace,
                Some(prior) if prior.attributes == planned.attributes => Action::NoOp,
                Some(_) => Action::Update,
            };
            let before = prior.map(|p| p.attributes.clone());
            let changes = compute_diffs(
                before.as_ref().unwrap_or(&Value::Null),
                &planned.attributes,
            );
            plan.changes.push(PlannedChange {
                address: declared.address.clone(),
                kind: declared.kind.clone(),
                action,
                status,
                before,
                after: Some(planned.attributes),
                changes,
            });
        }
        for entry in self.state.entries() {
            if config.iter().any(|d| d.address == entry.address) {
                continue;
            }
            plan.changes.push(PlannedChange {
                address: entry.address.clone(),
                kind: entry.state.kind.clone(),
                action: Action::Delete,
                status: EntryStatus::classify(Some(&entry.state), None),
                before: Some(entry.state.attributes.clone()),
                after: None,
                changes: compute_diffs(&entry.state.attributes, &Value::Null),
            });
        }
        Ok(plan)
    }

    /// Plan and execute. Deletes run first in reverse creation order, then
    /// declared resources in config order. Stops at the first error; state
    /// keeps every completed transition.
    pub fn apply(&mut self, config: &[RenderedResource]) -> Result<Plan> {
        let plan = self.plan(config)?;
        self.applied = ExecuteSummary::default();

        let orphans: Vec<String> = self
            .state
            .entries()
            .iter()
            .rev()
            .filter(|e| plan.action_for(&e.address) == Some(Action::Delete))
            .map(|e| e.address.clone())
            .collect();
        for address in orphans {
            self.delete(&address)?;
        }

        for declared in config {
            match plan.action_for(&declared.address) {
                Some(Action::Create) => self.create(declared)?,
                Some(Action::Update) => self.update(declared)?,
                Some(Action::Replace) => {
                    self.delete(&declared.address)?;
                    self.create(declared)?;
                }
                _ => {}
            }
        }
        Ok(plan)
    }

    fn create(&mut self, declared: &RenderedResource) -> Result<()> {
        let resource = self.resource(&declared.kind)?;
        let mut ctx = self.context();
        let outcome = resource
            .create(&mut ctx, &declared.location, &declared.desired)
            .with_context(|| format!("creating {}", declared.address))?;
        self.applied.merge(&outcome.summary);
        if let Some(state) = outcome.state {
            self.state.upsert(&declared.address, state);
        }
        Ok(())
    }

    fn update(&mut self, declared: &RenderedResource) -> Result<()> {
        let resource = self.resource(&declared.kind)?;
        let prior = self
            .state
            .get(&declared.address)
            .cloned()
            .with_context(|| format!("{} is not in state", declared.address))?;
        let mut ctx = self.context();
        let outcome = resource
            .update(&mut ctx, &prior, &declared.desired)
            .with_context(|| format!("updating {}", declared.address))?;
        self.applied.merge(&outcome.summary);
        if let Some(state) = outcome.state {
            self.state.upsert(&declared.address, state);
        }
        Ok(())
    }

    fn delete(&mut self, address: &str) -> Result<()> {
        let Some(prior) = self.state.get(address).cloned() else {
            return Ok(());
        };
        let resource = self.resource(&prior.kind)?;
        let mut ctx = self.context();
        let outcome = resource
            .delete(&mut ctx, &prior)
            .with_context(|| format!("destroying {address}"))?;
        self.applied.merge(&outcome.summary);
        self.state.remove(address);
        Ok(())
    }

    /// Destroy everything in reverse creation order. Keeps going past
    /// failures and reports them together.
    pub fn destroy(&mut self) -> Result<()> {
        let addresses: Vec<String> = self
            .state
            .entries()
            .iter()
            .rev()
            .map(|e| e.address.clone())
            .collect();
        let mut failures = Vec::new();
        for address in addresses {
            if let Err(e) = self.delete(&address) {
                log::warn!("{e:#}");
                failures.push(format!("{e:#}"));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("destroy failed: {}", failures.join("; "))
        }
    }

    /// Adopt an existing entry under `address`.
    pub fn import(
        &mut self,
        address: &str,
        kind: &str,
        location: &Location,
        name: &str,
    ) -> Result<EntryState> {
        let resource = self.resource(kind)?;
        let mut ctx = self.context();
        let state = resource
            .import(&mut ctx, location, name)
            .with_context(|| format!("importing {address}"))?;
        self.state.upsert(address, state.clone());
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panoskit::{Backend, MemoryBackend, Scope};
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryBackend>, Controller) {
        let backend = Arc::new(MemoryBackend::new());
        let controller = Controller::new(Client::new(backend.clone()), CallContext::new());
        (backend, controller)
    }

    fn address(label: &str, name: &str, location: Location) -> RenderedResource {
        RenderedResource {
            address: format!("panos_address.{label}"),
            kind: "address".into(),
            location,
            desired: Value::object([
                ("name", Value::from(name)),
                ("fqdn", Value::from("example.com")),
            ]),
        }
    }

    #[test]
    fn test_first_plan_creates() {
        let (_, controller) = setup();
        let plan = controller
            .plan(&[address("a", "a", Location::shared())])
            .unwrap();
        assert_eq!(plan.action_for("panos_address.a"), Some(Action::Create));
        assert!(!plan.is_empty());
        assert_eq!(plan.describe(), "create panos_address.a");
        assert_eq!(plan.changes[0].status, EntryStatus::Absent);
    }

    #[test]
    fn test_plan_records_status() {
        let (_, mut controller) = setup();
        controller
            .apply(&[
                address("a", "a", Location::shared()),
                address("b", "b", Location::shared()),
            ])
            .unwrap();
        let plan = controller
            .plan(&[address("a", "a-renamed", Location::shared())])
            .unwrap();
        let status = |addr: &str| {
            plan.changes
                .iter()
                .find(|c| c.address == addr)
                .map(|c| c.status)
        };
        assert_eq!(status("panos_address.a"), Some(EntryStatus::Renamed));
        assert_eq!(status("panos_address.b"), Some(EntryStatus::Orphaned));

        let plan = controller
            .plan(&[
                address("a", "b", Location::shared()),
                address("b", "b", Location::shared()),
            ])
            .unwrap();
        assert_eq!(plan.changes[0].status, EntryStatus::Conflicted);
        assert_eq!(plan.changes[1].status, EntryStatus::Clean);
    }

    #[test]
    fn test_apply_counts_commands() {
        let (_, mut controller) = setup();
        controller
            .apply(&[
                address("a", "a", Location::shared()),
                address("b", "b", Location::shared()),
            ])
            .unwrap();
        assert_eq!(controller.applied().created, 2);

        controller
            .apply(&[address("a", "a-renamed", Location::shared())])
            .unwrap();
        let applied = controller.applied();
        assert_eq!(applied.renamed, 1);
        assert_eq!(applied.removed, 1);
        assert_eq!(applied.created, 0);
        assert_eq!(applied.total_changes(), 2);

        controller
            .apply(&[address("a", "a-renamed", Location::shared())])
            .unwrap();
        assert_eq!(controller.applied().total_changes(), 0);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let (_, mut controller) = setup();
        let config = [address("a", "a", Location::shared())];
        controller.apply(&config).unwrap();
        controller.refresh().unwrap();
        let plan = controller.plan(&config).unwrap();
        assert!(plan.is_empty(), "{}", plan.describe());
    }

    #[test]
    fn test_refresh_drops_missing() {
        let (backend, mut controller) = setup();
        let config = [address("a", "a", Location::shared())];
        controller.apply(&config).unwrap();
        backend
            .delete(&CallContext::new(), &Scope::Shared, "address", "a")
            .unwrap();
        controller.refresh().unwrap();
        assert!(controller.state().is_empty());
        let plan = controller.plan(&config).unwrap();
        assert_eq!(plan.action_for("panos_address.a"), Some(Action::Create));
    }

    #[test]
    fn test_location_change_replaces() {
        let (backend, mut controller) = setup();
        controller
            .apply(&[address("a", "a", Location::device_group("dg1"))])
            .unwrap();
        let moved = [address("a", "a", Location::device_group("dg2"))];
        let plan = controller.apply(&moved).unwrap();
        assert_eq!(plan.action_for("panos_address.a"), Some(Action::Replace));
        assert_eq!(controller.state().get("panos_address.a").unwrap().location, moved[0].location);
        assert_eq!(backend.entry_count().unwrap(), 1);
    }

    #[test]
    fn test_removed_declaration_deletes() {
        let (backend, mut controller) = setup();
        controller
            .apply(&[
                address("a", "a", Location::shared()),
                address("b", "b", Location::shared()),
            ])
            .unwrap();
        let plan = controller
            .apply(&[address("a", "a", Location::shared())])
            .unwrap();
        assert_eq!(plan.action_for("panos_address.b"), Some(Action::Delete));
        assert_eq!(controller.state().len(), 1);
        assert_eq!(backend.entry_count().unwrap(), 1);
    }

    #[test]
    fn test_destroy_reverse_order() {
        let (backend, mut controller) = setup();
        controller
            .apply(&[
                address("first", "first", Location::shared()),
                address("second", "second", Location::shared()),
            ])
            .unwrap();
        backend.clear_journal().unwrap();
        controller.destroy().unwrap();
        let deleted: Vec<String> = backend
            .journal()
            .unwrap()
            .into_iter()
            .map(|j| j.name)
            .collect();
        assert_eq!(deleted, vec!["second", "first"]);
        assert!(controller.state().is_empty());
    }

    #[test]
    fn test_apply_error_keeps_completed_state() {
        let (_, mut controller) = setup();
        let mut broken = address("b", "b", Location::shared());
        broken.desired.set("bogus", Value::from("x"));
        let err = controller
            .apply(&[address("a", "a", Location::shared()), broken])
            .unwrap_err();
        assert!(format!("{err:#}").contains("unsupported attribute 'bogus'"));
        assert!(controller.state().is_empty());

        let mut controller = setup().1;
        let config = [address("a", "a", Location::shared())];
        controller.apply(&config).unwrap();
        let mut conflicting = address("b", "a", Location::shared());
        conflicting.desired.set("fqdn", Value::from("other.com"));
        let err = controller
            .apply(&[config[0].clone(), conflicting])
            .unwrap_err();
        assert!(format!("{err:#}").contains("entry 'a' already exists"));
        assert_eq!(controller.state().len(), 1);
    }

    #[test]
    fn test_import() {
        let (_, mut controller) = setup();
        let config = [address("a", "a", Location::shared())];
        controller.apply(&config).unwrap();
        let applied = controller.state().get("panos_address.a").unwrap().clone();

        let mut fresh = Controller::new(controller.client().clone(), CallContext::new());
        let imported = fresh
            .import("panos_address.a", "address", &Location::shared(), "a")
            .unwrap();
        assert_eq!(imported, applied);
    }
}
