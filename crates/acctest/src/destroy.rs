//! Destroy verification and leftover sweeping.

use anyhow::{Result, bail};
use objects::kinds;
use panoskit::{CallContext, Client, Location, Scope, resolve_for};
use std::collections::BTreeSet;

/// Every (kind, scope) pair a case created entries in.
#[derive(Debug, Clone, Default)]
pub struct Touched {
    pairs: BTreeSet<(String, Scope)>,
}

impl Touched {
    pub fn record(&mut self, kind: &str, scope: &Scope) {
        self.pairs.insert((kind.to_string(), scope.clone()));
    }

    /// Record a declared location. Unresolvable locations are skipped; the
    /// apply reports them.
    pub fn record_location(&mut self, kind: &str, location: &Location) {
        let Some(schema) = kinds::get(kind) else {
            return;
        };
        if let Ok(scope) = resolve_for(location, schema.kind, &schema.scopes) {
            self.record(schema.kind, &scope);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scope)> {
        self.pairs.iter().map(|(kind, scope)| (kind.as_str(), scope))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Whether the scope is a container the case created itself.
fn case_owned(scope: &Scope, prefix: &str) -> bool {
    match scope {
        Scope::DeviceGroup { name } | Scope::Template { name, .. } => name.starts_with(prefix),
        Scope::Panorama | Scope::Shared | Scope::Vsys { .. } => false,
    }
}

/// List every touched scope for leftovers; any remaining entry fails.
///
/// Scopes the case owns are listed whole, so entries whose names cannot
/// carry the prefix (subinterfaces such as `ethernet1/1.5`) are still
/// caught. Shared scopes are filtered by the prefix.
pub fn check_destroyed(
    client: &Client,
    call: &CallContext,
    touched: &Touched,
    prefix: &str,
) -> Result<()> {
    let mut leftovers = Vec::new();
    for (kind, scope) in touched.iter() {
        let filter = if case_owned(scope, prefix) {
            None
        } else {
            Some(prefix)
        };
        for entry in client.list(call, scope, kind, filter)? {
            leftovers.push(format!("{kind} '{}' at {scope}", entry.name));
        }
    }
    if !leftovers.is_empty() {
        bail!("entries left after destroy: {}", leftovers.join(", "));
    }
    log::debug!("destroy check passed for {} scope(s)", touched.len());
    Ok(())
}

/// Delete every entry of `kind` at `location` whose name starts with
/// `prefix`. Returns the affected names; `dry_run` only lists them.
pub fn sweep(
    client: &Client,
    call: &CallContext,
    kind: &str,
    location: &Location,
    prefix: &str,
    dry_run: bool,
) -> Result<Vec<String>> {
    if prefix.is_empty() {
        bail!("refusing to sweep without a prefix");
    }
    let schema = kinds::require(kind)?;
    let scope = resolve_for(location, schema.kind, &schema.scopes)?;
    let names: Vec<String> = client
        .list(call, &scope, schema.kind, Some(prefix))?
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    if !dry_run {
        for name in &names {
            log::info!("sweeping {kind} '{name}' at {scope}");
            client.delete(call, &scope, schema.kind, name)?;
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use panoskit::{MemoryBackend, WireEntry};
    use std::sync::Arc;

    fn setup(names: &[&str]) -> Client {
        let client = Client::new(Arc::new(MemoryBackend::new()));
        let scope = Scope::DeviceGroup { name: "dg".into() };
        for name in names {
            client
                .create(&CallContext::new(), &scope, "tag", &WireEntry::new(*name))
                .unwrap();
        }
        client
    }

    #[test]
    fn test_check_destroyed_reports_leftovers() {
        let client = setup(&["test-acc-aaaaaa-t", "prod-tag"]);
        let mut touched = Touched::default();
        touched.record_location("tag", &Location::device_group("dg"));
        assert_eq!(touched.len(), 1);

        let err = check_destroyed(&client, &CallContext::new(), &touched, "test-acc-aaaaaa")
            .unwrap_err();
        let message = format!("{err}");
        assert!(message.contains("test-acc-aaaaaa-t"));
        assert!(!message.contains("prod-tag"));

        assert!(check_destroyed(&client, &CallContext::new(), &touched, "test-acc-bbbbbb").is_ok());
    }

    #[test]
    fn test_check_destroyed_lists_owned_template_whole() {
        let client = Client::new(Arc::new(MemoryBackend::new()));
        let call = CallContext::new();
        let owned = Location::template("test-acc-aaaaaa");
        let foreign = Location::template("lab-base");
        let kind = "ethernet_layer3_subinterface";
        for location in [&owned, &foreign] {
            let scope = resolve_for(location, kind, &kinds::require(kind).unwrap().scopes).unwrap();
            client
                .create(&call, &scope, kind, &WireEntry::new("ethernet1/1.5"))
                .unwrap();
        }

        let mut touched = Touched::default();
        touched.record_location(kind, &owned);
        touched.record_location(kind, &foreign);
        assert_eq!(touched.len(), 2);

        let message = check_destroyed(&client, &call, &touched, "test-acc-aaaaaa")
            .unwrap_err()
            .to_string();
        assert!(message.contains("ethernet1/1.5' at template:test-acc-aaaaaa"), "{message}");
        assert!(!message.contains("lab-base"), "{message}");
    }

    #[test]
    fn test_record_location_skips_invalid() {
        let mut touched = Touched::default();
        touched.record_location("tag", &Location::default());
        touched.record_location("nope", &Location::shared());
        touched.record_location("template", &Location::shared());
        assert!(touched.is_empty());
    }

    #[test]
    fn test_sweep() {
        let client = setup(&["test-acc-aaaaaa-1", "test-acc-aaaaaa-2", "keep"]);
        let call = CallContext::new();
        let location = Location::device_group("dg");

        let listed = sweep(&client, &call, "tag", &location, "test-acc-", true).unwrap();
        assert_eq!(listed.len(), 2);
        let deleted = sweep(&client, &call, "tag", &location, "test-acc-", false).unwrap();
        assert_eq!(deleted, listed);
        assert!(sweep(&client, &call, "tag", &location, "test-acc-", true).unwrap().is_empty());
        assert!(sweep(&client, &call, "tag", &location, "", false).is_err());
    }
}
