//! Pre-config hooks: device operations performed out of band before a step.

use crate::config::Interpolator;
use anyhow::{Context, Result};
use objects::{Value, codec, kinds, location_from_value};
use panoskit::{CallContext, Client, Location, Scope, resolve_for};
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

/// Closure hook.
pub type HookFn = Arc<dyn Fn(&HookContext<'_>) -> Result<()> + Send + Sync>;

/// An out-of-band device operation.
#[derive(Clone)]
pub enum Hook {
    CreateEntry {
        kind: String,
        location: Value,
        attributes: Value,
    },
    UpdateEntry {
        kind: String,
        location: Value,
        attributes: Value,
    },
    DeleteEntry {
        kind: String,
        location: Value,
        name: String,
    },
    RenameEntry {
        kind: String,
        location: Value,
        from: String,
        to: String,
    },
    Custom(HookFn),
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateEntry { kind, attributes, .. } => {
                write!(f, "CreateEntry({kind}, {attributes})")
            }
            Self::UpdateEntry { kind, attributes, .. } => {
                write!(f, "UpdateEntry({kind}, {attributes})")
            }
            Self::DeleteEntry { kind, name, .. } => write!(f, "DeleteEntry({kind}, {name})"),
            Self::RenameEntry { kind, from, to, .. } => {
                write!(f, "RenameEntry({kind}, {from} -> {to})")
            }
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Hook {
    pub fn custom(hook: impl Fn(&HookContext<'_>) -> Result<()> + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(hook))
    }

    pub fn run(&self, ctx: &HookContext<'_>, interp: &Interpolator<'_>) -> Result<()> {
        match self {
            Self::CreateEntry {
                kind,
                location,
                attributes,
            } => ctx.create_entry(
                kind,
                &render_location(location, interp)?,
                &interp.value(attributes)?,
            ),
            Self::UpdateEntry {
                kind,
                location,
                attributes,
            } => ctx.update_entry(
                kind,
                &render_location(location, interp)?,
                &interp.value(attributes)?,
            ),
            Self::DeleteEntry {
                kind,
                location,
                name,
            } => ctx.delete_entry(kind, &render_location(location, interp)?, &interp.text(name)?),
            Self::RenameEntry {
                kind,
                location,
                from,
                to,
            } => ctx.rename_entry(
                kind,
                &render_location(location, interp)?,
                &interp.text(from)?,
                &interp.text(to)?,
            ),
            Self::Custom(hook) => hook(ctx),
        }
    }
}

fn render_location(location: &Value, interp: &Interpolator<'_>) -> Result<Location> {
    Ok(location_from_value(&interp.value(location)?)?)
}

/// An entry a hook left on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEntry {
    pub kind: String,
    pub scope: Scope,
    pub name: String,
}

/// What hooks can reach: the device and the case prefix. Entries created
/// through it are remembered so teardown can remove them.
pub struct HookContext<'a> {
    pub client: &'a Client,
    pub call: &'a CallContext,
    pub prefix: &'a str,
    created: RefCell<Vec<CreatedEntry>>,
}

impl<'a> HookContext<'a> {
    pub fn new(client: &'a Client, call: &'a CallContext, prefix: &'a str) -> Self {
        Self {
            client,
            call,
            prefix,
            created: RefCell::new(Vec::new()),
        }
    }

    /// Remember an entry for teardown.
    pub fn register(&self, kind: &str, scope: &Scope, name: &str) {
        self.created.borrow_mut().push(CreatedEntry {
            kind: kind.to_string(),
            scope: scope.clone(),
            name: name.to_string(),
        });
    }

    /// Entries created so far, in creation order.
    pub fn into_created(self) -> Vec<CreatedEntry> {
        self.created.into_inner()
    }

    fn target(&self, kind: &str, location: &Location) -> Result<(&'static objects::Schema, Scope)> {
        let schema = kinds::require(kind)?;
        let scope = resolve_for(location, schema.kind, &schema.scopes)?;
        Ok((schema, scope))
    }

    /// Create an entry from a user tree.
    pub fn create_entry(&self, kind: &str, location: &Location, attributes: &Value) -> Result<()> {
        let (schema, scope) = self.target(kind, location)?;
        let entry = codec::encode(schema, attributes)?;
        log::debug!("hook: create {kind} '{}' at {scope}", entry.name);
        self.client
            .create(self.call, &scope, schema.kind, &entry)
            .with_context(|| format!("hook: creating {kind} '{}'", entry.name))?;
        self.register(schema.kind, &scope, &entry.name);
        Ok(())
    }

    /// Replace the body of an existing entry.
    pub fn update_entry(&self, kind: &str, location: &Location, attributes: &Value) -> Result<()> {
        let (schema, scope) = self.target(kind, location)?;
        let entry = codec::encode(schema, attributes)?;
        log::debug!("hook: update {kind} '{}' at {scope}", entry.name);
        self.client
            .update(self.call, &scope, schema.kind, &entry.name, &entry)
            .with_context(|| format!("hook: updating {kind} '{}'", entry.name))?;
        Ok(())
    }

    pub fn delete_entry(&self, kind: &str, location: &Location, name: &str) -> Result<()> {
        let (schema, scope) = self.target(kind, location)?;
        log::debug!("hook: delete {kind} '{name}' at {scope}");
        self.client
            .delete(self.call, &scope, schema.kind, name)
            .with_context(|| format!("hook: deleting {kind} '{name}'"))?;
        Ok(())
    }

    pub fn rename_entry(&self, kind: &str, location: &Location, from: &str, to: &str) -> Result<()> {
        let (schema, scope) = self.target(kind, location)?;
        log::debug!("hook: rename {kind} '{from}' -> '{to}' at {scope}");
        self.client
            .rename(self.call, &scope, schema.kind, from, to)
            .with_context(|| format!("hook: renaming {kind} '{from}'"))?;
        for entry in self.created.borrow_mut().iter_mut() {
            if entry.kind == schema.kind && entry.scope == scope && entry.name == from {
                entry.name = to.to_string();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Variables;
    use panoskit::MemoryBackend;
    use std::sync::Arc;

    const PREFIX: &str = "test-acc-hook00";

    fn setup() -> (Client, Variables) {
        let client = Client::new(Arc::new(MemoryBackend::new()));
        let vars = Variables::from([("prefix".to_string(), Value::from(PREFIX))]);
        (client, vars)
    }

    fn shared() -> Value {
        objects::location_value(&Location::shared()).unwrap()
    }

    fn scope() -> Scope {
        Scope::Shared
    }

    #[test]
    fn test_create_registers_entry() {
        let (client, vars) = setup();
        let interp = Interpolator::new(&vars).unwrap();
        let call = CallContext::new();
        let ctx = HookContext::new(&client, &call, PREFIX);
        let hook = Hook::CreateEntry {
            kind: "address".into(),
            location: shared(),
            attributes: Value::object([
                ("name", Value::from("${var.prefix}-blocker")),
                ("fqdn", Value::from("example.com")),
            ]),
        };
        hook.run(&ctx, &interp).unwrap();
        let created = ctx.into_created();
        assert_eq!(
            created,
            vec![CreatedEntry {
                kind: "address".into(),
                scope: scope(),
                name: format!("{PREFIX}-blocker"),
            }]
        );
        let entry = client
            .read(&call, &scope(), "address", &format!("{PREFIX}-blocker"))
            .unwrap();
        assert_eq!(entry.fields["fqdn"], serde_json::json!("example.com"));
    }

    #[test]
    fn test_rename_tracks_created_entry() {
        let (client, vars) = setup();
        let interp = Interpolator::new(&vars).unwrap();
        let call = CallContext::new();
        let ctx = HookContext::new(&client, &call, PREFIX);
        ctx.create_entry(
            "tag",
            &Location::shared(),
            &Value::object([("name", Value::from(format!("{PREFIX}-a")))]),
        )
        .unwrap();
        Hook::RenameEntry {
            kind: "tag".into(),
            location: shared(),
            from: "${var.prefix}-a".into(),
            to: "${var.prefix}-b".into(),
        }
        .run(&ctx, &interp)
        .unwrap();
        assert_eq!(ctx.into_created()[0].name, format!("{PREFIX}-b"));
    }

    #[test]
    fn test_delete_missing_is_ok_and_update_missing_fails() {
        let (client, vars) = setup();
        let interp = Interpolator::new(&vars).unwrap();
        let call = CallContext::new();
        let ctx = HookContext::new(&client, &call, PREFIX);
        Hook::DeleteEntry {
            kind: "tag".into(),
            location: shared(),
            name: "${var.prefix}-missing".into(),
        }
        .run(&ctx, &interp)
        .unwrap();
        let err = Hook::UpdateEntry {
            kind: "tag".into(),
            location: shared(),
            attributes: Value::object([("name", Value::from("${var.prefix}-missing"))]),
        }
        .run(&ctx, &interp)
        .unwrap_err();
        assert!(format!("{err:#}").contains("not found"));
    }

    #[test]
    fn test_custom_hook_sees_prefix() {
        let (client, vars) = setup();
        let interp = Interpolator::new(&vars).unwrap();
        let call = CallContext::new();
        let ctx = HookContext::new(&client, &call, PREFIX);
        let hook = Hook::custom(|ctx| {
            anyhow::ensure!(ctx.prefix.starts_with("test-acc-"));
            ctx.register("tag", &Scope::Shared, &format!("{}-x", ctx.prefix));
            Ok(())
        });
        hook.run(&ctx, &interp).unwrap();
        assert_eq!(ctx.into_created().len(), 1);
    }
}
