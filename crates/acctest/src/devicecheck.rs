//! Assertions made directly against the device.
//!
//! These bypass controller state and read through the adapter, so they can
//! prove that a failed apply left the device untouched.

use crate::config::Interpolator;
use crate::knownvalue::KnownValue;
use crate::path::AttrPath;
use anyhow::{Context, Result, bail};
use objects::{Schema, Value, codec, kinds, location_from_value};
use panoskit::{CallContext, Client, Scope, resolve_for};

/// Expectation about entries on the device.
#[derive(Debug, Clone)]
pub enum DeviceCheck {
    /// The entry exists and every listed attribute matches.
    Exists {
        kind: String,
        location: Value,
        name: String,
        attributes: Vec<(AttrPath, KnownValue)>,
    },
    /// No entry with this name exists.
    Absent {
        kind: String,
        location: Value,
        name: String,
    },
    /// No entry of the kind carries the test prefix.
    NoneWithPrefix { kind: String, location: Value },
}

impl DeviceCheck {
    pub fn exists(kind: impl Into<String>, location: Value, name: impl Into<String>) -> Self {
        Self::Exists {
            kind: kind.into(),
            location,
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn absent(kind: impl Into<String>, location: Value, name: impl Into<String>) -> Self {
        Self::Absent {
            kind: kind.into(),
            location,
            name: name.into(),
        }
    }

    pub fn none_with_prefix(kind: impl Into<String>, location: Value) -> Self {
        Self::NoneWithPrefix {
            kind: kind.into(),
            location,
        }
    }

    /// Add an attribute expectation to an `Exists` check.
    #[must_use]
    pub fn with_attribute(mut self, path: AttrPath, value: KnownValue) -> Self {
        if let Self::Exists { attributes, .. } = &mut self {
            attributes.push((path, value));
        }
        self
    }

    /// Evaluate against the device. `prefix` is the case's test prefix.
    pub fn check(
        &self,
        client: &Client,
        call: &CallContext,
        interp: &Interpolator<'_>,
        prefix: &str,
    ) -> Result<()> {
        match self {
            Self::Exists {
                kind,
                location,
                name,
                attributes,
            } => {
                let (schema, scope) = target(kind, location, interp)?;
                let name = interp.text(name)?;
                let Some(entry) = client.read_optional(call, &scope, schema.kind, &name)? else {
                    bail!("{kind} '{name}' does not exist at {scope}");
                };
                let observed = codec::decode(schema, &entry)
                    .with_context(|| format!("decoding {kind} '{name}'"))?;
                for (path, known) in attributes {
                    let known = crate::statecheck::interpolate_known(known, interp)?;
                    let label = format!("{kind} '{name}'.{path}");
                    let Some(actual) = path.resolve(&observed) else {
                        bail!("{label}: attribute does not exist");
                    };
                    known.check(&label, actual).map_err(anyhow::Error::msg)?;
                }
                Ok(())
            }
            Self::Absent {
                kind,
                location,
                name,
            } => {
                let (schema, scope) = target(kind, location, interp)?;
                let name = interp.text(name)?;
                if client.read_optional(call, &scope, schema.kind, &name)?.is_some() {
                    bail!("{kind} '{name}' still exists at {scope}");
                }
                Ok(())
            }
            Self::NoneWithPrefix { kind, location } => {
                let (schema, scope) = target(kind, location, interp)?;
                let leftovers = client.list(call, &scope, schema.kind, Some(prefix))?;
                if !leftovers.is_empty() {
                    let names: Vec<&str> = leftovers.iter().map(|e| e.name.as_str()).collect();
                    bail!(
                        "expected no {kind} entries with prefix '{prefix}' at {scope}, found: {}",
                        names.join(", ")
                    );
                }
                Ok(())
            }
        }
    }
}

fn target(
    kind: &str,
    location: &Value,
    interp: &Interpolator<'_>,
) -> Result<(&'static Schema, Scope)> {
    let schema = kinds::require(kind)?;
    let location = location_from_value(&interp.value(location)?)?;
    let scope = resolve_for(&location, schema.kind, &schema.scopes)?;
    Ok((schema, scope))
}
