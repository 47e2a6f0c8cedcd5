//! TOML scenario files.
//!
//! ```toml
//! name = "address-rename"
//! parallel = true
//!
//! [[step]]
//! [[step.resource]]
//! kind = "address"
//! label = "a"
//! location = { shared = {} }
//! attributes = { name = "${var.prefix}", ip_netmask = "10.0.0.1/32" }
//!
//! [[step.state_check]]
//! address = "panos_address.a"
//! path = "ip_netmask"
//! string_exact = "10.0.0.1/32"
//! ```

use crate::config::{Config, ResourceBlock, Variables};
use crate::controller::Action;
use crate::devicecheck::DeviceCheck;
use crate::hooks::Hook;
use crate::knownvalue::KnownValue;
use crate::path::AttrPath;
use crate::plancheck::PlanCheck;
use crate::runner::{Scenario, Step};
use crate::statecheck::StateCheck;
use anyhow::{Context, Result, bail};
use objects::Value;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    parallel: bool,
    #[serde(default)]
    requires_device: bool,
    #[serde(default, rename = "step")]
    steps: Vec<StepFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepFile {
    #[serde(default, rename = "resource")]
    resources: Vec<ResourceBlock>,
    #[serde(default)]
    variables: Variables,
    #[serde(default, rename = "hook")]
    hooks: Vec<HookFile>,
    #[serde(default, rename = "plan_check")]
    plan_checks: Vec<PlanCheckFile>,
    #[serde(default, rename = "state_check")]
    state_checks: Vec<StateCheckFile>,
    #[serde(default, rename = "device_check")]
    device_checks: Vec<DeviceCheckFile>,
    expect_error: Option<String>,
    #[serde(default)]
    expect_non_empty_plan: bool,
    import: Option<ImportFile>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum HookFile {
    Create {
        kind: String,
        location: Value,
        attributes: Value,
    },
    Update {
        kind: String,
        location: Value,
        attributes: Value,
    },
    Delete {
        kind: String,
        location: Value,
        name: String,
    },
    Rename {
        kind: String,
        location: Value,
        from: String,
        to: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "expect", rename_all = "snake_case")]
enum PlanCheckFile {
    Empty,
    NonEmpty,
    Action { address: String, action: String },
}

#[derive(Debug, Deserialize)]
struct StateCheckFile {
    address: String,
    path: AttrPath,
    #[serde(flatten)]
    value: KnownFile,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "expect", rename_all = "snake_case")]
enum DeviceCheckFile {
    Exists {
        kind: String,
        location: Value,
        name: String,
        #[serde(default, rename = "attribute")]
        attributes: Vec<AttributeCheckFile>,
    },
    Absent {
        kind: String,
        location: Value,
        name: String,
    },
    NoneWithPrefix {
        kind: String,
        location: Value,
    },
}

#[derive(Debug, Deserialize)]
struct AttributeCheckFile {
    path: AttrPath,
    #[serde(flatten)]
    value: KnownFile,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ImportFile {
    address: String,
}

/// Exactly one field selects the known value.
#[derive(Debug, Default, Deserialize)]
struct KnownFile {
    string_exact: Option<String>,
    int_exact: Option<i64>,
    bool_exact: Option<bool>,
    #[serde(default)]
    null: bool,
    #[serde(default)]
    not_null: bool,
    string_regexp: Option<String>,
    object_exact: Option<Value>,
    list_exact: Option<Value>,
}

impl KnownFile {
    fn into_known(self, what: &str) -> Result<KnownValue> {
        let mut found = Vec::new();
        if let Some(s) = self.string_exact {
            found.push(KnownValue::string_exact(s));
        }
        if let Some(i) = self.int_exact {
            found.push(KnownValue::int64_exact(i));
        }
        if let Some(b) = self.bool_exact {
            found.push(KnownValue::bool_exact(b));
        }
        if self.null {
            found.push(KnownValue::null());
        }
        if self.not_null {
            found.push(KnownValue::not_null());
        }
        if let Some(pattern) = self.string_regexp {
            found.push(KnownValue::string_regexp(pattern));
        }
        if let Some(object) = self.object_exact {
            if object.as_object().is_none() {
                bail!("{what}: object_exact must be a table");
            }
            found.push(expected_tree(&object));
        }
        if let Some(list) = self.list_exact {
            if list.as_list().is_none() {
                bail!("{what}: list_exact must be an array");
            }
            found.push(expected_tree(&list));
        }
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => bail!("{what}: no expected value given"),
            n => bail!("{what}: {n} expected values given, exactly one is allowed"),
        }
    }
}

/// Exact expectation for a literal tree. TOML has no null, so a nested
/// `{ null = true }` table stands for an attribute expected to be absent.
fn expected_tree(value: &Value) -> KnownValue {
    match value {
        Value::Object(map) if map.len() == 1 && map.get("null") == Some(&Value::Bool(true)) => {
            KnownValue::null()
        }
        Value::Object(map) => KnownValue::ObjectExact(
            map.iter()
                .map(|(k, v)| (k.clone(), expected_tree(v)))
                .collect(),
        ),
        Value::List(items) => KnownValue::ListExact(items.iter().map(expected_tree).collect()),
        other => KnownValue::from_value(other),
    }
}

impl HookFile {
    fn into_hook(self) -> Hook {
        match self {
            Self::Create {
                kind,
                location,
                attributes,
            } => Hook::CreateEntry {
                kind,
                location,
                attributes,
            },
            Self::Update {
                kind,
                location,
                attributes,
            } => Hook::UpdateEntry {
                kind,
                location,
                attributes,
            },
            Self::Delete {
                kind,
                location,
                name,
            } => Hook::DeleteEntry {
                kind,
                location,
                name,
            },
            Self::Rename {
                kind,
                location,
                from,
                to,
            } => Hook::RenameEntry {
                kind,
                location,
                from,
                to,
            },
        }
    }
}

impl PlanCheckFile {
    fn into_check(self) -> Result<PlanCheck> {
        Ok(match self {
            Self::Empty => PlanCheck::expect_empty(),
            Self::NonEmpty => PlanCheck::expect_non_empty(),
            Self::Action { address, action } => {
                let Some(parsed) = Action::parse(&action) else {
                    bail!("{address}: unknown plan action '{action}'");
                };
                PlanCheck::expect_action(address, parsed)
            }
        })
    }
}

impl DeviceCheckFile {
    fn into_check(self) -> Result<DeviceCheck> {
        Ok(match self {
            Self::Exists {
                kind,
                location,
                name,
                attributes,
            } => {
                let label = format!("{kind} '{name}'");
                let mut check = DeviceCheck::exists(kind, location, name);
                for attribute in attributes {
                    let what = format!("{label}.{}", attribute.path);
                    check = check.with_attribute(attribute.path, attribute.value.into_known(&what)?);
                }
                check
            }
            Self::Absent {
                kind,
                location,
                name,
            } => DeviceCheck::absent(kind, location, name),
            Self::NoneWithPrefix { kind, location } => DeviceCheck::none_with_prefix(kind, location),
        })
    }
}

impl StepFile {
    fn into_step(self, index: usize) -> Result<Step> {
        let context = || format!("step {}", index + 1);
        let mut step = Step::new(Config::new(self.resources));
        step.variables = self.variables;
        step.hooks = self.hooks.into_iter().map(HookFile::into_hook).collect();
        step.plan_checks = self
            .plan_checks
            .into_iter()
            .map(PlanCheckFile::into_check)
            .collect::<Result<_>>()
            .with_context(context)?;
        step.state_checks = self
            .state_checks
            .into_iter()
            .map(|check| {
                let what = format!("{}.{}", check.address, check.path);
                let value = check.value.into_known(&what)?;
                Ok(StateCheck::expect_known_value(check.address, check.path, value))
            })
            .collect::<Result<_>>()
            .with_context(context)?;
        step.device_checks = self
            .device_checks
            .into_iter()
            .map(DeviceCheckFile::into_check)
            .collect::<Result<_>>()
            .with_context(context)?;
        step.expect_error = self.expect_error;
        step.expect_non_empty_plan = self.expect_non_empty_plan;
        if let Some(import) = self.import {
            step = step.import(import.address);
        }
        Ok(step)
    }
}

/// Parse a scenario from TOML text.
pub fn load_str(text: &str) -> Result<Scenario> {
    let file: ScenarioFile = toml::from_str(text).context("Failed to parse scenario")?;
    if file.steps.is_empty() {
        bail!("scenario '{}' has no steps", file.name);
    }
    let steps = file
        .steps
        .into_iter()
        .enumerate()
        .map(|(index, step)| step.into_step(index))
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("scenario '{}'", file.name))?;
    Ok(Scenario {
        name: file.name,
        description: file.description,
        parallel: file.parallel,
        requires_device: file.requires_device,
        steps,
    })
}

/// Read and parse a scenario file.
pub fn load_file(path: &Path) -> Result<Scenario> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario {}", path.display()))?;
    load_str(&text).with_context(|| format!("in {}", path.display()))
}
