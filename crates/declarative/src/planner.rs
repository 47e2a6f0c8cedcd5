//! Transition planner.
//!
//! Pure decisions: each function maps prior state, the canonical desired
//! tree and the results of device lookups to an ordered command list. No I/O
//! happens here; [`crate::executor`] runs the commands.

use crate::error::{Error, Result};
use crate::types::{Command, EntryState, body};
use objects::Value;
use panoskit::WireEntry;

/// What the device reported before an update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateLookup {
    /// Prior and desired names match; no lookup needed.
    SameName,
    /// The rename target already exists.
    TargetExists,
    /// The rename source is gone.
    SourceMissing,
    /// The rename source exists with this canonical tree.
    SourcePresent(Value),
}

/// Create: conflict if the name is taken, otherwise a single create.
pub fn decide_create(entry: &WireEntry, existing: bool) -> Result<Vec<Command>> {
    if existing {
        return Err(Error::already_exists(&entry.name));
    }
    Ok(vec![Command::Create {
        entry: entry.clone(),
    }])
}

/// Update, including rename handling.
///
/// `desired` is the canonical tree and `entry` its encoding. A rename into
/// an existing target fails before any command is issued.
pub fn decide_update(
    prior: &EntryState,
    desired: &Value,
    entry: &WireEntry,
    lookup: UpdateLookup,
) -> Result<Vec<Command>> {
    let desired_body = body(desired);
    match lookup {
        UpdateLookup::SameName => {
            if prior.body() == desired_body {
                Ok(Vec::new())
            } else {
                Ok(vec![Command::Update {
                    name: entry.name.clone(),
                    entry: entry.clone(),
                }])
            }
        }
        UpdateLookup::TargetExists => Err(Error::already_exists(&entry.name)),
        UpdateLookup::SourceMissing => Ok(vec![Command::Create {
            entry: entry.clone(),
        }]),
        UpdateLookup::SourcePresent(source) => {
            let mut commands = vec![Command::Rename {
                from: prior.name.clone(),
                to: entry.name.clone(),
            }];
            if body(&source) != desired_body {
                commands.push(Command::Update {
                    name: entry.name.clone(),
                    entry: entry.clone(),
                });
            }
            Ok(commands)
        }
    }
}

/// Delete: always a single delete; a missing entry is success downstream.
pub fn decide_delete(prior: &EntryState) -> Vec<Command> {
    vec![Command::Delete {
        name: prior.name.clone(),
    }]
}

/// Import: a missing entry cannot be imported.
pub fn decide_import<T>(kind: &str, name: &str, found: Option<T>) -> Result<T> {
    found.ok_or_else(|| Error::ImportNotFound {
        kind: kind.to_string(),
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use panoskit::Location;
    use serde_json::json;

    fn tree(name: &str, netmask: &str) -> Value {
        Value::object([
            ("name", Value::from(name)),
            ("ip_netmask", Value::from(netmask)),
        ])
    }

    fn prior() -> EntryState {
        EntryState::new("address", &Location::shared(), &tree("p", "10.0.0.1/32")).unwrap()
    }

    fn wire(name: &str, netmask: &str) -> WireEntry {
        WireEntry::new(name).with_field("ip-netmask", json!(netmask))
    }

    #[test]
    fn test_create_absent() {
        let entry = wire("p", "10.0.0.1/32");
        let commands = decide_create(&entry, false).unwrap();
        assert_eq!(commands, vec![Command::Create { entry }]);
    }

    #[test]
    fn test_create_conflict() {
        let err = decide_create(&wire("p", "10.0.0.1/32"), true).unwrap_err();
        assert_eq!(err.to_string(), "entry 'p' already exists");
    }

    #[test]
    fn test_update_clean_is_empty() {
        let commands = decide_update(
            &prior(),
            &tree("p", "10.0.0.1/32"),
            &wire("p", "10.0.0.1/32"),
            UpdateLookup::SameName,
        )
        .unwrap();
        assert!(commands.is_empty());
    }

    #[test]
    fn test_update_drifted() {
        let entry = wire("p", "10.0.0.2/32");
        let commands = decide_update(
            &prior(),
            &tree("p", "10.0.0.2/32"),
            &entry,
            UpdateLookup::SameName,
        )
        .unwrap();
        assert_eq!(
            commands,
            vec![Command::Update {
                name: "p".into(),
                entry
            }]
        );
    }

    #[test]
    fn test_rename_with_body_change() {
        let entry = wire("p-renamed", "10.0.0.2/32");
        let commands = decide_update(
            &prior(),
            &tree("p-renamed", "10.0.0.2/32"),
            &entry,
            UpdateLookup::SourcePresent(tree("p", "10.0.0.1/32")),
        )
        .unwrap();
        assert_eq!(
            commands,
            vec![
                Command::Rename {
                    from: "p".into(),
                    to: "p-renamed".into()
                },
                Command::Update {
                    name: "p-renamed".into(),
                    entry
                },
            ]
        );
    }

    #[test]
    fn test_rename_body_unchanged() {
        let commands = decide_update(
            &prior(),
            &tree("p-renamed", "10.0.0.1/32"),
            &wire("p-renamed", "10.0.0.1/32"),
            UpdateLookup::SourcePresent(tree("p", "10.0.0.1/32")),
        )
        .unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].verb(), "rename");
    }

    #[test]
    fn test_rename_source_missing_creates() {
        let entry = wire("p-renamed", "10.0.0.2/32");
        let commands = decide_update(
            &prior(),
            &tree("p-renamed", "10.0.0.2/32"),
            &entry,
            UpdateLookup::SourceMissing,
        )
        .unwrap();
        assert_eq!(commands, vec![Command::Create { entry }]);
    }

    #[test]
    fn test_rename_into_existing_target() {
        let err = decide_update(
            &prior(),
            &tree("p-renamed", "10.0.0.2/32"),
            &wire("p-renamed", "10.0.0.2/32"),
            UpdateLookup::TargetExists,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(err.to_string(), "entry 'p-renamed' already exists");
    }

    #[test]
    fn test_delete() {
        assert_eq!(
            decide_delete(&prior()),
            vec![Command::Delete { name: "p".into() }]
        );
    }

    #[test]
    fn test_import_missing() {
        let err = decide_import::<Value>("address", "ghost", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(decide_import("address", "x", Some(1)).unwrap(), 1);
    }
}
