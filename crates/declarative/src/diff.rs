//! Attribute-level diffs between canonical trees

use objects::Value;
use serde::Serialize;
use std::collections::BTreeSet;

/// One changed attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttrChange {
    /// Dotted path, e.g. `ipv6.address[0].advertise.enable`
    pub path: String,
    pub old: Value,
    pub new: Value,
}

impl AttrChange {
    pub fn is_addition(&self) -> bool {
        self.old.is_null() && !self.new.is_null()
    }

    pub fn is_removal(&self) -> bool {
        !self.old.is_null() && self.new.is_null()
    }
}

/// Compute leaf-level changes from `old` to `new`.
///
/// Objects are compared key by key and lists element by element; a length
/// change reports the extra or missing elements.
pub fn compute_diffs(old: &Value, new: &Value) -> Vec<AttrChange> {
    let mut changes = Vec::new();
    walk("", old, new, &mut changes);
    changes
}

fn child(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn walk(path: &str, old: &Value, new: &Value, out: &mut Vec<AttrChange>) {
    if old == new {
        return;
    }
    match (old, new) {
        (Value::Object(a), Value::Object(b)) => {
            let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
            for key in keys {
                let left = a.get(key).unwrap_or(&Value::Null);
                let right = b.get(key).unwrap_or(&Value::Null);
                walk(&child(path, key), left, right, out);
            }
        }
        (Value::List(a), Value::List(b)) if a.iter().all(is_block) && b.iter().all(is_block) => {
            for i in 0..a.len().max(b.len()) {
                let left = a.get(i).unwrap_or(&Value::Null);
                let right = b.get(i).unwrap_or(&Value::Null);
                walk(&format!("{path}[{i}]"), left, right, out);
            }
        }
        _ => out.push(AttrChange {
            path: path.to_string(),
            old: old.clone(),
            new: new.clone(),
        }),
    }
}

fn is_block(value: &Value) -> bool {
    matches!(value, Value::Object(_))
}

/// Attribute counts of a diff, by kind of change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub additions: usize,
    pub removals: usize,
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of changes
    pub fn from_changes(changes: &[AttrChange]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            if change.is_addition() {
                summary.additions += 1;
            } else if change.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
        }
        summary
    }
}
