//! Core types for entry reconciliation

use crate::error::Result;
use objects::{LOCATION_KEY, Value, location_value};
use panoskit::{Location, WireEntry};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attributes that identify an entry rather than describe it.
const IDENTITY_KEYS: [&str; 2] = ["name", LOCATION_KEY];

/// Body of a canonical tree: everything except name and location.
pub fn body(attributes: &Value) -> Value {
    attributes.without(&IDENTITY_KEYS)
}

/// Stored state of one managed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryState {
    pub kind: String,
    pub location: Location,
    pub name: String,
    /// Canonical attribute tree, including `name` and `location`.
    pub attributes: Value,
}

impl EntryState {
    /// Build state from a canonical tree, attaching the location.
    pub fn new(kind: impl Into<String>, location: &Location, canonical: &Value) -> Result<Self> {
        let mut attributes = canonical.clone();
        attributes.set(LOCATION_KEY, location_value(location)?);
        let name = canonical
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(Self {
            kind: kind.into(),
            location: location.clone(),
            name,
            attributes,
        })
    }

    /// Attribute body, without identity keys.
    pub fn body(&self) -> Value {
        body(&self.attributes)
    }
}

/// Classification of an entry relative to its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Not on the device
    Absent,
    /// Present and matching the declaration
    Clean,
    /// Present with a body that differs from the declaration
    Drifted,
    /// Declared under a different name
    Renamed,
    /// Present but no longer declared
    Orphaned,
    /// The rename target is taken by another entry
    Conflicted,
}

impl EntryStatus {
    /// Classify from refreshed prior state and canonical desired tree.
    pub fn classify(prior: Option<&EntryState>, desired: Option<&Value>) -> Self {
        match (prior, desired) {
            (None, _) => Self::Absent,
            (Some(_), None) => Self::Orphaned,
            (Some(prior), Some(desired)) => {
                let desired_name = desired.get("name").and_then(Value::as_str);
                if desired_name != Some(prior.name.as_str()) {
                    Self::Renamed
                } else if prior.body() != body(desired) {
                    Self::Drifted
                } else {
                    Self::Clean
                }
            }
        }
    }
}

/// One device mutation decided by the planner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Create { entry: WireEntry },
    Update { name: String, entry: WireEntry },
    Rename { from: String, to: String },
    Delete { name: String },
}

impl Command {
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Create { .. } => "create",
            Command::Update { .. } => "update",
            Command::Rename { .. } => "rename",
            Command::Delete { .. } => "delete",
        }
    }

    /// Name of the entry the command acts on.
    pub fn target(&self) -> &str {
        match self {
            Command::Create { entry } => &entry.name,
            Command::Update { name, .. } | Command::Delete { name } => name,
            Command::Rename { from, .. } => from,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Rename { from, to } => write!(f, "rename '{from}' -> '{to}'"),
            other => write!(f, "{} '{}'", other.verb(), other.target()),
        }
    }
}

/// Result of a reconcile callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Entry was created
    Created,
    /// Entry body was modified
    Modified,
    /// Entry was renamed (and possibly modified)
    Renamed,
    /// Entry was removed
    Removed,
    /// Commands were decided but not executed
    Skipped { reason: String },
}

impl ApplyResult {
    /// Summarize an executed command list.
    pub fn from_commands(commands: &[Command]) -> Self {
        let has = |verb: &str| commands.iter().any(|c| c.verb() == verb);
        if has("create") {
            Self::Created
        } else if has("rename") {
            Self::Renamed
        } else if has("update") {
            Self::Modified
        } else if has("delete") {
            Self::Removed
        } else {
            Self::NoChange
        }
    }
}

/// What a reconcile callback did.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub result: ApplyResult,
    /// Commands decided, in execution order.
    pub commands: Vec<Command>,
    /// Post-transition observed state; `None` once deleted or on dry run.
    pub state: Option<EntryState>,
    /// Commands actually sent, or skipped on dry run.
    pub summary: ExecuteSummary,
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub renamed: usize,
    pub removed: usize,
    pub skipped: usize,
}

impl ExecuteSummary {
    /// Total number of device mutations made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.renamed + self.removed
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.modified += other.modified;
        self.renamed += other.renamed;
        self.removed += other.removed;
        self.skipped += other.skipped;
    }

    /// Count an executed command
    pub fn add_command(&mut self, command: &Command) {
        match command {
            Command::Create { .. } => self.created += 1,
            Command::Update { .. } => self.modified += 1,
            Command::Rename { .. } => self.renamed += 1,
            Command::Delete { .. } => self.removed += 1,
        }
    }
}
