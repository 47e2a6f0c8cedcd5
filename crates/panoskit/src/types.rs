//! Core types shared by every backend.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Key carrying the entry name in PAN-OS JSON documents.
pub const NAME_KEY: &str = "@name";

/// A configuration entry as the device sees it.
///
/// `fields` holds the entry body in PAN-OS REST shape: kebab-case keys,
/// `"yes"`/`"no"` booleans, `{"member": [...]}` string lists and
/// `{"entry": [...]}` named object lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEntry {
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Json>,
}

impl WireEntry {
    /// Create an entry with an empty body.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Map::new(),
        }
    }

    /// Set a body field, returning the entry (builder style).
    pub fn with_field(mut self, key: impl Into<String>, value: Json) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Render as a PAN-OS JSON entry object (`{"@name": ..., ...}`).
    pub fn to_json(&self) -> Json {
        let mut object = Map::with_capacity(self.fields.len() + 1);
        object.insert(NAME_KEY.to_string(), Json::String(self.name.clone()));
        for (key, value) in &self.fields {
            object.insert(key.clone(), value.clone());
        }
        Json::Object(object)
    }

    /// Parse a PAN-OS JSON entry object.
    pub fn from_json(value: Json) -> Result<Self> {
        let Json::Object(mut object) = value else {
            return Err(Error::InvalidResponse(
                "entry is not a JSON object".to_string(),
            ));
        };
        let name = match object.remove(NAME_KEY) {
            Some(Json::String(name)) => name,
            _ => {
                return Err(Error::InvalidResponse(
                    "entry has no @name attribute".to_string(),
                ));
            }
        };
        Ok(Self {
            name,
            fields: object,
        })
    }

    /// Copy of this entry under a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: self.fields.clone(),
        }
    }
}

/// Cooperative cancellation handle.
///
/// Clones share the same flag; cancelling any clone cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`Error::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Per-call context threaded through every adapter call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Cancellation handle shared with the caller
    pub cancel: CancelToken,
    /// Deadline applied to each individual call
    pub timeout: Option<Duration>,
}

impl CallContext {
    /// Context with no deadline and a fresh cancel token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use an existing cancel token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Adapter operation names, used for logging and journaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
    Rename,
    List,
}

impl Operation {
    /// Lowercase name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Rename => "rename",
            Operation::List => "list",
        }
    }

    /// Whether the operation changes device configuration.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Operation::Create | Operation::Update | Operation::Delete | Operation::Rename
        )
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
