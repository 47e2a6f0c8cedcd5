//! Error types for PAN-OS entry operations.
//!
//! Errors are categorized so the reconciler can tell an entry that is
//! simply not there from a fatal failure (validation, transport).
//! The `AlreadyExists` message is a fixed contract: callers match it with
//! `entry '<name>' already exists`.

use std::time::Duration;
use thiserror::Error;

/// Categories of device errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The location itself is malformed
    InvalidLocation,
    /// The entry does not exist at the requested scope
    NotFound,
    /// An entry with the target name already exists
    AlreadyExists,
    /// The device rejected the entry
    Validation,
    /// Network, timeout, authentication or protocol failure
    Transport,
    /// The caller cancelled the operation
    Cancelled,
    /// Other/unknown errors
    Other,
}

/// Errors that can occur while talking to a PAN-OS device.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Zero or several location variants set, or a required field is empty
    #[error("invalid location: {reason}")]
    InvalidLocation {
        /// What is wrong with the location
        reason: String,
    },

    /// Entry not present at the scope
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Object kind (e.g. "address")
        kind: String,
        /// Entry name
        name: String,
    },

    /// Entry name collision on create or rename
    #[error("entry '{name}' already exists")]
    AlreadyExists {
        /// The colliding name
        name: String,
    },

    /// Device-side validation failure, forwarded verbatim
    #[error("{message}")]
    Validation {
        /// Message produced by the device
        message: String,
    },

    /// Network or protocol failure
    #[error("transport error: {message}")]
    Transport {
        /// Details of the failure
        message: String,
        /// HTTP status, when one was received
        status: Option<u16>,
    },

    /// The per-call deadline expired
    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout {
        /// Adapter operation that timed out
        operation: &'static str,
        /// Configured deadline
        after: Duration,
    },

    /// The caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,

    /// Response body could not be interpreted
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid location error.
    pub fn invalid_location(reason: impl Into<String>) -> Self {
        Self::InvalidLocation {
            reason: reason.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an already-exists error.
    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists { name: name.into() }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Transport {
            message: message.into(),
            status,
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidLocation { .. } => ErrorCategory::InvalidLocation,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::AlreadyExists { .. } => ErrorCategory::AlreadyExists,
            Error::Validation { .. } => ErrorCategory::Validation,
            Error::Transport { .. } | Error::Timeout { .. } | Error::InvalidResponse(_) => {
                ErrorCategory::Transport
            }
            Error::Cancelled => ErrorCategory::Cancelled,
            Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Whether this is an already-exists error.
    pub fn is_already_exists(&self) -> bool {
        self.category() == ErrorCategory::AlreadyExists
    }

    /// Build an error from a PAN-OS REST API error body.
    ///
    /// `kind` and `name` identify the entry the request targeted; they are
    /// used for the not-found and already-exists variants so those render
    /// with the entry's own name rather than the device wording.
    pub fn from_api_error(code: u32, message: &str, kind: &str, name: Option<&str>) -> Self {
        match code {
            5 => Error::not_found(kind, name.unwrap_or_default()),
            6 => Error::already_exists(name.unwrap_or_default()),
            3 | 7 | 9 | 10 | 13 | 14 => Error::Validation {
                message: message.trim().to_string(),
            },
            _ => Error::transport(format!("API error {code}: {}", message.trim()), None),
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Transport {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            other => Self::Transport {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// Result type for device operations.
pub type Result<T> = std::result::Result<T, Error>;
