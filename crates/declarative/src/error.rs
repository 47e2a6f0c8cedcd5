//! Reconciler errors.

use objects::CodecError;
use thiserror::Error;

/// How the reconciler classifies a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidLocation,
    SchemaMismatch,
    InvalidConfig,
    NotFound,
    AlreadyExists,
    Validation,
    Transport,
    Cancelled,
    Other,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidLocation => "invalid_location",
            Self::SchemaMismatch => "schema_mismatch",
            Self::InvalidConfig => "invalid_config",
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::Validation => "validation",
            Self::Transport => "transport",
            Self::Cancelled => "cancelled",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by resource callbacks.
///
/// Device errors are forwarded unmodified, so the message a user sees is
/// the one the lowest layer produced.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    Device(#[from] panoskit::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("cannot import {kind} '{name}': entry does not exist")]
    ImportNotFound { kind: String, name: String },

    #[error("{kind} '{name}' vanished after {operation}")]
    Vanished {
        kind: String,
        name: String,
        operation: &'static str,
    },
}

impl Error {
    /// Conflict on a create or rename target.
    pub fn already_exists(name: impl Into<String>) -> Self {
        Error::Device(panoskit::Error::already_exists(name))
    }

    pub fn kind(&self) -> ErrorKind {
        use panoskit::ErrorCategory;
        match self {
            Error::Device(e) => match e.category() {
                ErrorCategory::InvalidLocation => ErrorKind::InvalidLocation,
                ErrorCategory::NotFound => ErrorKind::NotFound,
                ErrorCategory::AlreadyExists => ErrorKind::AlreadyExists,
                ErrorCategory::Validation => ErrorKind::Validation,
                ErrorCategory::Transport => ErrorKind::Transport,
                ErrorCategory::Cancelled => ErrorKind::Cancelled,
                ErrorCategory::Other => ErrorKind::Other,
            },
            Error::Codec(CodecError::Location(_)) => ErrorKind::InvalidLocation,
            Error::Codec(e) if e.is_schema_mismatch() => ErrorKind::SchemaMismatch,
            Error::Codec(_) => ErrorKind::InvalidConfig,
            Error::ImportNotFound { .. } => ErrorKind::NotFound,
            Error::Vanished { .. } => ErrorKind::Other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_message_is_literal() {
        let err = Error::already_exists("test-acc-abc123-renamed");
        assert_eq!(
            err.to_string(),
            "entry 'test-acc-abc123-renamed' already exists"
        );
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_device_messages_forwarded_verbatim() {
        let device = panoskit::Error::Validation {
            message: "ip-netmask is invalid".into(),
        };
        let err = Error::from(device);
        assert_eq!(err.to_string(), "ip-netmask is invalid");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_codec_kinds() {
        let mismatch = Error::from(CodecError::SchemaMismatch { path: "x".into() });
        assert_eq!(mismatch.kind(), ErrorKind::SchemaMismatch);
        let missing = Error::from(CodecError::MissingRequired { path: "name".into() });
        assert_eq!(missing.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn test_cancelled() {
        assert!(Error::from(panoskit::Error::Cancelled).is_cancelled());
    }
}
