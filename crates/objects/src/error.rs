//! Codec errors.

use thiserror::Error;

/// Failure while canonicalizing, encoding or decoding an entry.
///
/// `path` is a dotted attribute path such as `ipv6.address[0].name`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unknown object kind '{0}'")]
    UnknownKind(String),

    #[error("unsupported attribute '{path}'")]
    UnknownAttribute { path: String },

    #[error("attribute '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: String,
    },

    #[error("missing required attribute '{path}'")]
    MissingRequired { path: String },

    #[error("only one of [{}] may be set at '{path}'", choices.join(", "))]
    VariantConflict { path: String, choices: Vec<String> },

    #[error("exactly one of [{}] must be set at '{path}'", choices.join(", "))]
    VariantMissing { path: String, choices: Vec<String> },

    #[error("duplicate entry '{name}' in '{path}'")]
    DuplicateEntry { path: String, name: String },

    /// The device returned a field the schema does not know about.
    #[error("schema mismatch: device returned unexpected field '{path}'")]
    SchemaMismatch { path: String },

    #[error("device returned an invalid value for '{path}': expected {expected}, found {found}")]
    InvalidWireValue {
        path: String,
        expected: &'static str,
        found: String,
    },

    #[error("invalid location: {0}")]
    Location(String),
}

impl CodecError {
    /// Whether this error came from decoding device output.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(
            self,
            CodecError::SchemaMismatch { .. } | CodecError::InvalidWireValue { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Join a parent path and a child key.
pub(crate) fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Path of the n-th element of a list.
pub(crate) fn index(parent: &str, i: usize) -> String {
    format!("{parent}[{i}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_conflict_message() {
        let err = CodecError::VariantConflict {
            path: "nexthop".into(),
            choices: vec!["ip_address".into(), "discard".into()],
        };
        assert_eq!(
            err.to_string(),
            "only one of [ip_address, discard] may be set at 'nexthop'"
        );
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a", "b"), "a.b");
        assert_eq!(index("a.b", 2), "a.b[2]");
    }

    #[test]
    fn test_is_schema_mismatch() {
        assert!(CodecError::SchemaMismatch { path: "x".into() }.is_schema_mismatch());
        assert!(!CodecError::MissingRequired { path: "x".into() }.is_schema_mismatch());
    }
}
