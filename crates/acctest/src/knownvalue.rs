//! Expected values for state checks.

use objects::Value;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

/// An expectation about one attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownValue {
    StringExact(String),
    Int64Exact(i64),
    Bool(bool),
    Null,
    NotNull,
    /// Pattern source; compiled when checked so it can carry variables.
    StringRegexp(String),
    /// Every key of the observed object must be enumerated, null ones included.
    ObjectExact(BTreeMap<String, KnownValue>),
    ListExact(Vec<KnownValue>),
}

impl KnownValue {
    pub fn string_exact(value: impl Into<String>) -> Self {
        Self::StringExact(value.into())
    }

    pub fn int64_exact(value: i64) -> Self {
        Self::Int64Exact(value)
    }

    pub fn bool_exact(value: bool) -> Self {
        Self::Bool(value)
    }

    pub fn null() -> Self {
        Self::Null
    }

    pub fn not_null() -> Self {
        Self::NotNull
    }

    pub fn string_regexp(pattern: impl Into<String>) -> Self {
        Self::StringRegexp(pattern.into())
    }

    pub fn object_exact<K: Into<String>>(fields: impl IntoIterator<Item = (K, KnownValue)>) -> Self {
        Self::ObjectExact(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list_exact(items: impl IntoIterator<Item = KnownValue>) -> Self {
        Self::ListExact(items.into_iter().collect())
    }

    /// Exact expectation mirroring a literal tree.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Int(i) => Self::Int64Exact(*i),
            Value::String(s) => Self::StringExact(s.clone()),
            Value::List(items) => Self::ListExact(items.iter().map(Self::from_value).collect()),
            Value::Object(map) => Self::ObjectExact(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_value(v)))
                    .collect(),
            ),
        }
    }

    /// Compare against an observed value. `path` prefixes error messages.
    pub fn check(&self, path: &str, actual: &Value) -> Result<(), String> {
        let mismatch = || format!("{path}: expected {self}, got {actual}");
        match (self, actual) {
            (Self::StringExact(expected), Value::String(s)) if expected == s => Ok(()),
            (Self::Int64Exact(expected), Value::Int(i)) if expected == i => Ok(()),
            (Self::Bool(expected), Value::Bool(b)) if expected == b => Ok(()),
            (Self::Null, Value::Null) => Ok(()),
            (Self::NotNull, v) if !v.is_null() => Ok(()),
            (Self::StringRegexp(pattern), Value::String(s)) => {
                let regex = Regex::new(pattern)
                    .map_err(|e| format!("{path}: invalid pattern /{pattern}/: {e}"))?;
                if regex.is_match(s) {
                    Ok(())
                } else {
                    Err(mismatch())
                }
            }
            (Self::ObjectExact(expected), Value::Object(observed)) => {
                for (key, value) in observed {
                    if !expected.contains_key(key) {
                        return Err(format!(
                            "{path}: unexpected attribute '{key}' = {value} not enumerated by the check"
                        ));
                    }
                }
                for (key, known) in expected {
                    let child = observed.get(key).unwrap_or(&Value::Null);
                    known.check(&format!("{path}.{key}"), child)?;
                }
                Ok(())
            }
            (Self::ListExact(expected), Value::List(items)) => {
                if expected.len() != items.len() {
                    return Err(format!(
                        "{path}: expected {} elements, got {}",
                        expected.len(),
                        items.len()
                    ));
                }
                for (i, (known, item)) in expected.iter().zip(items).enumerate() {
                    known.check(&format!("{path}[{i}]"), item)?;
                }
                Ok(())
            }
            _ => Err(mismatch()),
        }
    }
}

impl fmt::Display for KnownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StringExact(s) => write!(f, "\"{s}\""),
            Self::Int64Exact(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => f.write_str("null"),
            Self::NotNull => f.write_str("a non-null value"),
            Self::StringRegexp(pattern) => write!(f, "a string matching /{pattern}/"),
            Self::ObjectExact(fields) => {
                let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
                write!(f, "object {{{}}}", keys.join(", "))
            }
            Self::ListExact(items) => write!(f, "list of {} elements", items.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mss() -> Value {
        Value::object([
            ("enable", Value::Bool(true)),
            ("ipv4_mss_adjustment", Value::Int(100)),
            ("ipv6_mss_adjustment", Value::Int(150)),
        ])
    }

    #[test]
    fn test_scalars() {
        assert!(KnownValue::string_exact("a").check("x", &Value::from("a")).is_ok());
        assert!(KnownValue::string_exact("a").check("x", &Value::from("b")).is_err());
        assert!(KnownValue::int64_exact(3).check("x", &Value::Int(3)).is_ok());
        assert!(KnownValue::bool_exact(false).check("x", &Value::Bool(true)).is_err());
        assert!(KnownValue::null().check("x", &Value::Null).is_ok());
        assert!(KnownValue::not_null().check("x", &Value::Null).is_err());
        assert!(KnownValue::not_null().check("x", &Value::empty_object()).is_ok());
    }

    #[test]
    fn test_regexp() {
        let known = KnownValue::string_regexp("^test-acc-[a-z0-9]{6}$");
        assert!(known.check("name", &Value::from("test-acc-abc123")).is_ok());
        assert!(known.check("name", &Value::from("prod")).is_err());
        let broken = KnownValue::string_regexp("(");
        assert!(broken.check("name", &Value::from("x")).unwrap_err().contains("invalid pattern"));
    }

    #[test]
    fn test_object_exact_passes() {
        let known = KnownValue::object_exact([
            ("enable", KnownValue::bool_exact(true)),
            ("ipv4_mss_adjustment", KnownValue::int64_exact(100)),
            ("ipv6_mss_adjustment", KnownValue::int64_exact(150)),
        ]);
        assert!(known.check("adjust_tcp_mss", &mss()).is_ok());
    }

    #[test]
    fn test_object_exact_fails_on_unenumerated_key() {
        let known = KnownValue::object_exact([
            ("enable", KnownValue::bool_exact(true)),
            ("ipv4_mss_adjustment", KnownValue::int64_exact(100)),
        ]);
        let err = known.check("adjust_tcp_mss", &mss()).unwrap_err();
        assert!(err.contains("ipv6_mss_adjustment"), "{err}");
    }

    #[test]
    fn test_object_exact_fails_on_unenumerated_null_key() {
        let observed = Value::object([
            ("enable", Value::Bool(true)),
            ("ipv4_mss_adjustment", Value::Int(100)),
            ("ipv6_mss_adjustment", Value::Null),
        ]);
        let known = KnownValue::object_exact([
            ("enable", KnownValue::bool_exact(true)),
            ("ipv4_mss_adjustment", KnownValue::int64_exact(100)),
        ]);
        let err = known.check("adjust_tcp_mss", &observed).unwrap_err();
        assert!(err.contains("ipv6_mss_adjustment"), "{err}");

        let listed = KnownValue::object_exact([
            ("enable", KnownValue::bool_exact(true)),
            ("ipv4_mss_adjustment", KnownValue::int64_exact(100)),
            ("ipv6_mss_adjustment", KnownValue::null()),
        ]);
        assert!(listed.check("adjust_tcp_mss", &observed).is_ok());
    }

    #[test]
    fn test_list_exact() {
        let known = KnownValue::list_exact([KnownValue::string_exact("test-profile1")]);
        assert!(known.check("data_filtering", &Value::strings(["test-profile1"])).is_ok());
        let err = known
            .check("data_filtering", &Value::strings(["a", "b"]))
            .unwrap_err();
        assert!(err.contains("expected 1 elements"));
    }

    #[test]
    fn test_nested_error_path() {
        let known = KnownValue::object_exact([("enable", KnownValue::bool_exact(false))]);
        let observed = Value::object([("enable", Value::Bool(true))]);
        let err = known.check("adjust_tcp_mss", &observed).unwrap_err();
        assert!(err.starts_with("adjust_tcp_mss.enable:"), "{err}");
    }
}
