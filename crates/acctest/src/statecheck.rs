//! Assertions on controller state.

use crate::config::Interpolator;
use crate::controller::State;
use crate::knownvalue::KnownValue;
use crate::path::AttrPath;
use anyhow::Result;

/// Expectation about one stored attribute.
#[derive(Debug, Clone)]
pub struct StateCheck {
    pub address: String,
    pub path: AttrPath,
    pub value: KnownValue,
}

impl StateCheck {
    /// `ExpectKnownValue(address, path, value)`.
    pub fn expect_known_value(address: impl Into<String>, path: AttrPath, value: KnownValue) -> Self {
        Self {
            address: address.into(),
            path,
            value,
        }
    }

    /// Substitute variables in expected strings and patterns.
    pub fn interpolate(&self, interp: &Interpolator<'_>) -> Result<Self> {
        Ok(Self {
            address: self.address.clone(),
            path: self.path.clone(),
            value: interpolate_known(&self.value, interp)?,
        })
    }

    pub fn check(&self, state: &State) -> Result<(), String> {
        let entry = state
            .get(&self.address)
            .ok_or_else(|| format!("{}: not in state", self.address))?;
        let actual = self.path.resolve(&entry.attributes).ok_or_else(|| {
            format!("{}: attribute '{}' does not exist", self.address, self.path)
        })?;
        self.value
            .check(&format!("{}.{}", self.address, self.path), actual)
    }
}

/// Interpolate a known value tree.
pub fn interpolate_known(known: &KnownValue, interp: &Interpolator<'_>) -> Result<KnownValue> {
    Ok(match known {
        KnownValue::StringExact(s) => KnownValue::StringExact(interp.text(s)?),
        KnownValue::StringRegexp(pattern) => {
            KnownValue::StringRegexp(interp.pattern(pattern)?.as_str().to_string())
        }
        KnownValue::ObjectExact(fields) => KnownValue::ObjectExact(
            fields
                .iter()
                .map(|(k, v)| interpolate_known(v, interp).map(|v| (k.clone(), v)))
                .collect::<Result<_>>()?,
        ),
        KnownValue::ListExact(items) => KnownValue::ListExact(
            items
                .iter()
                .map(|v| interpolate_known(v, interp))
                .collect::<Result<_>>()?,
        ),
        other => other.clone(),
    })
}
