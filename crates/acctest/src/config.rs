//! Scenario configuration and `${var.NAME}` interpolation.

use anyhow::{Context, Result, bail};
use objects::{Value, location_from_value};
use panoskit::Location;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

/// Variables available to a step. `prefix` is always bound by the runner.
pub type Variables = BTreeMap<String, Value>;

const VAR_PATTERN: &str = r"\$\{var\.([A-Za-z_][A-Za-z0-9_]*)\}";

/// One declared resource.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceBlock {
    pub kind: String,
    pub label: String,
    pub location: Value,
    #[serde(default)]
    pub attributes: Value,
}

impl ResourceBlock {
    pub fn new(kind: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            label: label.into(),
            location: Value::Null,
            attributes: Value::empty_object(),
        }
    }

    #[must_use]
    pub fn location(mut self, location: Value) -> Self {
        self.location = location;
        self
    }

    #[must_use]
    pub fn attributes(mut self, attributes: Value) -> Self {
        self.attributes = attributes;
        self
    }

    /// Set one attribute.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        if self.attributes.is_null() {
            self.attributes = Value::empty_object();
        }
        self.attributes.set(key, value.into());
        self
    }

    /// Controller address, e.g. `panos_address.netmask`.
    pub fn address(&self) -> String {
        format!("panos_{}.{}", self.kind, self.label)
    }
}

/// The resources declared by one step.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default, rename = "resource")]
    pub resources: Vec<ResourceBlock>,
}

impl Config {
    pub fn new(resources: Vec<ResourceBlock>) -> Self {
        Self { resources }
    }

    /// Interpolate variables and resolve locations.
    pub fn render(&self, interp: &Interpolator<'_>) -> Result<Vec<RenderedResource>> {
        let mut seen = HashSet::new();
        let mut rendered = Vec::with_capacity(self.resources.len());
        for block in &self.resources {
            let address = block.address();
            if !seen.insert(address.clone()) {
                bail!("duplicate resource address {address}");
            }
            let location_tree = interp
                .value(&block.location)
                .with_context(|| format!("{address}: location"))?;
            let location = location_from_value(&location_tree)
                .with_context(|| format!("{address}: location"))?;
            let desired = interp
                .value(&block.attributes)
                .with_context(|| format!("{address}: attributes"))?;
            rendered.push(RenderedResource {
                address,
                kind: block.kind.clone(),
                location,
                desired,
            });
        }
        Ok(rendered)
    }
}

/// A resource with variables substituted, ready for the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedResource {
    pub address: String,
    pub kind: String,
    pub location: Location,
    pub desired: Value,
}

/// Substitutes `${var.NAME}` references.
pub struct Interpolator<'a> {
    pattern: Regex,
    vars: &'a Variables,
}

impl<'a> Interpolator<'a> {
    pub fn new(vars: &'a Variables) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(VAR_PATTERN)?,
            vars,
        })
    }

    fn lookup(&self, name: &str) -> Result<&Value> {
        self.vars
            .get(name)
            .with_context(|| format!("undefined variable '{name}'"))
    }

    /// Interpolate every string in a tree.
    pub fn value(&self, value: &Value) -> Result<Value> {
        Ok(match value {
            Value::String(s) => self.string(s)?,
            Value::List(items) => Value::List(
                items
                    .iter()
                    .map(|item| self.value(item))
                    .collect::<Result<_>>()?,
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| self.value(v).map(|v| (k.clone(), v)))
                    .collect::<Result<_>>()?,
            ),
            other => other.clone(),
        })
    }

    /// Interpolate one string. A string that is exactly one reference takes
    /// the variable's typed value.
    pub fn string(&self, text: &str) -> Result<Value> {
        if let Some(caps) = self.pattern.captures(text)
            && caps.get(0).is_some_and(|m| m.as_str().len() == text.len())
        {
            return self.lookup(&caps[1]).cloned();
        }
        Ok(Value::String(self.substitute(text, |s| s.to_string())?))
    }

    /// Interpolate to plain text.
    pub fn text(&self, text: &str) -> Result<String> {
        self.substitute(text, |s| s.to_string())
    }

    /// Interpolate and compile a regular expression; values are escaped.
    pub fn pattern(&self, text: &str) -> Result<Regex> {
        let source = self.substitute(text, regex::escape)?;
        Regex::new(&source).with_context(|| format!("invalid pattern '{source}'"))
    }

    fn substitute(&self, text: &str, escape: impl Fn(&str) -> String) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in self.pattern.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&text[last..whole.start()]);
            let rendered = match self.lookup(&caps[1])? {
                Value::String(s) => s.clone(),
                Value::Int(i) => i.to_string(),
                Value::Bool(b) => b.to_string(),
                other => bail!(
                    "variable '{}' is a {} and cannot be embedded in a string",
                    &caps[1],
                    other.type_name()
                ),
            };
            out.push_str(&escape(&rendered));
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> Variables {
        Variables::from([
            ("prefix".to_string(), Value::from("test-acc-abc123")),
            ("mtu".to_string(), Value::Int(1500)),
            ("tags".to_string(), Value::strings(["a", "b"])),
        ])
    }

    #[test]
    fn test_address() {
        assert_eq!(ResourceBlock::new("address", "x").address(), "panos_address.x");
    }

    #[test]
    fn test_embedded_reference() {
        let vars = vars();
        let interp = Interpolator::new(&vars).unwrap();
        assert_eq!(
            interp.string("${var.prefix}-netmask").unwrap(),
            Value::from("test-acc-abc123-netmask")
        );
        assert_eq!(interp.text("mtu=${var.mtu}").unwrap(), "mtu=1500");
    }

    #[test]
    fn test_whole_reference_keeps_type() {
        let vars = vars();
        let interp = Interpolator::new(&vars).unwrap();
        assert_eq!(interp.string("${var.mtu}").unwrap(), Value::Int(1500));
        assert_eq!(interp.string("${var.tags}").unwrap(), Value::strings(["a", "b"]));
    }

    #[test]
    fn test_undefined_variable() {
        let vars = vars();
        let interp = Interpolator::new(&vars).unwrap();
        let err = interp.string("${var.nope}").unwrap_err();
        assert!(err.to_string().contains("undefined variable 'nope'"));
        assert!(interp.text("x ${var.tags} y").is_err());
    }

    #[test]
    fn test_pattern_escapes_values() {
        let vars = Variables::from([("prefix".to_string(), Value::from("a.b"))]);
        let interp = Interpolator::new(&vars).unwrap();
        let regex = interp.pattern("^entry '${var.prefix}' already exists$").unwrap();
        assert!(regex.is_match("entry 'a.b' already exists"));
        assert!(!regex.is_match("entry 'axb' already exists"));
    }

    #[test]
    fn test_render() {
        let config = Config::new(vec![
            ResourceBlock::new("address", "a")
                .location(Value::object([(
                    "device_group",
                    Value::object([("name", Value::from("${var.prefix}"))]),
                )]))
                .with("name", "${var.prefix}-a")
                .with("fqdn", "example.com"),
        ]);
        let vars = vars();
        let rendered = config.render(&Interpolator::new(&vars).unwrap()).unwrap();
        assert_eq!(rendered[0].address, "panos_address.a");
        assert_eq!(rendered[0].location, Location::device_group("test-acc-abc123"));
        assert_eq!(
            rendered[0].desired.get("name"),
            Some(&Value::from("test-acc-abc123-a"))
        );
    }

    #[test]
    fn test_render_rejects_duplicates_and_bad_locations() {
        let vars = vars();
        let interp = Interpolator::new(&vars).unwrap();
        let dup = Config::new(vec![
            ResourceBlock::new("tag", "t").location(Value::object([("shared", Value::empty_object())])),
            ResourceBlock::new("tag", "t").location(Value::object([("shared", Value::empty_object())])),
        ]);
        assert!(dup.render(&interp).is_err());

        let bad = Config::new(vec![
            ResourceBlock::new("tag", "t").location(Value::object([("cloud", Value::empty_object())])),
        ]);
        let err = bad.render(&interp).unwrap_err();
        assert!(format!("{err:#}").contains("panos_tag.t: location"));
    }
}
