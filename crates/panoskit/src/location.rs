//! Location resolution.
//!
//! A [`Location`] is what users write: a struct with one optional field per
//! variant. [`resolve`] validates that exactly one variant is set and turns it
//! into a [`Scope`], the handle every backend accepts.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default device name used by Panorama and firewall locations.
pub const DEFAULT_DEVICE: &str = "localhost.localdomain";

/// Default virtual system name.
pub const DEFAULT_VSYS: &str = "vsys1";

fn default_device() -> String {
    DEFAULT_DEVICE.to_string()
}

fn default_vsys() -> String {
    DEFAULT_VSYS.to_string()
}

/// Global Panorama scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PanoramaLocation {}

/// Shared scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharedLocation {}

/// A device group under Panorama.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceGroupLocation {
    pub name: String,
    #[serde(default = "default_device")]
    pub panorama_device: String,
}

/// A template, optionally narrowed to one vsys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateLocation {
    pub name: String,
    #[serde(default)]
    pub vsys: Option<String>,
    #[serde(default = "default_device")]
    pub panorama_device: String,
    #[serde(default = "default_device")]
    pub ngfw_device: String,
}

/// A virtual system on a firewall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VsysLocation {
    #[serde(default = "default_vsys")]
    pub name: String,
    #[serde(default = "default_device")]
    pub ngfw_device: String,
}

/// User-supplied location: exactly one field must be set.
///
/// All fields serialize, including absent ones as `null`, so the location
/// renders the same way in state no matter how it was written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Location {
    #[serde(default)]
    pub panorama: Option<PanoramaLocation>,
    #[serde(default)]
    pub shared: Option<SharedLocation>,
    #[serde(default)]
    pub device_group: Option<DeviceGroupLocation>,
    #[serde(default)]
    pub template: Option<TemplateLocation>,
    #[serde(default)]
    pub vsys: Option<VsysLocation>,
}

impl Location {
    /// Panorama location.
    pub fn panorama() -> Self {
        Self {
            panorama: Some(PanoramaLocation {}),
            ..Default::default()
        }
    }

    /// Shared location.
    pub fn shared() -> Self {
        Self {
            shared: Some(SharedLocation {}),
            ..Default::default()
        }
    }

    /// Device group location.
    pub fn device_group(name: impl Into<String>) -> Self {
        Self {
            device_group: Some(DeviceGroupLocation {
                name: name.into(),
                panorama_device: default_device(),
            }),
            ..Default::default()
        }
    }

    /// Template location.
    pub fn template(name: impl Into<String>) -> Self {
        Self {
            template: Some(TemplateLocation {
                name: name.into(),
                vsys: None,
                panorama_device: default_device(),
                ngfw_device: default_device(),
            }),
            ..Default::default()
        }
    }

    /// Template location narrowed to a vsys.
    pub fn template_vsys(name: impl Into<String>, vsys: impl Into<String>) -> Self {
        let mut location = Self::template(name);
        if let Some(template) = location.template.as_mut() {
            template.vsys = Some(vsys.into());
        }
        location
    }

    /// Vsys location.
    pub fn vsys(name: impl Into<String>) -> Self {
        Self {
            vsys: Some(VsysLocation {
                name: name.into(),
                ngfw_device: default_device(),
            }),
            ..Default::default()
        }
    }

    /// Names of the variants that are set.
    pub fn variants(&self) -> Vec<&'static str> {
        let mut set = Vec::new();
        if self.panorama.is_some() {
            set.push("panorama");
        }
        if self.shared.is_some() {
            set.push("shared");
        }
        if self.device_group.is_some() {
            set.push("device_group");
        }
        if self.template.is_some() {
            set.push("template");
        }
        if self.vsys.is_some() {
            set.push("vsys");
        }
        set
    }
}

/// Kind of scope, used by object kinds to declare where they may live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Panorama,
    Shared,
    DeviceGroup,
    Template,
    Vsys,
}

impl ScopeKind {
    /// Location variant name for this scope kind.
    pub fn variant(&self) -> &'static str {
        match self {
            ScopeKind::Panorama => "panorama",
            ScopeKind::Shared => "shared",
            ScopeKind::DeviceGroup => "device_group",
            ScopeKind::Template => "template",
            ScopeKind::Vsys => "vsys",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variant())
    }
}

/// A resolved query scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Panorama,
    Shared,
    DeviceGroup { name: String },
    Template { name: String, vsys: Option<String> },
    Vsys { name: String },
}

impl Scope {
    /// The kind of this scope.
    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Panorama => ScopeKind::Panorama,
            Scope::Shared => ScopeKind::Shared,
            Scope::DeviceGroup { .. } => ScopeKind::DeviceGroup,
            Scope::Template { .. } => ScopeKind::Template,
            Scope::Vsys { .. } => ScopeKind::Vsys,
        }
    }

    /// Query parameters selecting this scope on the REST API.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        match self {
            Scope::Panorama => Vec::new(),
            Scope::Shared => vec![("location", "shared".to_string())],
            Scope::DeviceGroup { name } => vec![
                ("location", "device-group".to_string()),
                ("device-group", name.clone()),
            ],
            Scope::Template { name, vsys } => {
                let mut params = vec![
                    ("location", "template".to_string()),
                    ("template", name.clone()),
                ];
                if let Some(vsys) = vsys {
                    params.push(("vsys", vsys.clone()));
                }
                params
            }
            Scope::Vsys { name } => vec![("location", "vsys".to_string()), ("vsys", name.clone())],
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Panorama => write!(f, "panorama"),
            Scope::Shared => write!(f, "shared"),
            Scope::DeviceGroup { name } => write!(f, "device-group:{name}"),
            Scope::Template {
                name,
                vsys: Some(vsys),
            } => write!(f, "template:{name}/{vsys}"),
            Scope::Template { name, vsys: None } => write!(f, "template:{name}"),
            Scope::Vsys { name } => write!(f, "vsys:{name}"),
        }
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_location(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Resolve a location into a scope.
///
/// Pure: no I/O. Fails when zero or several variants are set, or when a
/// required sub-field is empty.
pub fn resolve(location: &Location) -> Result<Scope> {
    let set = location.variants();
    match set.len() {
        0 => return Err(Error::invalid_location("no location variant set")),
        1 => {}
        _ => {
            return Err(Error::invalid_location(format!(
                "exactly one location variant must be set, found {}",
                set.join(", ")
            )));
        }
    }

    if location.panorama.is_some() {
        return Ok(Scope::Panorama);
    }
    if location.shared.is_some() {
        return Ok(Scope::Shared);
    }
    if let Some(dg) = &location.device_group {
        require("device_group.name", &dg.name)?;
        return Ok(Scope::DeviceGroup {
            name: dg.name.clone(),
        });
    }
    if let Some(template) = &location.template {
        require("template.name", &template.name)?;
        if let Some(vsys) = &template.vsys {
            require("template.vsys", vsys)?;
        }
        return Ok(Scope::Template {
            name: template.name.clone(),
            vsys: template.vsys.clone(),
        });
    }
    match &location.vsys {
        Some(vsys) => {
            require("vsys.name", &vsys.name)?;
            Ok(Scope::Vsys {
                name: vsys.name.clone(),
            })
        }
        None => Err(Error::invalid_location("no location variant set")),
    }
}

/// Resolve a location and check it against the scope kinds an object allows.
pub fn resolve_for(location: &Location, kind: &str, allowed: &[ScopeKind]) -> Result<Scope> {
    let scope = resolve(location)?;
    if !allowed.contains(&scope.kind()) {
        return Err(Error::invalid_location(format!(
            "{kind} cannot be managed at a {} location",
            scope.kind()
        )));
    }
    Ok(scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_each_variant() {
        assert_eq!(resolve(&Location::panorama()).unwrap(), Scope::Panorama);
        assert_eq!(resolve(&Location::shared()).unwrap(), Scope::Shared);
        assert_eq!(
            resolve(&Location::device_group("dg1")).unwrap(),
            Scope::DeviceGroup {
                name: "dg1".to_string()
            }
        );
        assert_eq!(
            resolve(&Location::template_vsys("t1", "vsys2")).unwrap(),
            Scope::Template {
                name: "t1".to_string(),
                vsys: Some("vsys2".to_string())
            }
        );
        assert_eq!(
            resolve(&Location::vsys("vsys1")).unwrap(),
            Scope::Vsys {
                name: "vsys1".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_rejects_empty_location() {
        let err = resolve(&Location::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidLocation { .. }));
    }

    #[test]
    fn test_resolve_rejects_two_variants() {
        let mut location = Location::shared();
        location.device_group = Location::device_group("dg").device_group;
        let err = resolve(&location).unwrap_err();
        assert!(err.to_string().contains("shared, device_group"));
    }

    #[test]
    fn test_resolve_rejects_empty_name() {
        let err = resolve(&Location::device_group("  ")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid location: device_group.name must not be empty"
        );
    }

    #[test]
    fn test_resolve_for_checks_scope_kind() {
        let err = resolve_for(
            &Location::panorama(),
            "address",
            &[ScopeKind::Shared, ScopeKind::DeviceGroup],
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid location: address cannot be managed at a panorama location"
        );
    }

    #[test]
    fn test_query_params() {
        let scope = Scope::DeviceGroup {
            name: "dg1".to_string(),
        };
        assert_eq!(
            scope.query_params(),
            vec![
                ("location", "device-group".to_string()),
                ("device-group", "dg1".to_string())
            ]
        );
        assert!(Scope::Panorama.query_params().is_empty());
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let location: Location =
            serde_json::from_str(r#"{"device_group": {"name": "dg1"}}"#).unwrap();
        assert_eq!(location, Location::device_group("dg1"));

        let location: Location = serde_json::from_str(r#"{"vsys": {}}"#).unwrap();
        assert_eq!(location, Location::vsys(DEFAULT_VSYS));
    }

    #[test]
    fn test_deserialize_rejects_unknown_variant() {
        let result: std::result::Result<Location, _> =
            serde_json::from_str(r#"{"cluster": {"name": "x"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_scope_display() {
        let scope = Scope::Template {
            name: "t".to_string(),
            vsys: Some("vsys1".to_string()),
        };
        assert_eq!(scope.to_string(), "template:t/vsys1");
    }
}
