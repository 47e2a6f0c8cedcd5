//! Object kind schemas.
//!
//! A [`Schema`] declares the attributes of one object kind: their types,
//! wire names, defaults, list ordering and mutually exclusive groups. The
//! codec walks the schema to canonicalize user input and to translate between
//! attribute trees and device entries.

use crate::value::Value;
use panoskit::ScopeKind;
use std::fmt::Write as _;

/// Attribute type.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrType {
    String,
    Int,
    Bool,
    /// List of strings. Unordered lists compare as sets.
    Members { ordered: bool },
    /// Nested block.
    Object(Vec<Attribute>),
    /// List of named blocks. Each element carries a `name` attribute.
    Entries {
        attributes: Vec<Attribute>,
        ordered: bool,
    },
    /// Block where exactly one child may be set.
    Variant(Vec<Attribute>),
}

impl AttrType {
    /// Short type name for listings.
    pub fn label(&self) -> &'static str {
        match self {
            AttrType::String => "string",
            AttrType::Int => "int",
            AttrType::Bool => "bool",
            AttrType::Members { ordered: true } => "list(string)",
            AttrType::Members { ordered: false } => "set(string)",
            AttrType::Object(_) => "object",
            AttrType::Entries { ordered: true, .. } => "list(object)",
            AttrType::Entries { ordered: false, .. } => "set(object)",
            AttrType::Variant(_) => "variant",
        }
    }

    /// Child attributes of block types.
    pub fn children(&self) -> &[Attribute] {
        match self {
            AttrType::Object(children) | AttrType::Variant(children) => children,
            AttrType::Entries { attributes, .. } => attributes,
            _ => &[],
        }
    }
}

/// One schema attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: &'static str,
    /// Key used on the device; defaults to the name in kebab-case.
    pub wire: String,
    pub ty: AttrType,
    pub required: bool,
    /// Value the device assumes when the attribute is omitted.
    pub default: Option<Value>,
}

impl Attribute {
    fn new(name: &'static str, ty: AttrType) -> Self {
        Self {
            name,
            wire: name.replace('_', "-"),
            ty,
            required: false,
            default: None,
        }
    }

    /// The entry name, carried as `@name` on the wire.
    pub fn name() -> Self {
        Self::string("name").wire("@name").required()
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, AttrType::String)
    }

    pub fn int(name: &'static str) -> Self {
        Self::new(name, AttrType::Int)
    }

    pub fn bool(name: &'static str) -> Self {
        Self::new(name, AttrType::Bool)
    }

    pub fn members(name: &'static str, ordered: bool) -> Self {
        Self::new(name, AttrType::Members { ordered })
    }

    pub fn object(name: &'static str, children: Vec<Attribute>) -> Self {
        Self::new(name, AttrType::Object(children))
    }

    /// An empty block used as a flag (e.g. `discard = {}`).
    pub fn marker(name: &'static str) -> Self {
        Self::new(name, AttrType::Object(Vec::new()))
    }

    pub fn entries(name: &'static str, attributes: Vec<Attribute>, ordered: bool) -> Self {
        Self::new(
            name,
            AttrType::Entries {
                attributes,
                ordered,
            },
        )
    }

    pub fn variant(name: &'static str, children: Vec<Attribute>) -> Self {
        Self::new(name, AttrType::Variant(children))
    }

    /// Override the wire key.
    #[must_use]
    pub fn wire(mut self, wire: &str) -> Self {
        self.wire = wire.to_string();
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Attributes of which at most one may be set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneOf {
    pub attributes: Vec<&'static str>,
    /// Whether exactly one (rather than at most one) must be set.
    pub required: bool,
}

/// Schema of one object kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Kind name, e.g. `address`.
    pub kind: &'static str,
    /// REST endpoint path, e.g. `Objects/Addresses`.
    pub endpoint: &'static str,
    pub description: &'static str,
    /// Scope kinds the object may live in.
    pub scopes: Vec<ScopeKind>,
    pub attributes: Vec<Attribute>,
    pub one_of: Vec<OneOf>,
}

impl Schema {
    /// Start a schema. The `name` attribute is always present.
    pub fn new(kind: &'static str, endpoint: &'static str) -> Self {
        Self {
            kind,
            endpoint,
            description: "",
            scopes: Vec::new(),
            attributes: vec![Attribute::name()],
            one_of: Vec::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    #[must_use]
    pub fn scopes(mut self, scopes: &[ScopeKind]) -> Self {
        self.scopes = scopes.to_vec();
        self
    }

    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Declare a mutually exclusive group.
    #[must_use]
    pub fn one_of(mut self, attributes: &[&'static str], required: bool) -> Self {
        self.one_of.push(OneOf {
            attributes: attributes.to_vec(),
            required,
        });
        self
    }

    /// Look up a top-level attribute.
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Human-readable attribute tree for listings.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        describe_into(&mut out, &self.attributes, 0);
        for group in &self.one_of {
            let _ = writeln!(
                out,
                "{} of: {}",
                if group.required { "exactly one" } else { "at most one" },
                group.attributes.join(", ")
            );
        }
        out
    }
}

fn describe_into(out: &mut String, attributes: &[Attribute], depth: usize) {
    for attr in attributes {
        let mut line = format!("{}{} ({})", "  ".repeat(depth), attr.name, attr.ty.label());
        if attr.required {
            line.push_str(" required");
        }
        if let Some(default) = &attr.default {
            let _ = write!(line, " default={default}");
        }
        let _ = writeln!(out, "{line}");
        describe_into(out, attr.ty.children(), depth + 1);
    }
}
