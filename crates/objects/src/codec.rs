//! Entry codec.
//!
//! Three operations, all driven by a [`Schema`]:
//!
//! - [`canonicalize`] fills defaults, sorts unordered lists and validates
//!   required attributes and exclusive groups. An empty list is the same as
//!   an absent one, since the device drops empty containers. Two canonical
//!   trees are equal exactly when the device would consider them equal.
//! - [`encode`] turns a tree into a [`WireEntry`] in PAN-OS REST shape.
//! - [`decode`] parses a device entry back into a canonical tree. Fields the
//!   schema does not know are reported as [`CodecError::SchemaMismatch`];
//!   `@`-prefixed metadata other than `@name` is ignored.

use crate::error::{CodecError, Result, index, join};
use crate::schema::{AttrType, Attribute, OneOf, Schema};
use crate::value::Value;
use panoskit::WireEntry;
use panoskit::types::NAME_KEY;
use serde_json::{Map, Value as Json};
use std::collections::{BTreeMap, BTreeSet};

const MEMBER_KEY: &str = "member";
const ENTRY_KEY: &str = "entry";

/// Canonicalize a user-supplied tree.
pub fn canonicalize(schema: &Schema, value: &Value) -> Result<Value> {
    let out = canon_block(&schema.attributes, value, "")?;
    check_groups(schema.kind, &schema.one_of, &out)?;
    Ok(out)
}

/// Encode a tree into a device entry.
pub fn encode(schema: &Schema, value: &Value) -> Result<WireEntry> {
    let canonical = canonicalize(schema, value)?;
    let mut fields = encode_block(&schema.attributes, &canonical);
    fields.remove(NAME_KEY);
    let name = canonical
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(WireEntry { name, fields })
}

/// Decode a device entry into a canonical tree.
pub fn decode(schema: &Schema, entry: &WireEntry) -> Result<Value> {
    let mut fields = entry.fields.clone();
    fields.insert(NAME_KEY.to_string(), Json::String(entry.name.clone()));
    let raw = decode_block(&schema.attributes, &fields, "")?;
    canonicalize(schema, &raw)
}

fn type_mismatch(path: &str, expected: &'static str, found: &Value) -> CodecError {
    CodecError::TypeMismatch {
        path: path.to_string(),
        expected,
        found: found.type_name().to_string(),
    }
}

fn entry_name(entry: &Value) -> &str {
    entry.get("name").and_then(Value::as_str).unwrap_or_default()
}

fn set_children(value: &Value) -> Vec<String> {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, _)| k.clone())
                .collect()
        })
        .unwrap_or_default()
}

fn canon_block(attributes: &[Attribute], value: &Value, path: &str) -> Result<Value> {
    let empty = BTreeMap::new();
    let input = match value {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => return Err(type_mismatch(path, "object", other)),
    };

    if let Some(key) = input
        .keys()
        .find(|key| !attributes.iter().any(|a| a.name == key.as_str()))
    {
        return Err(CodecError::UnknownAttribute {
            path: join(path, key),
        });
    }

    let mut out = BTreeMap::new();
    for attr in attributes {
        let child = input.get(attr.name).unwrap_or(&Value::Null);
        let canonical = canon_attr(attr, child, &join(path, attr.name))?;
        out.insert(attr.name.to_string(), canonical);
    }
    Ok(Value::Object(out))
}

fn canon_attr(attr: &Attribute, value: &Value, path: &str) -> Result<Value> {
    if value.is_null() {
        if let Some(default) = &attr.default {
            return Ok(default.clone());
        }
        if attr.required {
            return Err(CodecError::MissingRequired {
                path: path.to_string(),
            });
        }
        return Ok(Value::Null);
    }

    match (&attr.ty, value) {
        (AttrType::String, Value::String(_))
        | (AttrType::Int, Value::Int(_))
        | (AttrType::Bool, Value::Bool(_)) => Ok(value.clone()),
        (AttrType::Members { ordered }, Value::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                if !matches!(item, Value::String(_)) {
                    return Err(type_mismatch(&index(path, i), "string", item));
                }
                out.push(item.clone());
            }
            if !ordered {
                out.sort();
                out.dedup();
            }
            if out.is_empty() {
                return canon_attr(attr, &Value::Null, path);
            }
            Ok(Value::List(out))
        }
        (AttrType::Object(children), Value::Object(_)) => canon_block(children, value, path),
        (AttrType::Entries { attributes, ordered }, Value::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            let mut seen = BTreeSet::new();
            for (i, item) in items.iter().enumerate() {
                let item_path = index(path, i);
                if !matches!(item, Value::Object(_)) {
                    return Err(type_mismatch(&item_path, "object", item));
                }
                let entry = canon_block(attributes, item, &item_path)?;
                let name = entry_name(&entry).to_string();
                if !seen.insert(name.clone()) {
                    return Err(CodecError::DuplicateEntry {
                        path: path.to_string(),
                        name,
                    });
                }
                out.push(entry);
            }
            if !ordered {
                out.sort_by(|a, b| entry_name(a).cmp(entry_name(b)));
            }
            if out.is_empty() {
                return canon_attr(attr, &Value::Null, path);
            }
            Ok(Value::List(out))
        }
        (AttrType::Variant(children), Value::Object(_)) => {
            let out = canon_block(children, value, path)?;
            let set = set_children(&out);
            match set.len() {
                1 => Ok(out),
                0 => Err(CodecError::VariantMissing {
                    path: path.to_string(),
                    choices: children.iter().map(|c| c.name.to_string()).collect(),
                }),
                _ => Err(CodecError::VariantConflict {
                    path: path.to_string(),
                    choices: set,
                }),
            }
        }
        (ty, other) => Err(type_mismatch(path, ty.label(), other)),
    }
}

fn check_groups(kind: &str, groups: &[OneOf], value: &Value) -> Result<()> {
    for group in groups {
        let set: Vec<String> = group
            .attributes
            .iter()
            .filter(|name| value.get(name).is_some_and(|v| !v.is_null()))
            .map(ToString::to_string)
            .collect();
        if set.len() > 1 {
            return Err(CodecError::VariantConflict {
                path: kind.to_string(),
                choices: set,
            });
        }
        if set.is_empty() && group.required {
            return Err(CodecError::VariantMissing {
                path: kind.to_string(),
                choices: group.attributes.iter().map(ToString::to_string).collect(),
            });
        }
    }
    Ok(())
}

fn encode_block(attributes: &[Attribute], value: &Value) -> Map<String, Json> {
    let mut out = Map::new();
    for attr in attributes {
        match value.get(attr.name) {
            None | Some(Value::Null) => {}
            Some(v) => {
                out.insert(attr.wire.clone(), encode_attr(attr, v));
            }
        }
    }
    out
}

fn encode_attr(attr: &Attribute, value: &Value) -> Json {
    match (&attr.ty, value) {
        (AttrType::Bool, Value::Bool(b)) => {
            let flag = if *b { "yes" } else { "no" };
            Json::String(flag.to_string())
        }
        (AttrType::Members { .. }, Value::List(_)) => {
            let mut wrapper = Map::new();
            wrapper.insert(MEMBER_KEY.to_string(), value.to_json());
            Json::Object(wrapper)
        }
        (AttrType::Object(children) | AttrType::Variant(children), _) => {
            Json::Object(encode_block(children, value))
        }
        (AttrType::Entries { attributes, .. }, Value::List(items)) => {
            let entries = items
                .iter()
                .map(|item| Json::Object(encode_block(attributes, item)))
                .collect();
            let mut wrapper = Map::new();
            wrapper.insert(ENTRY_KEY.to_string(), Json::Array(entries));
            Json::Object(wrapper)
        }
        _ => value.to_json(),
    }
}

fn invalid(path: &str, expected: &'static str, found: &Json) -> CodecError {
    CodecError::InvalidWireValue {
        path: path.to_string(),
        expected,
        found: found.to_string(),
    }
}

fn decode_block(attributes: &[Attribute], fields: &Map<String, Json>, path: &str) -> Result<Value> {
    let mut out = BTreeMap::new();
    for (key, json) in fields {
        let attr = attributes.iter().find(|a| a.wire == *key);
        let Some(attr) = attr else {
            if key.starts_with('@') {
                continue;
            }
            return Err(CodecError::SchemaMismatch {
                path: join(path, key),
            });
        };
        let child_path = join(path, attr.name);
        out.insert(attr.name.to_string(), decode_attr(attr, json, &child_path)?);
    }
    Ok(Value::Object(out))
}

/// Unwrap `{"member": [...]}` / `{"entry": [...]}`, accepting a bare
/// array or a single element as well.
fn unwrap_list<'a>(json: &'a Json, key: &str) -> Option<Vec<&'a Json>> {
    let inner = match json {
        Json::Object(map) => map.get(key)?,
        other => other,
    };
    Some(match inner {
        Json::Array(items) => items.iter().collect(),
        Json::Null => Vec::new(),
        single => vec![single],
    })
}

fn decode_attr(attr: &Attribute, json: &Json, path: &str) -> Result<Value> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    match &attr.ty {
        AttrType::String => match json {
            Json::String(s) => Ok(Value::String(s.clone())),
            Json::Number(n) => Ok(Value::String(n.to_string())),
            other => Err(invalid(path, "string", other)),
        },
        AttrType::Int => match json {
            Json::Number(n) => n.as_i64().map(Value::Int).ok_or_else(|| invalid(path, "integer", json)),
            Json::String(s) => s
                .trim()
                .parse()
                .map(Value::Int)
                .map_err(|_| invalid(path, "integer", json)),
            other => Err(invalid(path, "integer", other)),
        },
        AttrType::Bool => match json {
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::String(s) if s == "yes" => Ok(Value::Bool(true)),
            Json::String(s) if s == "no" => Ok(Value::Bool(false)),
            other => Err(invalid(path, "yes/no", other)),
        },
        AttrType::Members { .. } => {
            let items = unwrap_list(json, MEMBER_KEY)
                .ok_or_else(|| invalid(path, "member list", json))?;
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Json::String(s) => Ok(Value::String(s.clone())),
                    Json::Number(n) => Ok(Value::String(n.to_string())),
                    other => Err(invalid(&index(path, i), "string", other)),
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::List)
        }
        AttrType::Object(children) | AttrType::Variant(children) => match json {
            Json::Object(map) => decode_block(children, map, path),
            other => Err(invalid(path, "object", other)),
        },
        AttrType::Entries { attributes, .. } => {
            let items =
                unwrap_list(json, ENTRY_KEY).ok_or_else(|| invalid(path, "entry list", json))?;
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Json::Object(map) => decode_block(attributes, map, &index(path, i)),
                    other => Err(invalid(&index(path, i), "entry", other)),
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::List)
        }
    }
}
