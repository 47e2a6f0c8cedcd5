//! Registry of supported object kinds.

mod address;
mod address_group;
mod device_group;
mod layer3_subinterface;
mod security_profile_group;
mod service;
mod tag;
mod template;
mod virtual_router;

use crate::error::{CodecError, Result};
use crate::schema::Schema;
use std::sync::LazyLock;

static REGISTRY: LazyLock<Vec<Schema>> = LazyLock::new(|| {
    vec![
        address::schema(),
        address_group::schema(),
        service::schema(),
        tag::schema(),
        security_profile_group::schema(),
        layer3_subinterface::schema(),
        virtual_router::schema(),
        device_group::schema(),
        template::schema(),
    ]
});

/// All registered schemas, in registration order.
pub fn all() -> &'static [Schema] {
    &REGISTRY
}

/// Look up a kind by name.
pub fn get(kind: &str) -> Option<&'static Schema> {
    REGISTRY.iter().find(|schema| schema.kind == kind)
}

/// Look up a kind by name, failing with [`CodecError::UnknownKind`].
pub fn require(kind: &str) -> Result<&'static Schema> {
    get(kind).ok_or_else(|| CodecError::UnknownKind(kind.to_string()))
}

/// `(kind, endpoint)` pairs for configuring a REST backend.
pub fn endpoints() -> impl Iterator<Item = (&'static str, &'static str)> {
    REGISTRY.iter().map(|schema| (schema.kind, schema.endpoint))
}
