//! `address_group` objects.

use crate::schema::{Attribute, Schema};
use panoskit::ScopeKind;

pub fn schema() -> Schema {
    Schema::new("address_group", "Objects/AddressGroups")
        .description("Static or dynamic group of address objects")
        .scopes(&[ScopeKind::Shared, ScopeKind::DeviceGroup, ScopeKind::Vsys])
        .attribute(Attribute::string("description"))
        .attribute(Attribute::members("tags", false).wire("tag"))
        .attribute(Attribute::members("static", false))
        .attribute(Attribute::object(
            "dynamic",
            vec![Attribute::string("filter").required()],
        ))
        .one_of(&["static", "dynamic"], true)
}
