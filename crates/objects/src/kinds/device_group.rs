//! `device_group` entries on Panorama.

use crate::schema::{Attribute, Schema};
use panoskit::ScopeKind;

pub fn schema() -> Schema {
    Schema::new("device_group", "Panorama/DeviceGroups")
        .description("Panorama device group")
        .scopes(&[ScopeKind::Panorama])
        .attribute(Attribute::string("description"))
        .attribute(Attribute::string("authorization_code"))
        .attribute(Attribute::members("templates", false).wire("reference-templates"))
        .attribute(Attribute::entries(
            "devices",
            vec![Attribute::name(), Attribute::members("vsys", false)],
            false,
        ))
}
