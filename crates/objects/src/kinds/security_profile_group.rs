//! `security_profile_group` objects.

use crate::schema::{Attribute, Schema};
use panoskit::ScopeKind;

pub fn schema() -> Schema {
    Schema::new("security_profile_group", "Objects/SecurityProfileGroups")
        .description("Bundle of security profiles applied by policy")
        .scopes(&[ScopeKind::Shared, ScopeKind::DeviceGroup, ScopeKind::Vsys])
        .attribute(Attribute::members("antivirus", false).wire("virus"))
        .attribute(Attribute::members("anti_spyware", false).wire("spyware"))
        .attribute(Attribute::members("vulnerability", false))
        .attribute(Attribute::members("url_filtering", false))
        .attribute(Attribute::members("file_blocking", false))
        .attribute(Attribute::members("data_filtering", false))
        .attribute(Attribute::members("wildfire_analysis", false))
}
