//! `address` objects.

use crate::schema::{Attribute, Schema};
use panoskit::ScopeKind;

pub fn schema() -> Schema {
    Schema::new("address", "Objects/Addresses")
        .description("Address object: netmask, range, FQDN or wildcard")
        .scopes(&[ScopeKind::Shared, ScopeKind::DeviceGroup, ScopeKind::Vsys])
        .attribute(Attribute::string("description"))
        .attribute(Attribute::members("tags", false).wire("tag"))
        .attribute(Attribute::string("ip_netmask"))
        .attribute(Attribute::string("ip_range"))
        .attribute(Attribute::string("fqdn"))
        .attribute(Attribute::string("ip_wildcard"))
        .one_of(&["ip_netmask", "ip_range", "fqdn", "ip_wildcard"], true)
}
