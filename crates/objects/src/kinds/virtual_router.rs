//! `virtual_router` entries with static routes.

use crate::schema::{Attribute, Schema};
use panoskit::ScopeKind;

fn static_route() -> Vec<Attribute> {
    vec![
        Attribute::name(),
        Attribute::string("destination").required(),
        Attribute::string("interface"),
        Attribute::int("metric").default_value(10),
        Attribute::int("admin_dist"),
        Attribute::variant(
            "nexthop",
            vec![
                Attribute::string("ip_address"),
                Attribute::string("ipv6_address"),
                Attribute::string("fqdn"),
                Attribute::string("next_vr"),
                Attribute::marker("discard"),
                Attribute::marker("receive"),
            ],
        ),
    ]
}

pub fn schema() -> Schema {
    Schema::new("virtual_router", "Network/VirtualRouters")
        .description("Virtual router with static routes")
        .scopes(&[ScopeKind::Template, ScopeKind::Vsys])
        .attribute(Attribute::members("interfaces", false).wire("interface"))
        .attribute(Attribute::object(
            "administrative_distances",
            vec![
                Attribute::int("static").default_value(10),
                Attribute::int("static_ipv6").default_value(10),
                Attribute::int("ospf_int").default_value(30),
                Attribute::int("ospf_ext").default_value(110),
                Attribute::int("ebgp").default_value(20),
                Attribute::int("ibgp").default_value(200),
                Attribute::int("rip").default_value(120),
            ],
        )
        .wire("admin-dists"))
        .attribute(Attribute::entries("static_routes", static_route(), false).wire("static-route"))
}
