//! `ethernet_layer3_subinterface` entries.
//!
//! The deepest schema shipped: nested IPv6 address entries with an
//! `advertise` block, the TCP MSS adjustment block and static ARP entries.

use crate::schema::{Attribute, Schema};
use panoskit::ScopeKind;

fn ipv6_address() -> Attribute {
    Attribute::entries(
        "address",
        vec![
            Attribute::name(),
            Attribute::bool("enable_on_interface").default_value(true),
            Attribute::marker("prefix"),
            Attribute::marker("anycast"),
            Attribute::object(
                "advertise",
                vec![
                    Attribute::bool("enable"),
                    Attribute::string("valid_lifetime"),
                    Attribute::string("preferred_lifetime"),
                    Attribute::bool("onlink_flag"),
                    Attribute::bool("auto_config_flag"),
                ],
            ),
        ],
        false,
    )
}

pub fn schema() -> Schema {
    Schema::new("ethernet_layer3_subinterface", "Network/EthernetSubinterfaces")
        .description("Layer-3 subinterface of an ethernet port")
        .scopes(&[ScopeKind::Template, ScopeKind::Vsys])
        .attribute(Attribute::string("parent").required())
        .attribute(Attribute::int("tag"))
        .attribute(Attribute::string("comment"))
        .attribute(Attribute::int("mtu"))
        .attribute(Attribute::string("netflow_profile"))
        .attribute(Attribute::string("interface_management_profile"))
        .attribute(Attribute::bool("decrypt_forward"))
        .attribute(Attribute::bool("df_ignore"))
        .attribute(Attribute::object(
            "adjust_tcp_mss",
            vec![
                Attribute::bool("enable"),
                Attribute::int("ipv4_mss_adjustment"),
                Attribute::int("ipv6_mss_adjustment"),
            ],
        ))
        .attribute(Attribute::entries(
            "arp",
            vec![Attribute::name(), Attribute::string("hw_address")],
            false,
        ))
        .attribute(Attribute::entries("ip", vec![Attribute::name()], true))
        .attribute(Attribute::object(
            "ipv6",
            vec![
                Attribute::bool("enabled"),
                Attribute::string("interface_id").default_value("EUI-64"),
                ipv6_address(),
            ],
        ))
}
