//! Built-in scenario catalog.
//!
//! Most scenarios are TOML files embedded at build time; scenarios that need
//! closure hooks are built in Rust.

use crate::config::{Config, ResourceBlock};
use crate::controller::Action;
use crate::file;
use crate::hooks::Hook;
use crate::knownvalue::KnownValue;
use crate::path::AttrPath;
use crate::plancheck::PlanCheck;
use crate::runner::{Scenario, Step};
use crate::statecheck::StateCheck;
use anyhow::{Context, Result};
use objects::{Value, location_value};
use panoskit::Location;

const FILES: &[(&str, &str)] = &[
    (
        "address_multi_variant.toml",
        include_str!("address_multi_variant.toml"),
    ),
    ("address_rename.toml", include_str!("address_rename.toml")),
    (
        "address_rename_missing_source.toml",
        include_str!("address_rename_missing_source.toml"),
    ),
    (
        "address_rename_conflict.toml",
        include_str!("address_rename_conflict.toml"),
    ),
    (
        "layer3_subinterface_idempotent.toml",
        include_str!("layer3_subinterface_idempotent.toml"),
    ),
    (
        "security_profile_group_destroy.toml",
        include_str!("security_profile_group_destroy.toml"),
    ),
    ("address_drift.toml", include_str!("address_drift.toml")),
    ("address_recreate.toml", include_str!("address_recreate.toml")),
    ("address_replace.toml", include_str!("address_replace.toml")),
    (
        "virtual_router_nexthops.toml",
        include_str!("virtual_router_nexthops.toml"),
    ),
    ("address_validation.toml", include_str!("address_validation.toml")),
];

/// Every built-in scenario, in catalog order.
pub fn builtins() -> Result<Vec<Scenario>> {
    let mut scenarios = FILES
        .iter()
        .map(|(name, text)| {
            file::load_str(text).with_context(|| format!("built-in scenario {name}"))
        })
        .collect::<Result<Vec<_>>>()?;
    scenarios.push(address_group_members()?);
    Ok(scenarios)
}

/// Look up a built-in scenario by name.
pub fn find(name: &str) -> Result<Option<Scenario>> {
    Ok(builtins()?.into_iter().find(|s| s.name == name))
}

/// Static group members created by a closure hook, then swapped.
fn address_group_members() -> Result<Scenario> {
    let shared = location_value(&Location::shared())?;
    let members = Hook::custom(|ctx| {
        let members = [
            ("one", "10.2.0.1/32"),
            ("two", "10.2.0.2/32"),
            ("three", "10.2.0.3/32"),
        ];
        for (suffix, netmask) in members {
            let address = Value::object([
                ("name", Value::from(format!("{}-member-{suffix}", ctx.prefix))),
                ("ip_netmask", Value::from(netmask)),
            ]);
            ctx.create_entry("address", &Location::shared(), &address)?;
        }
        Ok(())
    });
    let group = |members: &[&str]| {
        let names: Vec<String> = members
            .iter()
            .map(|m| format!("${{var.prefix}}-member-{m}"))
            .collect();
        Config::new(vec![
            ResourceBlock::new("address_group", "grp")
                .location(shared.clone())
                .with("name", "${var.prefix}-grp")
                .with("static", Value::strings(names)),
        ])
    };

    Ok(Scenario::new("address-group-members")
        .description("Static members are stored sorted; changing them updates in place")
        .parallel()
        .step(
            Step::new(group(&["two", "one"]))
                .hook(members)
                .state_check(StateCheck::expect_known_value(
                    "panos_address_group.grp",
                    AttrPath::new("static"),
                    KnownValue::list_exact([
                        KnownValue::string_exact("${var.prefix}-member-one"),
                        KnownValue::string_exact("${var.prefix}-member-two"),
                    ]),
                ))
                .state_check(StateCheck::expect_known_value(
                    "panos_address_group.grp",
                    AttrPath::new("dynamic"),
                    KnownValue::null(),
                ))
                .import("panos_address_group.grp"),
        )
        .step(
            Step::new(group(&["three", "one"]))
                .plan_check(PlanCheck::expect_action("panos_address_group.grp", Action::Update))
                .state_check(StateCheck::expect_known_value(
                    "panos_address_group.grp",
                    AttrPath::new("static").at_slice_index(1),
                    KnownValue::string_exact("${var.prefix}-member-three"),
                )),
        ))
}
