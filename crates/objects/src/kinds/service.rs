//! `service` objects.

use crate::schema::{Attribute, Schema};
use panoskit::ScopeKind;

fn port_block(name: &'static str) -> Attribute {
    Attribute::object(
        name,
        vec![
            Attribute::string("destination_port").wire("port").required(),
            Attribute::string("source_port"),
        ],
    )
}

pub fn schema() -> Schema {
    Schema::new("service", "Objects/Services")
        .description("TCP or UDP service object")
        .scopes(&[ScopeKind::Shared, ScopeKind::DeviceGroup, ScopeKind::Vsys])
        .attribute(Attribute::string("description"))
        .attribute(Attribute::members("tags", false).wire("tag"))
        .attribute(
            Attribute::variant("protocol", vec![port_block("tcp"), port_block("udp")]).required(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn test_protocol_variant_wire_shape() {
        let value = Value::object([
            ("name", Value::from("web")),
            (
                "protocol",
                Value::object([(
                    "tcp",
                    Value::object([("destination_port", Value::from("80,443"))]),
                )]),
            ),
        ]);
        let entry = encode(&schema(), &value).unwrap();
        assert_eq!(entry.fields["protocol"], json!({"tcp": {"port": "80,443"}}));

        let observed = decode(&schema(), &entry).unwrap();
        let protocol = observed.get("protocol").unwrap();
        assert_eq!(protocol.get("udp"), Some(&Value::Null));
    }
}
