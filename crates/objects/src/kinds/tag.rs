//! `tag` objects.

use crate::schema::{Attribute, Schema};
use panoskit::ScopeKind;

pub fn schema() -> Schema {
    Schema::new("tag", "Objects/Tags")
        .description("Administrative tag")
        .scopes(&[ScopeKind::Shared, ScopeKind::DeviceGroup, ScopeKind::Vsys])
        .attribute(Attribute::string("color"))
        .attribute(Attribute::string("comments"))
}
