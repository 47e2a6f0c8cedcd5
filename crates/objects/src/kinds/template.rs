//! `template` entries on Panorama.

use crate::schema::{Attribute, Schema};
use panoskit::ScopeKind;

pub fn schema() -> Schema {
    Schema::new("template", "Panorama/Templates")
        .description("Panorama template")
        .scopes(&[ScopeKind::Panorama])
        .attribute(Attribute::string("description"))
        .attribute(Attribute::string("default_vsys"))
}
