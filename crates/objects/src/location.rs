//! Locations as attribute trees.
//!
//! State stores the location as an ordinary attribute (`location`), with
//! every variant key present so checks can address it uniformly.

use crate::error::{CodecError, Result};
use crate::value::Value;
use panoskit::Location;

/// Attribute key carrying the location in stored state.
pub const LOCATION_KEY: &str = "location";

/// Render a location as a canonical tree.
pub fn location_value(location: &Location) -> Result<Value> {
    let json = serde_json::to_value(location).map_err(|e| CodecError::Location(e.to_string()))?;
    Value::from_json(json)
}

/// Parse a location tree, filling defaults.
pub fn location_from_value(value: &Value) -> Result<Location> {
    serde_json::from_value(value.to_json()).map_err(|e| CodecError::Location(e.to_string()))
}
