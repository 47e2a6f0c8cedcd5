//! PAN-OS object kinds.
//!
//! Attribute trees ([`Value`]), per-kind [`Schema`]s, and the codec that
//! canonicalizes desired trees and translates them to and from device
//! entries.
//!
//! # Example
//!
//! ```
//! use objects::{Value, codec, kinds};
//!
//! let schema = kinds::get("address").unwrap();
//! let desired = Value::object([
//!     ("name", Value::from("web")),
//!     ("fqdn", Value::from("example.com")),
//! ]);
//! let entry = codec::encode(schema, &desired).unwrap();
//! let observed = codec::decode(schema, &entry).unwrap();
//! assert_eq!(observed, codec::canonicalize(schema, &desired).unwrap());
//! ```

#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod kinds;
pub mod location;
pub mod schema;
pub mod value;

pub use codec::{canonicalize, decode, encode};
pub use error::{CodecError, Result};
pub use location::{LOCATION_KEY, location_from_value, location_value};
pub use schema::{AttrType, Attribute, OneOf, Schema};
pub use value::Value;
