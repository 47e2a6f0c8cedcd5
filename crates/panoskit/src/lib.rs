//! # panoskit
//!
//! Entry-level client for PAN-OS and Panorama configuration.
//!
//! This crate provides:
//! - [`Location`] and [`resolve`]: turn a user-facing location into a [`Scope`]
//! - [`WireEntry`]: a configuration entry in PAN-OS REST JSON shape
//! - [`Backend`]: the uniform {read, create, update, delete, rename, list}
//!   interface, with a REST implementation and an in-process store
//! - [`Client`]: the adapter the reconciler uses, adding deadlines,
//!   cooperative cancellation and logging on top of a backend
//!
//! ## Example
//!
//! ```no_run
//! use panoskit::{CallContext, Client, Location, RestBackend, RestConfig, resolve};
//! use std::sync::Arc;
//!
//! let backend = RestBackend::new(&RestConfig::new("panorama.example.com", "API-KEY"))
//!     .unwrap()
//!     .with_endpoint("address", "Objects/Addresses");
//! let client = Client::new(Arc::new(backend));
//!
//! let scope = resolve(&Location::device_group("branch-offices")).unwrap();
//! let entries = client
//!     .list(&CallContext::new(), &scope, "address", Some("test-acc-"))
//!     .unwrap();
//! for entry in entries {
//!     println!("{}", entry.name);
//! }
//! ```

#![warn(clippy::all)]

pub mod backend;
pub mod client;
pub mod error;
pub mod location;
pub mod types;

pub use backend::Backend;
pub use backend::memory::{JournalEntry, MemoryBackend, Validator};
pub use backend::rest::{RestBackend, RestConfig};
pub use client::Client;
pub use error::{Error, ErrorCategory, Result};
pub use location::{Location, Scope, ScopeKind, resolve, resolve_for};
pub use types::{CallContext, CancelToken, Operation, WireEntry};
