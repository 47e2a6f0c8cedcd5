//! # Declarative
//!
//! Reconciliation of PAN-OS configuration entries.
//!
//! A controller hands each resource its prior state and a desired attribute
//! tree; the resource decides an ordered list of device commands and runs
//! them, returning the observed state after the transition.
//!
//! ## Core Concepts
//!
//! - **Resource**: the five lifecycle callbacks (create, read, update,
//!   delete, import) for one object kind
//! - **EntryState**: stored state of one managed entry
//! - **Planner**: pure functions from (prior, desired, device lookups) to commands
//! - **Executor**: runs commands through a [`panoskit::Client`]
//!
//! ## Example
//!
//! ```
//! use declarative::{ApplyContext, EntryResource, Resource};
//! use objects::Value;
//! use panoskit::{Client, Location, MemoryBackend};
//! use std::sync::Arc;
//!
//! let client = Client::new(Arc::new(MemoryBackend::new()));
//! let resource = EntryResource::for_kind("address", client).unwrap();
//! let desired = Value::object([
//!     ("name", Value::from("web")),
//!     ("fqdn", Value::from("example.com")),
//! ]);
//!
//! let mut ctx = ApplyContext::default();
//! let outcome = resource.create(&mut ctx, &Location::shared(), &desired).unwrap();
//! let state = outcome.state.unwrap();
//! assert_eq!(state.name, "web");
//!
//! // A second apply of the same tree decides nothing.
//! let again = resource.update(&mut ctx, &state, &desired).unwrap();
//! assert!(again.commands.is_empty());
//! ```
//!
//! ## Provider Traits
//!
//! - [`Resource`]: lifecycle callbacks, implemented by [`EntryResource`]
//! - [`ProgressCallback`]: receives a notification around each command
//!
//! Device access goes through [`panoskit::Backend`], so the same resource
//! runs against a live device or the in-process store.

pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{ApplyContext, NoProgress, ProgressCallback, RecordProgress};
pub use diff::{AttrChange, DiffSummary, compute_diffs};
pub use error::{Error, ErrorKind, Result};
pub use executor::execute;
pub use planner::UpdateLookup;
pub use resource::{BoxedResource, EntryResource, Resource};
pub use types::{ApplyResult, Command, EntryState, EntryStatus, ExecuteSummary, Outcome};
