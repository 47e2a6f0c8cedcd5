//! # Acctest
//!
//! Acceptance-test harness for PAN-OS entry reconciliation.
//!
//! A [`Scenario`] is an ordered list of [`Step`]s. Each step declares
//! resources, optionally mutates the device out of band through [`Hook`]s,
//! and asserts on the plan, the stored state and the device itself. The
//! [`Runner`] drives a minimal [`Controller`] through refresh, plan and
//! apply for every step, then destroys everything and verifies that no
//! entry carrying the case prefix is left behind.
//!
//! ## Example
//!
//! ```
//! use acctest::{Config, ResourceBlock, Runner, Scenario, Step, scenarios};
//! use objects::location_value;
//! use panoskit::{Client, Location, MemoryBackend};
//! use std::sync::Arc;
//!
//! let runner = Runner::new(Client::new(Arc::new(MemoryBackend::new())));
//! let tag = ResourceBlock::new("tag", "t")
//!     .location(location_value(&Location::shared()).unwrap())
//!     .with("name", "${var.prefix}-tag");
//! let scenario = Scenario::new("tag").step(Step::new(Config::new(vec![tag])));
//! assert!(runner.run(&scenario).passed());
//!
//! assert!(!scenarios::builtins().unwrap().is_empty());
//! ```

pub mod config;
pub mod controller;
pub mod destroy;
pub mod devicecheck;
pub mod file;
pub mod hooks;
pub mod knownvalue;
pub mod path;
pub mod plancheck;
pub mod prefix;
pub mod report;
pub mod runner;
pub mod scenarios;
pub mod statecheck;

pub use config::{Config, Interpolator, RenderedResource, ResourceBlock, Variables};
pub use controller::{Action, Controller, Plan, PlannedChange, State};
pub use destroy::{Touched, check_destroyed, sweep};
pub use devicecheck::DeviceCheck;
pub use hooks::{CreatedEntry, Hook, HookContext};
pub use knownvalue::KnownValue;
pub use path::AttrPath;
pub use plancheck::PlanCheck;
pub use report::{CaseReport, CaseStatus, RunReport, StepReport};
pub use runner::{RunObserver, Runner, Scenario, Step};
pub use statecheck::StateCheck;
