//! A feature flag registry and evaluation service.
//!
//! # Overview
//!
//! Flags live in a [`Registry`], a concurrency-safe in-memory map from flag name to [`Flag`].
//! Each flag has a global `enabled` setting plus lists of targeted users and regions that are
//! always enabled. [`Registry::evaluate`] decides whether a flag is on for a user and region and
//! explains the decision with a [`Reason`]:
//!
//! 1. the user is targeted: enabled, [`Reason::UserTargeted`];
//! 2. the region is targeted: enabled, [`Reason::RegionTargeted`];
//! 3. otherwise the global setting, [`Reason::GlobalSetting`].
//!
//! A [`Snapshot`] stores the whole registry as one JSON document. [`FlagService`] ties a registry
//! to its snapshot and saves after every mutation. The [`api`] module serves the service over
//! HTTP.
//!
//! ```
//! # use flagpole::{Reason, Registry};
//! let registry = Registry::with_defaults();
//!
//! let evaluation = registry.evaluate("new-homepage", "999", "us").unwrap();
//! assert!(evaluation.enabled);
//! assert_eq!(evaluation.reason, Reason::RegionTargeted);
//!
//! assert!(registry.evaluate("unknown", "999", "us").is_none());
//! ```
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. A missing flag is not an error: lookups return
//! `Option` and updates or deletions return `bool`.
//!
//! A failed save is reported to the caller of the mutation, but the mutation itself stays applied
//! in memory.
//!
//! # Logging
//!
//! The crate uses the [`log`](https://docs.rs/log/latest/log/) crate with target `flagpole`.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

pub mod api;
mod config;
mod error;
mod eval;
mod flag;
mod registry;
mod service;
mod snapshot;

pub use config::ServerConfig;
pub use error::{Error, Result};
pub use eval::{Evaluation, Reason};
pub use flag::Flag;
pub use registry::Registry;
pub use service::FlagService;
pub use snapshot::{LoadOutcome, Snapshot};
