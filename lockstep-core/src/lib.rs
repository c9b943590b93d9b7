//! Lockstep core library: manifest, lock, prune options, configuration.
//!
//! - [`types`]: project root and revision newtypes
//! - [`manifest`] / [`lock`]: TOML-encoded project artifacts
//! - [`prune`]: cascading prune options and path classification
//! - [`config`]: writer configuration (`~/.lockstep/config.yaml`)
//! - [`layout`]: artifact names below a project root

pub mod config;
pub mod error;
pub mod layout;
pub mod lock;
pub mod manifest;
pub mod prune;
pub mod types;

pub use config::{VendorPolicy, WriterConfig};
pub use error::LockstepError;
pub use lock::{Lock, LockedProject, SolveMeta};
pub use manifest::{Manifest, ProjectConstraint};
pub use prune::{CascadingPruneOptions, FileClassifier, PruneOptions};
pub use types::{ProjectRoot, Revision};
