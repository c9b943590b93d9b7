//! # lockstep-writer
//!
//! Transactional writer for a project's manifest, lock and vendor tree.
//!
//! Build a [`SafeWriter`] from the artifacts to write and a
//! [`VendorPolicy`](lockstep_core::VendorPolicy), then call
//! [`SafeWriter::write`]. Everything is staged in a temporary directory
//! first; the project root only changes during the final ordered commit.
//!
//! [`LockDiff`] and [`verify_vendor`] back the `diff` and `verify` commands.

pub mod cancel;
pub mod commit;
pub mod diff;
pub mod error;
mod fs_ops;
pub mod plan;
pub mod preserve;
pub mod source;
pub mod stage;
pub mod verify;
pub mod writer;

pub use cancel::CancellationToken;
pub use commit::{ArtifactOutcome, CommitReport};
pub use diff::{LockDiff, ProjectChange};
pub use error::{SourceError, Stage, WriterError};
pub use plan::{Artifact, WritePlan};
pub use preserve::{find_vcs_metadata, has_dot_git, VCS_METADATA_NAMES};
pub use source::{FileTree, LocalSourceManager, SourceManager};
pub use stage::StagingArea;
pub use verify::{verify_vendor, ProjectStatus, VendorStatus};
pub use writer::{SafeWriter, WriteReport};
