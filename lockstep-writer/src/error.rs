//! Error types for lockstep-writer.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use lockstep_core::{LockstepError, ProjectRoot, Revision};

use crate::plan::Artifact;

/// Where in a write request a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Writer construction and precondition checks; nothing touched.
    Planning,
    /// Building the staging area; the project root is untouched.
    Staging,
    /// Moving staged artifacts into the project root.
    Commit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Planning => write!(f, "planning"),
            Stage::Staging => write!(f, "staging"),
            Stage::Commit => write!(f, "commit"),
        }
    }
}

/// Failures reported by a [`SourceManager`](crate::source::SourceManager).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no source for {project} at revision {revision} (looked in {path})")]
    NotFound {
        project: ProjectRoot,
        revision: Revision,
        path: PathBuf,
    },

    #[error("invalid path '{path}' in source tree: must be relative and stay inside the tree")]
    InvalidPath { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// All errors that can arise from planning, staging and committing.
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("cannot always write vendor with no lock to vendor from: newLock is required")]
    NoLockToVendor,

    #[error("an oldLock was supplied without a newLock; it is only used to diff against one")]
    OldLockWithoutNewLock,

    #[error("root path must not be empty")]
    EmptyRoot,

    #[error("root path {path} does not exist")]
    RootNotFound { path: PathBuf },

    #[error("root path {path} is not a directory")]
    RootNotDirectory { path: PathBuf },

    #[error("a SourceManager is required to write the vendor tree")]
    MissingSourceManager,

    #[error("invalid locked project {project}: {source}")]
    InvalidProject {
        project: ProjectRoot,
        #[source]
        source: LockstepError,
    },

    #[error("failed to materialize {project}: {source}")]
    Materialize {
        project: ProjectRoot,
        #[source]
        source: SourceError,
    },

    #[error("failed to encode {artifact}: {source}")]
    Encode {
        artifact: Artifact,
        #[source]
        source: LockstepError,
    },

    #[error("failed staging {artifact} at {path}: {source}")]
    Staging {
        artifact: Artifact,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed committing {artifact} to {path}: {source}")]
    Commit {
        artifact: Artifact,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "failed committing vendor to {path}: {source}; the previous tree could not be \
         restored ({restore}) and is left at {backup}"
    )]
    VendorRestore {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: std::io::Error,
        restore: std::io::Error,
    },

    #[error("failed reading {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write cancelled before commit; project root left untouched")]
    Cancelled,

    #[error("partial commit: {} already written, {failed} failed: {source}", join(.committed))]
    PartialCommit {
        committed: Vec<Artifact>,
        failed: Artifact,
        #[source]
        source: Box<WriterError>,
    },
}

impl WriterError {
    /// The stage this failure belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            WriterError::NoLockToVendor
            | WriterError::OldLockWithoutNewLock
            | WriterError::EmptyRoot
            | WriterError::RootNotFound { .. }
            | WriterError::RootNotDirectory { .. }
            | WriterError::MissingSourceManager
            | WriterError::Inspect { .. } => Stage::Planning,
            WriterError::InvalidProject { .. }
            | WriterError::Materialize { .. }
            | WriterError::Encode { .. }
            | WriterError::Staging { .. }
            | WriterError::Cancelled => Stage::Staging,
            WriterError::Commit { .. }
            | WriterError::VendorRestore { .. }
            | WriterError::PartialCommit { .. } => Stage::Commit,
        }
    }

    /// The artifact involved, when the failure is tied to one.
    pub fn artifact(&self) -> Option<Artifact> {
        match self {
            WriterError::NoLockToVendor | WriterError::MissingSourceManager => {
                Some(Artifact::Vendor)
            }
            WriterError::OldLockWithoutNewLock => Some(Artifact::Lock),
            WriterError::InvalidProject { .. }
            | WriterError::Materialize { .. }
            | WriterError::VendorRestore { .. } => Some(Artifact::Vendor),
            WriterError::Encode { artifact, .. }
            | WriterError::Staging { artifact, .. }
            | WriterError::Commit { artifact, .. } => Some(*artifact),
            WriterError::PartialCommit { failed, .. } => Some(*failed),
            WriterError::EmptyRoot
            | WriterError::RootNotFound { .. }
            | WriterError::RootNotDirectory { .. }
            | WriterError::Inspect { .. }
            | WriterError::Cancelled => None,
        }
    }

    /// Whether the project root is guaranteed to be exactly as before.
    pub fn root_untouched(&self) -> bool {
        !matches!(
            self,
            WriterError::PartialCommit { .. } | WriterError::VendorRestore { .. }
        )
    }
}

fn join(artifacts: &[Artifact]) -> String {
    artifacts
        .iter()
        .map(Artifact::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience constructor for [`WriterError::Staging`].
pub(crate) fn stage_err(
    artifact: Artifact,
    path: impl Into<PathBuf>,
    source: std::io::Error,
) -> WriterError {
    WriterError::Staging {
        artifact,
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`WriterError::Commit`].
pub(crate) fn commit_err(
    artifact: Artifact,
    path: impl Into<PathBuf>,
    source: std::io::Error,
) -> WriterError {
    WriterError::Commit {
        artifact,
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SourceError::Io`].
pub(crate) fn source_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SourceError {
    SourceError::Io {
        path: path.into(),
        source,
    }
}
