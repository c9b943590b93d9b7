//! Commit: move staged artifacts into the project root.
//!
//! Order is fixed: manifest, lock, vendor. Files are replaced by a single
//! rename. The staged vendor tree is first brought next to the live one
//! (copied if staging sits on another device) while `vendor/` stays in
//! place. The live tree is then moved aside, the incoming one renamed in and
//! the old one deleted; if the rename fails the old tree is moved back.
//!
//! A failure stops later swaps. Artifacts already replaced stay replaced and
//! are reported through [`WriterError::PartialCommit`]; re-running the same
//! write plans no-ops for them and retries the rest.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lockstep_core::layout;

use crate::error::{commit_err, WriterError};
use crate::fs_ops;
use crate::plan::{Artifact, WritePlan};
use crate::stage::{validate_root, StagingArea};

/// Where a live vendor tree is parked while the staged one moves in.
pub(crate) const VENDOR_BACKUP_NAME: &str = ".vendor.lockstep-old";

/// Where the staged vendor tree waits, on the root's device, for the swap.
const VENDOR_INCOMING_NAME: &str = ".vendor.lockstep-new";

/// Per-artifact result of a write request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// Replaced with the staged content.
    Written,
    /// Planned, but the live file already held identical bytes.
    Unchanged,
    /// Not part of the plan.
    Skipped,
}

/// What a commit did, in commit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub outcomes: Vec<(Artifact, ArtifactOutcome)>,
}

impl CommitReport {
    pub fn outcome(&self, artifact: Artifact) -> ArtifactOutcome {
        self.outcomes
            .iter()
            .find(|(a, _)| *a == artifact)
            .map_or(ArtifactOutcome::Skipped, |(_, o)| *o)
    }

    pub fn written(&self) -> Vec<Artifact> {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == ArtifactOutcome::Written)
            .map(|(a, _)| *a)
            .collect()
    }
}

/// Swap every planned artifact from `staging` into `root`.
///
/// With `force` unset, a staged manifest or lock that is byte-identical to
/// the live file is left alone so its modification time is kept.
pub(crate) fn commit(
    root: &Path,
    plan: &WritePlan,
    staging: &StagingArea,
    force: bool,
) -> Result<CommitReport, WriterError> {
    validate_root(root)?;

    let mut report = CommitReport {
        outcomes: Vec::new(),
    };
    for artifact in Artifact::ALL {
        let outcome = if !plan.includes(artifact) {
            ArtifactOutcome::Skipped
        } else {
            match commit_one(root, artifact, staging, force) {
                Ok(outcome) => outcome,
                Err(err) => {
                    let committed = report.written();
                    if committed.is_empty() {
                        return Err(err);
                    }
                    tracing::warn!(
                        "commit of {artifact} failed after {} were written",
                        committed.len()
                    );
                    return Err(WriterError::PartialCommit {
                        committed,
                        failed: artifact,
                        source: Box::new(err),
                    });
                }
            }
        };
        report.outcomes.push((artifact, outcome));
    }
    Ok(report)
}

fn commit_one(
    root: &Path,
    artifact: Artifact,
    staging: &StagingArea,
    force: bool,
) -> Result<ArtifactOutcome, WriterError> {
    let live = root.join(artifact.file_name());
    let Some(staged) = staging.artifact_path(artifact) else {
        return Ok(ArtifactOutcome::Unchanged);
    };

    match artifact {
        Artifact::Manifest | Artifact::Lock => commit_file(artifact, staged, &live, force),
        Artifact::Vendor => {
            swap_vendor(root, staged)?;
            tracing::info!("wrote: {}", live.display());
            Ok(ArtifactOutcome::Written)
        }
    }
}

fn commit_file(
    artifact: Artifact,
    staged: &Path,
    live: &Path,
    force: bool,
) -> Result<ArtifactOutcome, WriterError> {
    if !force {
        let bytes = fs::read(staged).map_err(|e| commit_err(artifact, staged, e))?;
        if fs_ops::same_contents(live, &bytes).map_err(|e| commit_err(artifact, live, e))? {
            tracing::debug!("unchanged: {}", live.display());
            return Ok(ArtifactOutcome::Unchanged);
        }
    }
    fs_ops::rename_with_fallback(staged, live).map_err(|e| commit_err(artifact, live, e))?;
    tracing::info!("wrote: {}", live.display());
    Ok(ArtifactOutcome::Written)
}

/// Replace `<root>/vendor` with the fully built `staged` tree.
fn swap_vendor(root: &Path, staged: &Path) -> Result<(), WriterError> {
    let incoming = bring_in(root, staged)?;
    let result = replace_live(root, &incoming);
    if result.is_err() && fs::symlink_metadata(&incoming).is_ok() {
        let _ = fs_ops::remove_path(&incoming);
    }
    result
}

/// Move the staged tree next to the live one. The live tree is untouched.
fn bring_in(root: &Path, staged: &Path) -> Result<PathBuf, WriterError> {
    let incoming = root.join(VENDOR_INCOMING_NAME);
    clear_leftover(&incoming)?;
    if let Err(err) = fs_ops::rename_with_fallback(staged, &incoming) {
        if fs::symlink_metadata(&incoming).is_ok() {
            let _ = fs_ops::remove_path(&incoming);
        }
        return Err(commit_err(Artifact::Vendor, &incoming, err));
    }
    Ok(incoming)
}

/// Swap `incoming` in for `<root>/vendor` with same-device renames.
fn replace_live(root: &Path, incoming: &Path) -> Result<(), WriterError> {
    let live = layout::vendor_path(root);
    let backup = root.join(VENDOR_BACKUP_NAME);

    // Metadata in a leftover backup was already carried into `incoming`.
    clear_leftover(&backup)?;

    let had_live = fs::symlink_metadata(&live).is_ok();
    if had_live {
        fs::rename(&live, &backup).map_err(|e| commit_err(Artifact::Vendor, &live, e))?;
    }

    if let Err(err) = fs::rename(incoming, &live) {
        if had_live {
            if let Err(restore) = restore_backup(&backup, &live) {
                tracing::warn!(
                    "previous vendor tree left at {} (restore failed: {restore})",
                    backup.display()
                );
                return Err(WriterError::VendorRestore {
                    path: live,
                    backup,
                    source: err,
                    restore,
                });
            }
        }
        return Err(commit_err(Artifact::Vendor, &live, err));
    }

    if had_live {
        if let Err(err) = fs_ops::remove_path(&backup) {
            tracing::warn!(
                "new vendor tree is in place but {} could not be removed: {err}",
                backup.display()
            );
        }
    }
    Ok(())
}

/// Remove an entry left behind by an interrupted run.
fn clear_leftover(path: &Path) -> Result<(), WriterError> {
    if fs::symlink_metadata(path).is_ok() {
        tracing::debug!("removing leftover {}", path.display());
        fs_ops::remove_path(path).map_err(|e| commit_err(Artifact::Vendor, path, e))?;
    }
    Ok(())
}

fn restore_backup(backup: &Path, live: &Path) -> io::Result<()> {
    if fs::symlink_metadata(live).is_ok() {
        fs_ops::remove_path(live)?;
    }
    fs::rename(backup, live)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
