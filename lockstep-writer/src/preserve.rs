//! Carry version-control metadata across a vendor regeneration.
//!
//! A vendor tree may itself be a checkout (or submodule) with its own
//! `.git` entry. The entry is not derived from the lock, so it is copied
//! verbatim from the live vendor tree into the staged one before the swap.
//! If a previous swap was interrupted after the live tree was moved aside,
//! the parked tree is the source instead.

use std::path::{Path, PathBuf};

use lockstep_core::layout;

use crate::commit::VENDOR_BACKUP_NAME;
use crate::error::{stage_err, WriterError};
use crate::fs_ops;
use crate::plan::Artifact;

/// Entry names treated as opaque VCS metadata at the vendor root.
pub const VCS_METADATA_NAMES: &[&str] = &[".git", ".hg", ".svn", ".bzr"];

/// Metadata entries (file or directory) present directly under `dir`.
pub fn find_vcs_metadata(dir: &Path) -> Vec<PathBuf> {
    VCS_METADATA_NAMES
        .iter()
        .map(|name| dir.join(name))
        .filter(|path| std::fs::symlink_metadata(path).is_ok())
        .collect()
}

/// Whether `dir` directly contains a `.git` file or directory.
pub fn has_dot_git(dir: &Path) -> bool {
    std::fs::symlink_metadata(dir.join(".git")).is_ok()
}

/// Copy metadata entries from `<root>/vendor` into `staged_vendor`.
///
/// Without a live vendor tree, a tree parked by an interrupted swap is
/// used. Returns the names of the preserved entries; empty when neither
/// exists or carries metadata.
pub(crate) fn preserve_metadata(
    root: &Path,
    staged_vendor: &Path,
) -> Result<Vec<String>, WriterError> {
    let Some(from) = metadata_source(root) else {
        return Ok(Vec::new());
    };

    let mut preserved = Vec::new();
    for entry in find_vcs_metadata(&from) {
        let Some(name) = entry.file_name() else {
            continue;
        };
        let target = staged_vendor.join(name);
        if std::fs::symlink_metadata(&target).is_ok() {
            fs_ops::remove_path(&target).map_err(|e| stage_err(Artifact::Vendor, &target, e))?;
        }
        fs_ops::copy_path(&entry, &target).map_err(|e| stage_err(Artifact::Vendor, &entry, e))?;

        let name = name.to_string_lossy().into_owned();
        tracing::debug!("preserved vendor/{name}");
        preserved.push(name);
    }
    Ok(preserved)
}

fn metadata_source(root: &Path) -> Option<PathBuf> {
    let live_vendor = layout::vendor_path(root);
    if live_vendor.is_dir() {
        return Some(live_vendor);
    }
    let parked = root.join(VENDOR_BACKUP_NAME);
    if parked.is_dir() {
        tracing::info!(
            "no vendor/ under {}; taking metadata from interrupted swap at {}",
            root.display(),
            parked.display()
        );
        return Some(parked);
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
