//! Vendor tree verification against a lock.
//!
//! Status precedence per project:
//! 1. `InvalidRoot` (the project root cannot name a vendor directory)
//! 2. `Missing` (no `vendor/<root>` directory)
//! 3. `Unverified` (the lock carries no digest for the project)
//! 4. `DigestMismatch` (tree digest differs from the locked one)
//! 5. `Current`

use std::path::Path;

use lockstep_core::{layout, Lock, ProjectRoot};

use crate::error::WriterError;
use crate::fs_ops;

/// Verification result for one locked project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VendorStatus {
    Current,
    Missing,
    InvalidRoot,
    /// Present, but nothing to compare against; carries the computed digest.
    Unverified { actual: String },
    DigestMismatch { expected: String, actual: String },
}

impl VendorStatus {
    /// Whether this status should fail a verification run.
    pub fn is_problem(&self) -> bool {
        matches!(
            self,
            VendorStatus::Missing | VendorStatus::InvalidRoot | VendorStatus::DigestMismatch { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectStatus {
    pub name: ProjectRoot,
    pub status: VendorStatus,
}

/// Check every project in `lock` against `<root>/vendor`, in lock order.
pub fn verify_vendor(root: &Path, lock: &Lock) -> Result<Vec<ProjectStatus>, WriterError> {
    let vendor = layout::vendor_path(root);
    let mut statuses = Vec::with_capacity(lock.projects().len());

    for project in lock.projects() {
        let status = match project.name.vendor_relative_path() {
            Err(_) => VendorStatus::InvalidRoot,
            Ok(relative) => {
                let dir = vendor.join(relative);
                if !dir.is_dir() {
                    VendorStatus::Missing
                } else {
                    let actual = fs_ops::tree_digest(&dir).map_err(|source| {
                        WriterError::Inspect {
                            path: dir.clone(),
                            source,
                        }
                    })?;
                    match &project.digest {
                        None => VendorStatus::Unverified { actual },
                        Some(expected) if *expected == actual => VendorStatus::Current,
                        Some(expected) => VendorStatus::DigestMismatch {
                            expected: expected.clone(),
                            actual,
                        },
                    }
                }
            }
        };
        if status.is_problem() {
            tracing::debug!("vendor/{}: {status:?}", project.name);
        }
        statuses.push(ProjectStatus {
            name: project.name.clone(),
            status,
        });
    }
    Ok(statuses)
}
