//! Write planning: which artifacts a write request must produce.
//!
//! | policy    | manifest       | lock                               | vendor           |
//! |-----------|----------------|------------------------------------|------------------|
//! | OnChanged | manifest given | new lock given and differs from old | lock is written  |
//! | Always    | manifest given | same                               | always           |
//! | Never     | manifest given | same                               | never            |

use std::fmt;

use lockstep_core::{layout, Lock, VendorPolicy};

use crate::error::WriterError;

/// One of the three artifacts a writer manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Artifact {
    Manifest,
    Lock,
    Vendor,
}

impl Artifact {
    /// Commit order.
    pub const ALL: [Artifact; 3] = [Artifact::Manifest, Artifact::Lock, Artifact::Vendor];

    /// Name of the artifact below the project root.
    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::Manifest => layout::MANIFEST_NAME,
            Artifact::Lock => layout::LOCK_NAME,
            Artifact::Vendor => layout::VENDOR_DIR,
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Manifest => write!(f, "manifest"),
            Artifact::Lock => write!(f, "lock"),
            Artifact::Vendor => write!(f, "vendor"),
        }
    }
}

/// Computed once per write request; never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WritePlan {
    pub manifest: bool,
    pub lock: bool,
    pub vendor: bool,
}

impl WritePlan {
    /// Validate the supplied combination and derive the plan.
    ///
    /// Fails before any I/O when vendoring is forced without a new lock, or
    /// when an old lock is supplied with nothing to diff it against.
    pub fn new(
        has_manifest: bool,
        old_lock: Option<&Lock>,
        new_lock: Option<&Lock>,
        policy: VendorPolicy,
    ) -> Result<Self, WriterError> {
        if policy == VendorPolicy::Always && new_lock.is_none() {
            return Err(WriterError::NoLockToVendor);
        }
        if old_lock.is_some() && new_lock.is_none() {
            return Err(WriterError::OldLockWithoutNewLock);
        }

        let lock = match (old_lock, new_lock) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(old), Some(new)) => !new.equivalent(old),
        };
        let vendor = match policy {
            VendorPolicy::Never => false,
            VendorPolicy::Always => true,
            VendorPolicy::OnChanged => lock,
        };

        Ok(Self {
            manifest: has_manifest,
            lock,
            vendor,
        })
    }

    pub fn includes(&self, artifact: Artifact) -> bool {
        match artifact {
            Artifact::Manifest => self.manifest,
            Artifact::Lock => self.lock,
            Artifact::Vendor => self.vendor,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.manifest || self.lock || self.vendor)
    }

    /// Planned artifacts in commit order.
    pub fn artifacts(&self) -> impl Iterator<Item = Artifact> + '_ {
        Artifact::ALL.into_iter().filter(|a| self.includes(*a))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
