//! Fixed artifact names below a project root, plus read helpers.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, LockstepError};
use crate::lock::Lock;
use crate::manifest::Manifest;

pub const MANIFEST_NAME: &str = "Lockstep.toml";
pub const LOCK_NAME: &str = "Lockstep.lock";
pub const VENDOR_DIR: &str = "vendor";

pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_NAME)
}

pub fn lock_path(root: &Path) -> PathBuf {
    root.join(LOCK_NAME)
}

pub fn vendor_path(root: &Path) -> PathBuf {
    root.join(VENDOR_DIR)
}

/// Read and decode `<root>/Lockstep.toml`; `None` when absent.
pub fn read_manifest(root: &Path) -> Result<Option<Manifest>, LockstepError> {
    read_optional(&manifest_path(root))?
        .map(|raw| Manifest::from_toml(&raw))
        .transpose()
}

/// Read and decode `<root>/Lockstep.lock`; `None` when absent.
pub fn read_lock(root: &Path) -> Result<Option<Lock>, LockstepError> {
    read_lock_file(&lock_path(root))
}

/// Read and decode a lock at an arbitrary path; `None` when absent.
pub fn read_lock_file(path: &Path) -> Result<Option<Lock>, LockstepError> {
    read_optional(path)?.map(|raw| Lock::from_toml(&raw)).transpose()
}

fn read_optional(path: &Path) -> Result<Option<String>, LockstepError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}
