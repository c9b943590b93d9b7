//! Filesystem helpers: recursive copy, rename with a cross-device
//! fallback, and tree digests.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Suffix used for same-directory temporaries during a fallback rename.
const FALLBACK_SUFFIX: &str = ".lockstep.tmp";

/// Copy a file, directory or symlink at `from` to `to`.
pub(crate) fn copy_path(from: &Path, to: &Path) -> io::Result<()> {
    let file_type = fs::symlink_metadata(from)?.file_type();
    if file_type.is_dir() {
        copy_dir_recursive(from, to)
    } else if file_type.is_symlink() {
        copy_symlink(from, to)
    } else {
        fs::copy(from, to).map(|_| ())
    }
}

/// Copy the directory tree at `source_root` into `destination_root`,
/// replacing whatever is there. Symlinks are recreated, not followed.
pub(crate) fn copy_dir_recursive(source_root: &Path, destination_root: &Path) -> io::Result<()> {
    if fs::symlink_metadata(destination_root).is_ok() {
        remove_path(destination_root)?;
    }
    fs::create_dir_all(destination_root)?;

    let mut queue: VecDeque<(PathBuf, PathBuf)> = VecDeque::new();
    queue.push_back((source_root.to_path_buf(), destination_root.to_path_buf()));

    while let Some((from_dir, to_dir)) = queue.pop_front() {
        for entry in fs::read_dir(&from_dir)? {
            let entry = entry?;
            let from_path = entry.path();
            let to_path = to_dir.join(entry.file_name());
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                fs::create_dir_all(&to_path)?;
                queue.push_back((from_path, to_path));
            } else if file_type.is_symlink() {
                copy_symlink(&from_path, &to_path)?;
            } else {
                fs::copy(&from_path, &to_path)?;
            }
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    let target = fs::read_link(from)?;
    std::os::unix::fs::symlink(target, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to).map(|_| ())
}

/// Remove a file, symlink or directory tree.
pub(crate) fn remove_path(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Rename `from` onto `to`, falling back to copy-then-rename when the two
/// live on different filesystems.
///
/// The fallback copies into a same-directory temporary first, so `to` is
/// still replaced by a single rename and never observed half written. Once
/// `to` is replaced the call succeeds even if `from` cannot be removed.
pub(crate) fn rename_with_fallback(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device(&err) => {
            tracing::debug!(
                "cross-device rename {} -> {}, copying",
                from.display(),
                to.display()
            );
            let tmp = sibling_tmp(to);
            if let Err(copy_err) = copy_path(from, &tmp) {
                let _ = remove_path(&tmp);
                return Err(copy_err);
            }
            if let Err(rename_err) = fs::rename(&tmp, to) {
                let _ = remove_path(&tmp);
                return Err(rename_err);
            }
            // `to` is already replaced; a leftover source is not a failure.
            if let Err(err) = remove_path(from) {
                tracing::warn!("moved {} but could not remove it: {err}", from.display());
            }
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn sibling_tmp(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}{FALLBACK_SUFFIX}"))
}

#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    // EXDEV on Linux and macOS.
    err.raw_os_error() == Some(18)
}

#[cfg(windows)]
fn is_cross_device(err: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    err.raw_os_error() == Some(17)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_err: &io::Error) -> bool {
    false
}

/// Whether `path` holds exactly `bytes`. Missing files compare unequal.
pub(crate) fn same_contents(path: &Path, bytes: &[u8]) -> io::Result<bool> {
    match fs::read(path) {
        Ok(existing) => Ok(existing == bytes),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// All regular files below `root`, as sorted relative paths.
///
/// Directories for which `skip_dir` returns true are not descended into.
pub(crate) fn collect_relative_files(
    root: &Path,
    skip_dir: impl Fn(&Path) -> bool,
) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    queue.push_back(root.to_path_buf());

    while let Some(dir) = queue.pop_front() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            let relative = path
                .strip_prefix(root)
                .map_err(|e| io::Error::other(e.to_string()))?
                .to_path_buf();
            if file_type.is_dir() {
                if !skip_dir(&relative) {
                    queue.push_back(path);
                }
            } else if file_type.is_file() {
                paths.push(relative);
            }
        }
    }

    paths.sort();
    Ok(paths)
}

/// SHA-256 over every file below `root`: normalized relative path and file
/// digest, in sorted path order. Stable across machines and copies.
pub(crate) fn tree_digest(root: &Path) -> io::Result<String> {
    let files = collect_relative_files(root, |_| false)?;

    let mut h = Sha256::new();
    for relative in files {
        let bytes = fs::read(root.join(&relative))?;
        h.update(normalize_path(&relative).as_bytes());
        h.update([0]);
        h.update(hex::encode(Sha256::digest(&bytes)).as_bytes());
        h.update([0]);
    }
    Ok(hex::encode(h.finalize()))
}

fn normalize_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
