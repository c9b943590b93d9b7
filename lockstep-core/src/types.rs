//! Domain newtypes shared by the manifest, lock and writer.
//!
//! Project roots are slash-separated import paths (`github.com/foo/bar`);
//! they double as the relative location of a project inside `vendor/`.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LockstepError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identity of a dependency root, e.g. `github.com/sdboyer/deptest`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectRoot(pub String);

impl ProjectRoot {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative filesystem path of this project below `vendor/`.
    ///
    /// Rejects empty roots, absolute paths and any `.`/`..` segment so a
    /// lock entry can never address anything outside the vendor tree.
    pub fn vendor_relative_path(&self) -> Result<PathBuf, LockstepError> {
        let invalid = || LockstepError::InvalidProjectRoot {
            root: self.0.clone(),
        };
        if self.0.trim().is_empty() {
            return Err(invalid());
        }
        let mut path = PathBuf::new();
        for segment in self.0.split('/') {
            if segment.is_empty() {
                return Err(invalid());
            }
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => path.push(part),
                _ => return Err(invalid()),
            }
        }
        Ok(path)
    }
}

impl fmt::Display for ProjectRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectRoot {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectRoot {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// An immutable revision identifier (commit hash, tag object, etc.).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision(pub String);

impl Revision {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Revision {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Revision {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(ProjectRoot::from("github.com/a/b").to_string(), "github.com/a/b");
        assert_eq!(Revision::from("abc123").to_string(), "abc123");
    }

    #[test]
    fn vendor_path_splits_on_slashes() {
        let root = ProjectRoot::from("github.com/sdboyer/deptest");
        let path = root.vendor_relative_path().unwrap();
        assert_eq!(path, Path::new("github.com").join("sdboyer").join("deptest"));
    }

    #[test]
    fn vendor_path_rejects_escapes() {
        for bad in ["", "../evil", "github.com/../../x", "/abs/path", "a//b", "a/./b"] {
            let err = ProjectRoot::from(bad).vendor_relative_path().unwrap_err();
            assert!(
                matches!(err, LockstepError::InvalidProjectRoot { .. }),
                "expected rejection for {bad:?}"
            );
        }
    }

    #[test]
    fn roots_order_lexically() {
        let mut roots = vec![ProjectRoot::from("b.org/x"), ProjectRoot::from("a.org/y")];
        roots.sort();
        assert_eq!(roots[0].as_str(), "a.org/y");
    }
}
