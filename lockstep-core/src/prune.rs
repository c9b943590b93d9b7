//! Prune options and the predicates that apply them to vendored trees.
//!
//! Every flag is an independent filter over a path relative to the
//! project's own root. A path survives only if every enabled filter keeps
//! it, so evaluation order never matters.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::types::ProjectRoot;

/// Directory name stripped by [`PruneOptions::nested_vendor_dirs`].
pub const NESTED_VENDOR_DIR: &str = "vendor";

/// Extensions treated as source when no configuration overrides them.
pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] =
    &["go", "s", "c", "h", "cc", "cpp", "hpp", "rs", "py", "proto"];

const LEGAL_FILE_PREFIXES: &[&str] = &[
    "license",
    "licence",
    "copying",
    "unlicense",
    "copyright",
    "copyleft",
];

const LEGAL_FILE_SUBSTRINGS: &[&str] = &[
    "authors",
    "contributors",
    "legal",
    "notice",
    "disclaimer",
    "patent",
    "third-party",
    "thirdparty",
];

// ---------------------------------------------------------------------------
// Option sets
// ---------------------------------------------------------------------------

/// One independent set of prune flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PruneOptions {
    /// Drop every `vendor/` directory nested inside a dependency.
    pub nested_vendor_dirs: bool,
    /// Drop regular files whose extension is not a known source extension.
    pub non_source_files: bool,
    /// Drop test files and `testdata` trees.
    pub test_files: bool,
    /// Drop license, notice and similar legal files.
    pub legal_files: bool,
}

impl PruneOptions {
    pub const NONE: Self = Self {
        nested_vendor_dirs: false,
        non_source_files: false,
        test_files: false,
        legal_files: false,
    };

    pub const NESTED_VENDOR_DIRS: Self = Self {
        nested_vendor_dirs: true,
        ..Self::NONE
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    /// Whether a directory (relative to the project root) is dropped as a
    /// whole subtree. Only nested vendor pruning works at directory level.
    pub fn drops_dir(&self, rel_dir: &Path) -> bool {
        self.nested_vendor_dirs && has_component(rel_dir, NESTED_VENDOR_DIR)
    }

    /// Whether a file (relative to the project root) survives pruning.
    pub fn keeps(&self, rel_file: &Path, classifier: &FileClassifier) -> bool {
        if let Some(parent) = rel_file.parent() {
            if self.drops_dir(parent) {
                return false;
            }
        }
        if self.test_files && classifier.is_test(rel_file) {
            return false;
        }
        if self.legal_files && classifier.is_legal(rel_file) {
            return false;
        }
        if self.non_source_files && !classifier.is_source(rel_file) {
            return false;
        }
        true
    }
}

/// Default option set plus per-project overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadingPruneOptions {
    pub default_options: PruneOptions,
    #[serde(default)]
    pub per_project: BTreeMap<ProjectRoot, PruneOptions>,
}

impl Default for CascadingPruneOptions {
    fn default() -> Self {
        Self {
            default_options: PruneOptions::NESTED_VENDOR_DIRS,
            per_project: BTreeMap::new(),
        }
    }
}

impl CascadingPruneOptions {
    pub fn new(default_options: PruneOptions) -> Self {
        Self {
            default_options,
            per_project: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, root: impl Into<ProjectRoot>, options: PruneOptions) -> Self {
        self.per_project.insert(root.into(), options);
        self
    }

    /// Option set in force for `root`: its override, else the default.
    pub fn resolve(&self, root: &ProjectRoot) -> PruneOptions {
        self.per_project
            .get(root)
            .copied()
            .unwrap_or(self.default_options)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Decides which class a candidate file belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileClassifier {
    source_extensions: BTreeSet<String>,
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_EXTENSIONS.iter().copied())
    }
}

impl FileClassifier {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let source_extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { source_extensions }
    }

    pub fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.source_extensions.contains(&e.to_ascii_lowercase()))
    }

    pub fn is_test(&self, path: &Path) -> bool {
        if let Some(parent) = path.parent() {
            if has_component(parent, "testdata") {
                return true;
            }
        }
        path.file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| stem.ends_with("_test") || stem.starts_with("test_"))
    }

    /// Legal names only count for non-source files; `notice.go` is code.
    pub fn is_legal(&self, path: &Path) -> bool {
        if self.is_source(path) {
            return false;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let lower = name.to_ascii_lowercase();
        LEGAL_FILE_PREFIXES.iter().any(|p| lower.starts_with(p))
            || LEGAL_FILE_SUBSTRINGS.iter().any(|s| lower.contains(s))
    }
}

fn has_component(path: &Path, name: &str) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(part) if part == name))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
