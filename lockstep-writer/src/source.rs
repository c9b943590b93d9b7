//! Source manager seam: how the writer obtains each locked project's files.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use lockstep_core::{ProjectRoot, Revision};

use crate::error::{source_io_err, SourceError};
use crate::fs_ops;
use crate::preserve::VCS_METADATA_NAMES;

/// A materialized project: files listed relative to `base`.
#[derive(Debug, Clone)]
pub struct FileTree {
    base: PathBuf,
    files: Vec<PathBuf>,
    // Keeps an exported temporary tree alive for as long as it is listed.
    _owned: Option<Arc<TempDir>>,
}

impl FileTree {
    /// List an explicit set of files under `base`.
    ///
    /// Every path must be relative and free of `.`/`..` segments.
    pub fn new(base: impl Into<PathBuf>, mut files: Vec<PathBuf>) -> Result<Self, SourceError> {
        for file in &files {
            let relative = file
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
            if !relative || file.as_os_str().is_empty() {
                return Err(SourceError::InvalidPath { path: file.clone() });
            }
        }
        files.sort();
        files.dedup();
        Ok(Self {
            base: base.into(),
            files,
            _owned: None,
        })
    }

    /// Walk `base`, listing every regular file except VCS metadata.
    pub fn scan(base: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let base = base.into();
        let files = fs_ops::collect_relative_files(&base, is_vcs_dir)
            .map_err(|e| source_io_err(&base, e))?;
        Ok(Self {
            base,
            files,
            _owned: None,
        })
    }

    /// Scan a temporary export, keeping it alive alongside the listing.
    pub fn from_tempdir(dir: TempDir) -> Result<Self, SourceError> {
        let mut tree = Self::scan(dir.path())?;
        tree._owned = Some(Arc::new(dir));
        Ok(tree)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

fn is_vcs_dir(relative: &Path) -> bool {
    relative
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| VCS_METADATA_NAMES.contains(&n))
}

/// Provides the source tree of a project at a locked revision.
///
/// Implementations are called from several worker threads at once.
pub trait SourceManager: Send + Sync {
    fn materialize(&self, project: &ProjectRoot, revision: &Revision)
        -> Result<FileTree, SourceError>;
}

// ---------------------------------------------------------------------------
// LocalSourceManager
// ---------------------------------------------------------------------------

/// Serves trees from a local cache laid out as
/// `<cache>/<project-root>/<revision>/`.
#[derive(Debug, Clone)]
pub struct LocalSourceManager {
    cache: PathBuf,
}

impl LocalSourceManager {
    pub fn new(cache: impl Into<PathBuf>) -> Self {
        Self {
            cache: cache.into(),
        }
    }

    pub fn cache(&self) -> &Path {
        &self.cache
    }

    /// `<cache>/<project-root>/<revision>` (pure, no I/O).
    pub fn tree_path(&self, project: &ProjectRoot, revision: &Revision) -> Result<PathBuf, SourceError> {
        let relative = project
            .vendor_relative_path()
            .map_err(|e| SourceError::Other(e.to_string()))?;
        let mut rev = Path::new(revision.as_str()).components();
        match (rev.next(), rev.next()) {
            (Some(Component::Normal(segment)), None) => Ok(self.cache.join(relative).join(segment)),
            _ => Err(SourceError::InvalidPath {
                path: PathBuf::from(revision.as_str()),
            }),
        }
    }
}

impl SourceManager for LocalSourceManager {
    fn materialize(
        &self,
        project: &ProjectRoot,
        revision: &Revision,
    ) -> Result<FileTree, SourceError> {
        let path = self.tree_path(project, revision)?;
        if !path.is_dir() {
            return Err(SourceError::NotFound {
                project: project.clone(),
                revision: revision.clone(),
                path,
            });
        }
        tracing::debug!("materializing {project}@{revision} from {}", path.display());
        FileTree::scan(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
