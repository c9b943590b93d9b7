//! Staging: build every planned artifact in a private temporary directory.
//!
//! Nothing under the project root is touched here. The staging directory is
//! a [`TempDir`], so dropping a [`StagingArea`] (on success, failure or
//! cancellation) removes whatever was built.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tempfile::TempDir;

use lockstep_core::{
    layout, CascadingPruneOptions, FileClassifier, Lock, LockedProject, Manifest, ProjectRoot,
    PruneOptions,
};

use crate::cancel::{is_cancelled, CancellationToken};
use crate::error::{stage_err, WriterError};
use crate::fs_ops;
use crate::plan::{Artifact, WritePlan};
use crate::source::SourceManager;

const STAGING_PREFIX: &str = "lockstep-stage-";

/// Fully built artifacts waiting to be committed.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
    manifest: Option<PathBuf>,
    lock: Option<PathBuf>,
    vendor: Option<PathBuf>,
    vendor_digests: BTreeMap<ProjectRoot, String>,
}

impl StagingArea {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Staged location of `artifact`, if it was planned.
    pub fn artifact_path(&self, artifact: Artifact) -> Option<&Path> {
        match artifact {
            Artifact::Manifest => self.manifest.as_deref(),
            Artifact::Lock => self.lock.as_deref(),
            Artifact::Vendor => self.vendor.as_deref(),
        }
    }

    /// Digest of each staged project's pruned tree.
    pub fn vendor_digests(&self) -> &BTreeMap<ProjectRoot, String> {
        &self.vendor_digests
    }
}

/// Everything staging needs, borrowed from the writer.
pub(crate) struct StageRequest<'a> {
    pub plan: WritePlan,
    pub manifest: Option<&'a Manifest>,
    pub lock: Option<&'a Lock>,
    pub source: Option<&'a dyn SourceManager>,
    pub prune: &'a CascadingPruneOptions,
    pub classifier: &'a FileClassifier,
    pub workers: usize,
    pub staging_parent: Option<&'a Path>,
    pub cancel: Option<&'a CancellationToken>,
}

/// Check that `root` names an existing directory.
pub(crate) fn validate_root(root: &Path) -> Result<(), WriterError> {
    if root.as_os_str().is_empty() {
        return Err(WriterError::EmptyRoot);
    }
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(WriterError::RootNotDirectory {
            path: root.to_path_buf(),
        }),
        Err(_) => Err(WriterError::RootNotFound {
            path: root.to_path_buf(),
        }),
    }
}

/// Build the staging area for `req.plan`.
pub(crate) fn stage(req: &StageRequest<'_>) -> Result<StagingArea, WriterError> {
    let dir = create_staging_dir(req.staging_parent)?;
    let mut area = StagingArea {
        dir,
        manifest: None,
        lock: None,
        vendor: None,
        vendor_digests: BTreeMap::new(),
    };

    if req.plan.manifest {
        if let Some(manifest) = req.manifest {
            let text = manifest.to_toml().map_err(|source| WriterError::Encode {
                artifact: Artifact::Manifest,
                source,
            })?;
            area.manifest = Some(write_staged_file(area.path(), Artifact::Manifest, &text)?);
        }
    }

    if req.plan.lock {
        if let Some(lock) = req.lock {
            let text = lock.to_toml().map_err(|source| WriterError::Encode {
                artifact: Artifact::Lock,
                source,
            })?;
            area.lock = Some(write_staged_file(area.path(), Artifact::Lock, &text)?);
        }
    }

    if req.plan.vendor {
        let (Some(lock), Some(source)) = (req.lock, req.source) else {
            return Err(WriterError::MissingSourceManager);
        };
        let vendor = area.path().join(layout::VENDOR_DIR);
        area.vendor_digests = stage_vendor(&vendor, lock, source, req)?;
        area.vendor = Some(vendor);
    }

    Ok(area)
}

fn create_staging_dir(parent: Option<&Path>) -> Result<TempDir, WriterError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(STAGING_PREFIX);
    let result = match parent {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(|e| stage_err(Artifact::Vendor, parent, e))?;
            builder.tempdir_in(parent)
        }
        None => builder.tempdir(),
    };
    result.map_err(|e| {
        let at = parent.map_or_else(std::env::temp_dir, Path::to_path_buf);
        stage_err(Artifact::Vendor, at, e)
    })
}

fn write_staged_file(dir: &Path, artifact: Artifact, text: &str) -> Result<PathBuf, WriterError> {
    let path = dir.join(artifact.file_name());
    fs::write(&path, text).map_err(|e| stage_err(artifact, &path, e))?;
    Ok(path)
}

/// Materialize every locked project into `vendor` on a bounded pool.
///
/// The first failure stops new projects from starting; projects already
/// in flight finish or observe the cancellation flag between files.
fn stage_vendor(
    vendor: &Path,
    lock: &Lock,
    source: &dyn SourceManager,
    req: &StageRequest<'_>,
) -> Result<BTreeMap<ProjectRoot, String>, WriterError> {
    fs::create_dir_all(vendor).map_err(|e| stage_err(Artifact::Vendor, vendor, e))?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(req.workers.max(1))
        .thread_name(|i| format!("lockstep-vendor-{i}"))
        .build()
        .map_err(|e| stage_err(Artifact::Vendor, vendor, std::io::Error::other(e)))?;

    let digests: Vec<(ProjectRoot, String)> = pool.install(|| {
        lock.projects()
            .par_iter()
            .map(|project| {
                if is_cancelled(req.cancel) {
                    return Err(WriterError::Cancelled);
                }
                let options = req.prune.resolve(&project.name);
                let digest = stage_project(vendor, project, source, options, req)?;
                Ok((project.name.clone(), digest))
            })
            .collect::<Result<Vec<_>, WriterError>>()
    })?;

    tracing::debug!("staged {} vendored project(s)", digests.len());
    Ok(digests.into_iter().collect())
}

fn stage_project(
    vendor: &Path,
    project: &LockedProject,
    source: &dyn SourceManager,
    options: PruneOptions,
    req: &StageRequest<'_>,
) -> Result<String, WriterError> {
    let relative =
        project
            .name
            .vendor_relative_path()
            .map_err(|source| WriterError::InvalidProject {
                project: project.name.clone(),
                source,
            })?;
    let tree = source
        .materialize(&project.name, &project.revision)
        .map_err(|source| WriterError::Materialize {
            project: project.name.clone(),
            source,
        })?;

    let dest = vendor.join(relative);
    fs::create_dir_all(&dest).map_err(|e| stage_err(Artifact::Vendor, &dest, e))?;

    let mut kept = 0usize;
    for file in tree.files() {
        if is_cancelled(req.cancel) {
            return Err(WriterError::Cancelled);
        }
        if !options.keeps(file, req.classifier) {
            continue;
        }
        let to = dest.join(file);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| stage_err(Artifact::Vendor, parent, e))?;
        }
        fs::copy(tree.base().join(file), &to).map_err(|e| stage_err(Artifact::Vendor, &to, e))?;
        kept += 1;
    }

    let digest = fs_ops::tree_digest(&dest).map_err(|e| stage_err(Artifact::Vendor, &dest, e))?;
    tracing::debug!(
        "staged {}@{}: {kept} of {} file(s) kept",
        project.name,
        project.revision,
        tree.files().len()
    );
    Ok(digest)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
