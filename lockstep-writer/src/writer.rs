//! `SafeWriter`: transactional write of manifest, lock and vendor tree.
//!
//! A write runs in three stages:
//!
//! 1. **Plan**: fixed when the writer is built (see [`WritePlan`]).
//! 2. **Stage**: every planned artifact is built in a temporary directory,
//!    vendor projects in parallel, VCS metadata carried over from the live
//!    vendor tree. Any failure here leaves the project root untouched.
//! 3. **Commit**: staged artifacts are moved into the root in order.

use std::collections::BTreeMap;
use std::path::Path;

use lockstep_core::{CascadingPruneOptions, Lock, Manifest, ProjectRoot, VendorPolicy, WriterConfig};

use crate::cancel::{is_cancelled, CancellationToken};
use crate::commit::{self, ArtifactOutcome, CommitReport};
use crate::error::WriterError;
use crate::plan::{Artifact, WritePlan};
use crate::preserve;
use crate::source::SourceManager;
use crate::stage::{self, validate_root, StageRequest};

/// Everything a completed write did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub plan: WritePlan,
    pub commit: CommitReport,
    /// Digest of each vendored project's pruned tree; empty unless vendor
    /// was written.
    pub vendor_digests: BTreeMap<ProjectRoot, String>,
    /// Metadata entries carried over into the new vendor tree.
    pub preserved: Vec<String>,
}

impl WriteReport {
    fn nothing(plan: WritePlan) -> Self {
        Self {
            plan,
            commit: CommitReport {
                outcomes: Artifact::ALL
                    .into_iter()
                    .map(|a| (a, ArtifactOutcome::Skipped))
                    .collect(),
            },
            vendor_digests: BTreeMap::new(),
            preserved: Vec::new(),
        }
    }

    pub fn outcome(&self, artifact: Artifact) -> ArtifactOutcome {
        self.commit.outcome(artifact)
    }

    /// Artifacts actually replaced under the root, in commit order.
    pub fn written(&self) -> Vec<Artifact> {
        self.commit.written()
    }
}

/// Writes a manifest, lock and vendor tree to a project root so that a
/// failure before commit changes nothing.
#[derive(Debug, Clone)]
pub struct SafeWriter {
    manifest: Option<Manifest>,
    lock: Option<Lock>,
    plan: WritePlan,
    prune: CascadingPruneOptions,
    config: WriterConfig,
}

impl SafeWriter {
    /// Build a writer and fix its plan.
    ///
    /// `old_lock` is only diffed against `new_lock` and never written.
    pub fn new(
        manifest: Option<Manifest>,
        old_lock: Option<&Lock>,
        new_lock: Option<Lock>,
        policy: VendorPolicy,
        prune: CascadingPruneOptions,
    ) -> Result<Self, WriterError> {
        let plan = WritePlan::new(manifest.is_some(), old_lock, new_lock.as_ref(), policy)?;
        Ok(Self {
            manifest,
            lock: new_lock,
            plan,
            prune,
            config: WriterConfig::default(),
        })
    }

    /// Use `config` for worker count, staging location and source
    /// extensions. The vendor policy is fixed by [`SafeWriter::new`].
    pub fn with_config(mut self, config: WriterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn has_manifest(&self) -> bool {
        self.manifest.is_some()
    }

    pub fn has_lock(&self) -> bool {
        self.lock.is_some()
    }

    pub fn will_write_lock(&self) -> bool {
        self.plan.lock
    }

    pub fn will_write_vendor(&self) -> bool {
        self.plan.vendor
    }

    pub fn plan(&self) -> WritePlan {
        self.plan
    }

    /// Stage every planned artifact, then commit them into `root`.
    ///
    /// `source` is required when the vendor tree is planned. With `force`
    /// unset a byte-identical manifest or lock is left in place. A cancelled
    /// `cancel` token aborts any time before commit starts.
    pub fn write(
        &self,
        root: &Path,
        source: Option<&dyn SourceManager>,
        force: bool,
        cancel: Option<&CancellationToken>,
    ) -> Result<WriteReport, WriterError> {
        validate_root(root)?;
        if self.plan.vendor && source.is_none() {
            return Err(WriterError::MissingSourceManager);
        }
        if is_cancelled(cancel) {
            return Err(WriterError::Cancelled);
        }
        if self.plan.is_empty() {
            tracing::debug!("nothing to write under {}", root.display());
            return Ok(WriteReport::nothing(self.plan));
        }

        let classifier = self.config.classifier();
        let staging = stage::stage(&StageRequest {
            plan: self.plan,
            manifest: self.manifest.as_ref(),
            lock: self.lock.as_ref(),
            source,
            prune: &self.prune,
            classifier: &classifier,
            workers: self.config.workers(),
            staging_parent: self.config.staging_dir.as_deref(),
            cancel,
        })?;

        let preserved = match staging.artifact_path(Artifact::Vendor) {
            Some(staged_vendor) => preserve::preserve_metadata(root, staged_vendor)?,
            None => Vec::new(),
        };

        // Last point at which the root is guaranteed untouched.
        if is_cancelled(cancel) {
            return Err(WriterError::Cancelled);
        }

        let commit = commit::commit(root, &self.plan, &staging, force)?;
        tracing::info!(
            "wrote {} artifact(s) under {}",
            commit.written().len(),
            root.display()
        );

        Ok(WriteReport {
            plan: self.plan,
            commit,
            vendor_digests: staging.vendor_digests().clone(),
            preserved,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
