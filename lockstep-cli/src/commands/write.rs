//! `lockstep write <root>`: stage and commit manifest, lock and vendor tree.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use lockstep_core::{layout, Lock, Manifest};
use lockstep_writer::{
    Artifact, ArtifactOutcome, LocalSourceManager, SafeWriter, SourceManager, WritePlan,
    WriteReport,
};

use crate::interrupt::cancel_on_interrupt;
use crate::{load_config, VendorPolicyArg};

/// Arguments for `lockstep write`.
#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Project root to write into.
    pub root: PathBuf,

    /// Manifest file to write as the project's manifest.
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// New lock file. The lock already in the root is treated as the old one.
    #[arg(long, value_name = "FILE")]
    pub lock: Option<PathBuf>,

    /// Source cache laid out as <cache>/<project-root>/<revision>/.
    #[arg(long, value_name = "DIR")]
    pub cache: Option<PathBuf>,

    /// When to regenerate vendor/: on-changed | always | never.
    /// Defaults to `vendor-policy` from the config file.
    #[arg(long = "vendor", value_name = "POLICY")]
    pub vendor: Option<VendorPolicyArg>,

    /// Replace manifest and lock even when their contents are unchanged.
    #[arg(long)]
    pub force: bool,

    /// Show what would be written without touching the project root.
    #[arg(long)]
    pub dry_run: bool,
}

impl WriteArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let policy = self.vendor.map_or(config.vendor_policy, |p| p.0);

        let manifest = self
            .manifest
            .as_deref()
            .map(read_manifest_file)
            .transpose()?;
        let new_lock = self.lock.as_deref().map(read_lock_file).transpose()?;
        let old_lock = if new_lock.is_some() {
            layout::read_lock(&self.root)
                .with_context(|| format!("failed to read lock in '{}'", self.root.display()))?
        } else {
            None
        };

        // Prune rules come from the manifest being written, else the live one.
        let prune = match &manifest {
            Some(m) => m.prune_options(),
            None => layout::read_manifest(&self.root)
                .with_context(|| format!("failed to read manifest in '{}'", self.root.display()))?
                .map(|m| m.prune_options())
                .unwrap_or_default(),
        };

        let writer = SafeWriter::new(manifest, old_lock.as_ref(), new_lock, policy, prune)
            .context("invalid write request")?
            .with_config(config);

        if self.dry_run {
            print_plan(&self.root, writer.plan());
            return Ok(());
        }

        let source = self.cache.as_ref().map(LocalSourceManager::new);
        if writer.will_write_vendor() && source.is_none() {
            bail!("writing vendor/ needs a source cache; pass --cache <dir>");
        }

        let cancel = cancel_on_interrupt()?;
        let report = writer
            .write(
                &self.root,
                source.as_ref().map(|s| s as &dyn SourceManager),
                self.force,
                Some(&cancel),
            )
            .with_context(|| format!("write failed for '{}'", self.root.display()))?;
        print_report(&self.root, &report);
        Ok(())
    }
}

fn read_manifest_file(path: &Path) -> Result<Manifest> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read manifest '{}'", path.display()))?;
    Manifest::from_toml(&text).with_context(|| format!("invalid manifest '{}'", path.display()))
}

fn read_lock_file(path: &Path) -> Result<Lock> {
    layout::read_lock_file(path)
        .with_context(|| format!("invalid lock '{}'", path.display()))?
        .with_context(|| format!("lock file '{}' not found", path.display()))
}

fn print_plan(root: &Path, plan: WritePlan) {
    if plan.is_empty() {
        println!("[dry-run] '{}': nothing to do", root.display());
        return;
    }
    println!("[dry-run] '{}' would write:", root.display());
    for artifact in plan.artifacts() {
        println!("  ~  {}", artifact.file_name());
    }
}

fn print_report(root: &Path, report: &WriteReport) {
    let written = report.written();
    if report.plan.is_empty() {
        println!("{} '{}': nothing to do", "✓".green(), root.display());
        return;
    }

    println!(
        "{} '{}' written ({} artifact(s) replaced)",
        "✓".green().bold(),
        root.display(),
        written.len()
    );
    for artifact in Artifact::ALL {
        let name = artifact.file_name();
        match report.outcome(artifact) {
            ArtifactOutcome::Written => println!("  ✎  {name}"),
            ArtifactOutcome::Unchanged => println!("  ·  {name} (unchanged)"),
            ArtifactOutcome::Skipped => {}
        }
    }
    if report.outcome(Artifact::Vendor) == ArtifactOutcome::Written {
        println!("     {} project(s) vendored", report.vendor_digests.len());
    }
    for name in &report.preserved {
        println!("     kept vendor/{name}");
    }
}
