//! `lockstep diff <root> --lock <file>`: compare a new lock with the live one.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use lockstep_core::layout;
use lockstep_writer::LockDiff;

/// Arguments for `lockstep diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Project root holding the current lock.
    pub root: PathBuf,

    /// New lock file to compare against the root's lock.
    #[arg(long, value_name = "FILE")]
    pub lock: PathBuf,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let new = layout::read_lock_file(&self.lock)
            .with_context(|| format!("invalid lock '{}'", self.lock.display()))?
            .with_context(|| format!("lock file '{}' not found", self.lock.display()))?;
        let old = layout::read_lock(&self.root)
            .with_context(|| format!("failed to read lock in '{}'", self.root.display()))?;

        let diff = LockDiff::between(old.as_ref(), &new).context("diff failed")?;
        if diff.is_empty() {
            println!("No differences for '{}'.", self.root.display());
            return Ok(());
        }

        for name in &diff.added {
            println!("{} {name}", "+".green().bold());
        }
        for name in &diff.removed {
            println!("{} {name}", "-".red().bold());
        }
        for change in &diff.changed {
            println!("{} {}: {}", "~".yellow().bold(), change.name, change.summary());
        }
        if diff.inputs_changed {
            println!("  inputs digest changed");
        }
        println!();

        print!("{}", diff.unified_diff);
        if !diff.unified_diff.ends_with('\n') {
            println!();
        }
        Ok(())
    }
}
