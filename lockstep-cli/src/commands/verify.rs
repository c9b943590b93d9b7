//! `lockstep verify <root> [--json]`: check vendor/ against the project's lock.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use lockstep_core::layout;
use lockstep_writer::{verify_vendor, ProjectStatus, VendorStatus};

/// Arguments for `lockstep verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Project root to verify.
    pub root: PathBuf,

    /// Emit machine-readable JSON instead of the coloured listing.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    project: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    actual: Option<&'a str>,
}

impl VerifyArgs {
    pub fn run(self) -> Result<()> {
        let lock = layout::read_lock(&self.root)
            .with_context(|| format!("failed to read lock in '{}'", self.root.display()))?
            .with_context(|| format!("no {} in '{}'", layout::LOCK_NAME, self.root.display()))?;

        let statuses = verify_vendor(&self.root, &lock)
            .with_context(|| format!("verify failed for '{}'", self.root.display()))?;

        if self.json {
            print_json(&statuses)?;
        } else {
            print_listing(&statuses);
        }

        let problems = statuses.iter().filter(|s| s.status.is_problem()).count();
        if problems > 0 {
            bail!("{problems} of {} vendored project(s) failed verification", statuses.len());
        }
        if !self.json {
            println!("✓ vendor/ matches {}", layout::LOCK_NAME);
        }
        Ok(())
    }
}

fn print_listing(statuses: &[ProjectStatus]) {
    for entry in statuses {
        let (marker, detail) = match &entry.status {
            VendorStatus::Current => ("■".green().bold(), "current".to_string()),
            VendorStatus::Unverified { .. } => {
                ("■".blue().bold(), "present (no digest in lock)".to_string())
            }
            VendorStatus::Missing => ("■".red().bold(), "missing from vendor/".to_string()),
            VendorStatus::InvalidRoot => ("■".red().bold(), "invalid project root".to_string()),
            VendorStatus::DigestMismatch { expected, actual } => (
                "■".yellow().bold(),
                format!("digest mismatch (lock {expected}, vendor {actual})"),
            ),
        };
        println!("{marker} {}  {detail}", entry.name);
    }
}

fn print_json(statuses: &[ProjectStatus]) -> Result<()> {
    let payload: Vec<JsonEntry<'_>> = statuses
        .iter()
        .map(|entry| {
            let (status, expected, actual) = match &entry.status {
                VendorStatus::Current => ("current", None, None),
                VendorStatus::Missing => ("missing", None, None),
                VendorStatus::InvalidRoot => ("invalid-root", None, None),
                VendorStatus::Unverified { actual } => ("unverified", None, Some(actual.as_str())),
                VendorStatus::DigestMismatch { expected, actual } => (
                    "digest-mismatch",
                    Some(expected.as_str()),
                    Some(actual.as_str()),
                ),
            };
            JsonEntry {
                project: entry.name.as_str(),
                status,
                expected,
                actual,
            }
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize verify JSON")?
    );
    Ok(())
}
