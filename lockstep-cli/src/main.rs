//! Lockstep: transactional writer for manifest, lock and vendor tree.
//!
//! # Usage
//!
//! ```text
//! lockstep write <root> [--manifest <file>] [--lock <file>] [--cache <dir>]
//!                [--vendor on-changed|always|never] [--force] [--dry-run]
//! lockstep diff <root> --lock <file>
//! lockstep verify <root> [--json]
//! lockstep config [--init]
//! ```
//!
//! Log verbosity is read from `LOCKSTEP_LOG` (default `warn`).

mod commands;
mod interrupt;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{config::ConfigArgs, diff::DiffArgs, verify::VerifyArgs, write::WriteArgs};
use lockstep_core::{config, VendorPolicy, WriterConfig};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "lockstep",
    version,
    about = "Write a project's manifest, lock and vendor tree as one transaction",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stage and commit manifest, lock and vendor tree into a project root.
    Write(WriteArgs),

    /// Show how a new lock differs from the one in a project root.
    Diff(DiffArgs),

    /// Check the vendor tree against the project's lock.
    Verify(VerifyArgs),

    /// Show or initialise `~/.lockstep/config.yaml`.
    Config(ConfigArgs),
}

// ---------------------------------------------------------------------------
// Shared VendorPolicy argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `VendorPolicy` from CLI args.
#[derive(Debug, Clone, Copy)]
pub struct VendorPolicyArg(pub VendorPolicy);

impl FromStr for VendorPolicyArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on-changed" | "onchanged" => Ok(Self(VendorPolicy::OnChanged)),
            "always" => Ok(Self(VendorPolicy::Always)),
            "never" => Ok(Self(VendorPolicy::Never)),
            other => Err(format!(
                "unknown vendor policy '{other}'; expected: on-changed, always, never"
            )),
        }
    }
}

impl fmt::Display for VendorPolicyArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            VendorPolicy::OnChanged => write!(f, "on-changed"),
            VendorPolicy::Always => write!(f, "always"),
            VendorPolicy::Never => write!(f, "never"),
        }
    }
}

/// Home directory used for `~/.lockstep/config.yaml`.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// Writer settings from the user's config file, or defaults.
pub fn load_config() -> Result<WriterConfig> {
    let home = home_dir()?;
    config::load_at(&home).context("failed to load ~/.lockstep/config.yaml")
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env("LOCKSTEP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Write(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Verify(args) => args.run(),
        Commands::Config(args) => args.run(),
    }
}
