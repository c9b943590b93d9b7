//! `lockstep config [--init]`: show or initialise the writer config.

use anyhow::{Context, Result};
use clap::Args;

use lockstep_core::{config, WriterConfig};

use super::super::home_dir;

/// Arguments for `lockstep config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write the defaults to ~/.lockstep/config.yaml if it does not exist yet.
    #[arg(long)]
    pub init: bool,
}

impl ConfigArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let path = config::config_path_at(&home);

        if self.init {
            if path.exists() {
                println!("Config already exists at {}", path.display());
            } else {
                config::save_at(&home, &WriterConfig::default())
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("✓ Wrote defaults to {}", path.display());
            }
        }

        let effective = config::load_at(&home)
            .with_context(|| format!("failed to load {}", path.display()))?;
        let yaml = serde_yaml::to_string(&effective).context("failed to encode config")?;
        println!("# {}", path.display());
        print!("{yaml}");
        Ok(())
    }
}
