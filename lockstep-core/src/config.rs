//! User configuration for the project writer.
//!
//! # Storage layout
//!
//! ```text
//! ~/.lockstep/
//!   config.yaml   (optional; defaults apply when absent)
//! ```
//!
//! # API pattern
//!
//! - `load_at(home)` / `save_at(home, …)`: explicit home; used in tests
//! - `load()`: derives home from `dirs::home_dir()`, delegates to `load_at`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, LockstepError};
use crate::prune::{FileClassifier, DEFAULT_SOURCE_EXTENSIONS};

/// Upper bound on default vendor materialization workers.
pub const MAX_DEFAULT_CONCURRENCY: usize = 8;

/// When the vendor tree is (re)written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VendorPolicy {
    /// Only when the lock is going to be written.
    #[default]
    OnChanged,
    /// Every time; requires a new lock.
    Always,
    /// Never.
    Never,
}

/// Writer settings read from `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WriterConfig {
    /// Maximum number of projects materialized at once.
    pub concurrency: usize,
    /// Where staging areas are created; the system temp dir when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,
    /// File extensions kept by non-source pruning.
    pub source_extensions: Vec<String>,
    /// Vendor policy used when the caller does not pick one.
    pub vendor_policy: VendorPolicy,
}

impl Default for WriterConfig {
    fn default() -> Self {
        let concurrency = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_DEFAULT_CONCURRENCY);
        Self {
            concurrency,
            staging_dir: None,
            source_extensions: DEFAULT_SOURCE_EXTENSIONS
                .iter()
                .map(|e| (*e).to_string())
                .collect(),
            vendor_policy: VendorPolicy::OnChanged,
        }
    }
}

impl WriterConfig {
    pub fn classifier(&self) -> FileClassifier {
        FileClassifier::new(&self.source_extensions)
    }

    /// Concurrency clamped to at least one worker.
    pub fn workers(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// `<home>/.lockstep/config.yaml` (pure, no I/O).
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".lockstep").join("config.yaml")
}

/// Load the config, falling back to defaults when the file is absent.
pub fn load_at(home: &Path) -> Result<WriterConfig, LockstepError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(WriterConfig::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(WriterConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| LockstepError::Config { path, source })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<WriterConfig, LockstepError> {
    load_at(&home()?)
}

/// Atomically save the config: serialize → `.yaml.tmp` sibling → `rename`.
pub fn save_at(home: &Path, config: &WriterConfig) -> Result<(), LockstepError> {
    let path = config_path_at(home);
    let Some(dir) = path.parent() else {
        return Err(io_err(&path, std::io::Error::other("invalid config path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let yaml = serde_yaml::to_string(config)?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

fn home() -> Result<PathBuf, LockstepError> {
    dirs::home_dir().ok_or(LockstepError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
