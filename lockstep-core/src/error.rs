//! Error types for lockstep-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from decoding, encoding and configuration.
#[derive(Debug, Error)]
pub enum LockstepError {
    /// Underlying I/O failure, with the path that was being accessed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error for a manifest or lock.
    #[error("failed to parse {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: toml::de::Error,
    },

    /// TOML serialization error for a manifest or lock.
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: toml::ser::Error,
    },

    /// YAML parse error on config load, with the file path.
    #[error("failed to parse config at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// YAML serialization error (config save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A project root that cannot be mapped below `vendor/`.
    #[error("invalid project root '{root}': must be a relative slash-separated path")]
    InvalidProjectRoot { root: String },

    /// The same project root appears twice in a lock.
    #[error("duplicate project '{root}' in lock")]
    DuplicateProject { root: String },

    /// One locked root lies inside another's vendor subtree.
    #[error("project '{inner}' is nested inside locked project '{outer}'")]
    NestedProject { outer: String, inner: String },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`LockstepError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LockstepError {
    LockstepError::Io {
        path: path.into(),
        source,
    }
}
