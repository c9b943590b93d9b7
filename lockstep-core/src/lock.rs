//! The lock: a resolved, pinned solution encoded as TOML.
//!
//! Projects are kept sorted by root so the encoding is canonical. The
//! `[solve-meta]` table is volatile and never participates in
//! [`Lock::equivalent`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LockstepError;
use crate::manifest::Manifest;
use crate::types::{ProjectRoot, Revision};

/// A single `[[projects]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedProject {
    pub name: ProjectRoot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub revision: Revision,
    #[serde(default)]
    pub packages: Vec<String>,
    /// Digest of the pruned vendor tree, when the solver recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl LockedProject {
    pub fn new(name: impl Into<ProjectRoot>, revision: impl Into<Revision>) -> Self {
        Self {
            name: name.into(),
            source: None,
            version: None,
            branch: None,
            revision: revision.into(),
            packages: vec![".".to_string()],
            digest: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Volatile solve metadata, excluded from equivalence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SolveMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
}

impl SolveMeta {
    pub fn now() -> Self {
        Self {
            generated_at: Some(Utc::now()),
            tool_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }
    }
}

/// Resolved dependency solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Lock {
    inputs_digest: String,
    #[serde(default)]
    projects: Vec<LockedProject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    solve_meta: Option<SolveMeta>,
}

impl Lock {
    /// Build a lock, sorting projects by root.
    ///
    /// Duplicate roots are rejected, and so is a root nested below another
    /// (`a.org/x` and `a.org/x/y`): each project owns its whole vendor subtree.
    pub fn new(
        inputs_digest: impl Into<String>,
        mut projects: Vec<LockedProject>,
    ) -> Result<Self, LockstepError> {
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        let mut seen = BTreeSet::new();
        for p in &projects {
            if !seen.insert(p.name.as_str()) {
                return Err(LockstepError::DuplicateProject {
                    root: p.name.0.clone(),
                });
            }
        }
        for p in &projects {
            let name = p.name.as_str();
            let outer = name
                .match_indices('/')
                .map(|(i, _)| &name[..i])
                .find(|prefix| seen.contains(prefix));
            if let Some(outer) = outer {
                return Err(LockstepError::NestedProject {
                    outer: outer.to_string(),
                    inner: name.to_string(),
                });
            }
        }
        Ok(Self {
            inputs_digest: inputs_digest.into(),
            projects,
            solve_meta: None,
        })
    }

    pub fn with_solve_meta(mut self, meta: SolveMeta) -> Self {
        self.solve_meta = Some(meta);
        self
    }

    pub fn inputs_digest(&self) -> &str {
        &self.inputs_digest
    }

    pub fn projects(&self) -> &[LockedProject] {
        &self.projects
    }

    pub fn project(&self, root: &ProjectRoot) -> Option<&LockedProject> {
        self.projects
            .binary_search_by(|p| p.name.cmp(root))
            .ok()
            .map(|i| &self.projects[i])
    }

    pub fn solve_meta(&self) -> Option<&SolveMeta> {
        self.solve_meta.as_ref()
    }

    pub fn from_toml(content: &str) -> Result<Self, LockstepError> {
        let raw: Lock = toml::from_str(content).map_err(|source| LockstepError::Decode {
            what: "lock",
            source,
        })?;
        let meta = raw.solve_meta;
        let lock = Lock::new(raw.inputs_digest, raw.projects)?;
        Ok(Self {
            solve_meta: meta,
            ..lock
        })
    }

    pub fn to_toml(&self) -> Result<String, LockstepError> {
        toml::to_string_pretty(self).map_err(|source| LockstepError::Encode {
            what: "lock",
            source,
        })
    }

    /// Encoded solution content with volatile metadata stripped.
    pub fn solution_toml(&self) -> Result<String, LockstepError> {
        Self {
            solve_meta: None,
            ..self.clone()
        }
        .to_toml()
    }

    /// Two locks are equivalent when their encoded solutions are identical.
    pub fn equivalent(&self, other: &Lock) -> bool {
        if self.inputs_digest != other.inputs_digest || self.projects != other.projects {
            return false;
        }
        match (self.solution_toml(), other.solution_toml()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// Whether this lock was solved from `manifest`'s current inputs.
    pub fn matches_manifest(&self, manifest: &Manifest) -> bool {
        self.inputs_digest == manifest.inputs_digest()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
