//! The manifest: user-declared constraints, encoded as TOML.
//!
//! ```toml
//! required = ["github.com/x/tool/cmd/gen"]
//!
//! [[constraint]]
//! name = "github.com/sdboyer/deptest"
//! version = "1.0.0"
//!
//! [prune]
//! test-files = true
//!
//!   [[prune.project]]
//!   name = "github.com/sdboyer/deptest"
//!   test-files = false
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::LockstepError;
use crate::prune::{CascadingPruneOptions, PruneOptions};
use crate::types::ProjectRoot;

/// A single `[[constraint]]` or `[[override]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConstraint {
    pub name: ProjectRoot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ProjectConstraint {
    pub fn version(name: impl Into<ProjectRoot>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
            branch: None,
            revision: None,
            source: None,
        }
    }

    fn canonical(&self, kind: &str) -> String {
        format!(
            "{kind}:{}:version={};branch={};revision={};source={}",
            self.name,
            self.version.as_deref().unwrap_or(""),
            self.branch.as_deref().unwrap_or(""),
            self.revision.as_deref().unwrap_or(""),
            self.source.as_deref().unwrap_or(""),
        )
    }
}

/// Flags left unset inherit from the enclosing level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PruneFlags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_vendor_dirs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_source_files: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_files: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_files: Option<bool>,
}

impl PruneFlags {
    fn apply_to(&self, base: PruneOptions) -> PruneOptions {
        PruneOptions {
            nested_vendor_dirs: self.nested_vendor_dirs.unwrap_or(base.nested_vendor_dirs),
            non_source_files: self.non_source_files.unwrap_or(base.non_source_files),
            test_files: self.test_files.unwrap_or(base.test_files),
            legal_files: self.legal_files.unwrap_or(base.legal_files),
        }
    }
}

/// `[[prune.project]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPrune {
    pub name: ProjectRoot,
    #[serde(flatten)]
    pub flags: PruneFlags,
}

/// The `[prune]` table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PruneSection {
    #[serde(flatten)]
    pub flags: PruneFlags,
    #[serde(default, rename = "project", skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<ProjectPrune>,
}

/// User-declared version constraints for a project.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<String>,
    #[serde(default, rename = "constraint", skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ProjectConstraint>,
    #[serde(default, rename = "override", skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<ProjectConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prune: Option<PruneSection>,
}

impl Manifest {
    pub fn from_toml(content: &str) -> Result<Self, LockstepError> {
        toml::from_str(content).map_err(|source| LockstepError::Decode {
            what: "manifest",
            source,
        })
    }

    pub fn to_toml(&self) -> Result<String, LockstepError> {
        toml::to_string_pretty(self).map_err(|source| LockstepError::Encode {
            what: "manifest",
            source,
        })
    }

    /// Cascading prune options declared by the `[prune]` table.
    ///
    /// Without a `[prune]` table only nested vendor directories are pruned.
    /// Per-project entries inherit unset flags from the table-level flags.
    pub fn prune_options(&self) -> CascadingPruneOptions {
        let base = CascadingPruneOptions::default();
        let Some(section) = &self.prune else {
            return base;
        };
        let default_options = section.flags.apply_to(base.default_options);
        let mut cascade = CascadingPruneOptions::new(default_options);
        for project in &section.projects {
            cascade
                .per_project
                .insert(project.name.clone(), project.flags.apply_to(default_options));
        }
        cascade
    }

    /// SHA-256 hex digest over the inputs that affect solving.
    ///
    /// Entry order in the file does not change the digest; prune settings
    /// are excluded since they do not influence the solution.
    pub fn inputs_digest(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        lines.extend(self.constraints.iter().map(|c| c.canonical("constraint")));
        lines.extend(self.overrides.iter().map(|c| c.canonical("override")));
        lines.extend(self.required.iter().map(|r| format!("required:{r}")));
        lines.extend(self.ignored.iter().map(|i| format!("ignored:{i}")));
        lines.sort();

        let mut h = Sha256::new();
        for line in &lines {
            h.update(line.as_bytes());
            h.update(b"\n");
        }
        hex::encode(h.finalize())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
required = ["github.com/x/tool/cmd/gen"]

[[constraint]]
name = "github.com/sdboyer/deptest"
version = "1.0.0"

[[override]]
name = "github.com/sdboyer/deptestdos"
branch = "master"

[prune]
test-files = true

  [[prune.project]]
  name = "github.com/sdboyer/deptest"
  test-files = false
  legal-files = true
"#;

    #[test]
    fn parses_constraints_and_overrides() {
        let m = Manifest::from_toml(SAMPLE).unwrap();
        assert_eq!(m.required, vec!["github.com/x/tool/cmd/gen".to_string()]);
        assert_eq!(m.constraints.len(), 1);
        assert_eq!(m.constraints[0].version.as_deref(), Some("1.0.0"));
        assert_eq!(m.overrides[0].branch.as_deref(), Some("master"));
    }

    #[test]
    fn prune_table_cascades_into_projects() {
        let m = Manifest::from_toml(SAMPLE).unwrap();
        let cascade = m.prune_options();
        assert!(cascade.default_options.nested_vendor_dirs);
        assert!(cascade.default_options.test_files);
        assert!(!cascade.default_options.legal_files);

        let dep = cascade.resolve(&ProjectRoot::from("github.com/sdboyer/deptest"));
        assert!(dep.nested_vendor_dirs, "inherited from table defaults");
        assert!(!dep.test_files, "override wins");
        assert!(dep.legal_files);
    }

    #[test]
    fn missing_prune_table_prunes_nested_vendor_only() {
        let m = Manifest::default();
        assert_eq!(m.prune_options(), CascadingPruneOptions::default());
    }

    #[test]
    fn encode_decode_preserves_content() {
        let m = Manifest::from_toml(SAMPLE).unwrap();
        let encoded = m.to_toml().unwrap();
        assert_eq!(Manifest::from_toml(&encoded).unwrap(), m);
    }

    #[test]
    fn inputs_digest_ignores_order_and_prune() {
        let a = Manifest {
            constraints: vec![
                ProjectConstraint::version("a.org/x", "1.0.0"),
                ProjectConstraint::version("b.org/y", "2.0.0"),
            ],
            ..Manifest::default()
        };
        let mut b = a.clone();
        b.constraints.reverse();
        b.prune = Some(PruneSection::default());
        assert_eq!(a.inputs_digest(), b.inputs_digest());

        let mut c = a.clone();
        c.constraints[0].version = Some("1.1.0".into());
        assert_ne!(a.inputs_digest(), c.inputs_digest());
    }

    #[test]
    fn malformed_manifest_is_decode_error() {
        let err = Manifest::from_toml("[[constraint]]\nversion = 3").unwrap_err();
        assert!(matches!(err, LockstepError::Decode { what: "manifest", .. }));
    }
}
