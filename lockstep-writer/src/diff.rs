//! Lock-to-lock comparison for `lockstep diff`.

use similar::TextDiff;

use lockstep_core::{layout, Lock, LockedProject, ProjectRoot};

use crate::error::WriterError;
use crate::plan::Artifact;

/// A project present in both locks whose pin moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectChange {
    pub name: ProjectRoot,
    pub old: LockedProject,
    pub new: LockedProject,
}

impl ProjectChange {
    /// `version (revision)` before and after, for display.
    pub fn summary(&self) -> String {
        format!("{} -> {}", describe(&self.old), describe(&self.new))
    }
}

fn describe(p: &LockedProject) -> String {
    match (&p.version, &p.branch) {
        (Some(v), _) => format!("{v} ({})", short(p.revision.as_str())),
        (None, Some(b)) => format!("branch {b} ({})", short(p.revision.as_str())),
        (None, None) => short(p.revision.as_str()).to_string(),
    }
}

fn short(rev: &str) -> &str {
    rev.get(..12).unwrap_or(rev)
}

/// Difference between a live lock (if any) and a new one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LockDiff {
    pub added: Vec<ProjectRoot>,
    pub removed: Vec<ProjectRoot>,
    pub changed: Vec<ProjectChange>,
    pub inputs_changed: bool,
    /// Unified diff of the encoded solutions; empty when they match.
    pub unified_diff: String,
}

impl LockDiff {
    pub fn between(old: Option<&Lock>, new: &Lock) -> Result<Self, WriterError> {
        let encode = |lock: &Lock| {
            lock.solution_toml().map_err(|source| WriterError::Encode {
                artifact: Artifact::Lock,
                source,
            })
        };
        let old_text = old.map(encode).transpose()?.unwrap_or_default();
        let new_text = encode(new)?;

        let mut diff = LockDiff {
            inputs_changed: old.map_or(true, |o| o.inputs_digest() != new.inputs_digest()),
            ..LockDiff::default()
        };

        for project in new.projects() {
            match old.and_then(|o| o.project(&project.name)) {
                None => diff.added.push(project.name.clone()),
                Some(prev) if prev != project => diff.changed.push(ProjectChange {
                    name: project.name.clone(),
                    old: prev.clone(),
                    new: project.clone(),
                }),
                Some(_) => {}
            }
        }
        if let Some(old) = old {
            diff.removed = old
                .projects()
                .iter()
                .filter(|p| new.project(&p.name).is_none())
                .map(|p| p.name.clone())
                .collect();
        }

        if old_text != new_text {
            let old_header = format!("a/{}", layout::LOCK_NAME);
            let new_header = format!("b/{}", layout::LOCK_NAME);
            diff.unified_diff = TextDiff::from_lines(&old_text, &new_text)
                .unified_diff()
                .header(&old_header, &new_header)
                .context_radius(3)
                .to_string();
        }
        Ok(diff)
    }

    pub fn is_empty(&self) -> bool {
        self.unified_diff.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock(projects: Vec<LockedProject>) -> Lock {
        Lock::new("digest", projects).unwrap()
    }

    #[test]
    fn identical_locks_have_no_diff() {
        let a = lock(vec![LockedProject::new("github.com/a/b", "r1")]);
        let diff = LockDiff::between(Some(&a), &a.clone()).unwrap();
        assert!(diff.is_empty());
        assert!(diff.added.is_empty() && diff.removed.is_empty() && diff.changed.is_empty());
        assert!(!diff.inputs_changed);
    }

    #[test]
    fn added_removed_and_changed_are_classified() {
        let old = lock(vec![
            LockedProject::new("github.com/a/keep", "r1").with_version("v1.0.0"),
            LockedProject::new("github.com/a/gone", "r1"),
        ]);
        let new = lock(vec![
            LockedProject::new("github.com/a/keep", "r2").with_version("v1.1.0"),
            LockedProject::new("github.com/a/new", "r1"),
        ]);
        let diff = LockDiff::between(Some(&old), &new).unwrap();

        assert_eq!(diff.added, vec![ProjectRoot::from("github.com/a/new")]);
        assert_eq!(diff.removed, vec![ProjectRoot::from("github.com/a/gone")]);
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].summary(), "v1.0.0 (r1) -> v1.1.0 (r2)");
        assert!(diff.unified_diff.contains("--- a/Lockstep.lock"));
        assert!(diff.unified_diff.contains("+++ b/Lockstep.lock"));
    }

    #[test]
    fn missing_old_lock_adds_everything() {
        let new = lock(vec![LockedProject::new("github.com/a/b", "r1")]);
        let diff = LockDiff::between(None, &new).unwrap();
        assert_eq!(diff.added.len(), 1);
        assert!(diff.inputs_changed);
        assert!(diff.unified_diff.contains("+name = \"github.com/a/b\""));
    }
}
