//! Conflict reporting for converged dependencies.

use std::fmt;

use braid_core::dependency::{Dependency, Status};
use braid_util::errors::BraidError;

/// Every conflict left on a converged dependency set.
#[derive(Debug, Default)]
pub struct ConflictReport {
    pub conflicts: Vec<DepConflict>,
}

/// The kind of conflict, mirroring the conflict variants of [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    Overridden,
    Diverged,
    DivergedOnly,
    DivergedReq,
}

/// A single conflict on one app.
#[derive(Debug, Clone)]
pub struct DepConflict {
    pub app: String,
    pub kind: ConflictKind,
    pub message: String,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the conflicts carried by `deps`, in their order.
    pub fn from_deps(deps: &[Dependency]) -> Self {
        let mut report = Self::new();
        for dep in deps {
            if let Some(conflict) = DepConflict::from_dep(dep) {
                report.add(conflict);
            }
        }
        report
    }

    pub fn add(&mut self, conflict: DepConflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    /// Fail with every conflict at once, or succeed if there are none.
    pub fn into_result(self) -> miette::Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        Err(BraidError::Conflicts {
            report: self.to_string(),
        }
        .into())
    }
}

impl DepConflict {
    pub fn from_dep(dep: &Dependency) -> Option<Self> {
        let (kind, message) = match &dep.status {
            Status::Clean | Status::Ok(_) => return None,
            Status::Diverged(other) => (
                ConflictKind::Diverged,
                format!(
                    "different specs were given for {}: {} in {} but {} in {}",
                    dep.app,
                    dep.source,
                    dep.declared_in(),
                    other.source,
                    other.declared_in()
                ),
            ),
            Status::Overridden(other) => (
                ConflictKind::Overridden,
                format!(
                    "{} from {} ({}) is overriding a child dependency from {} ({}); \
                     make them match or set `override = true` in {}",
                    dep.app,
                    dep.declared_in(),
                    dep.source,
                    other.declared_in(),
                    other.source,
                    dep.declared_in()
                ),
            ),
            Status::DivergedOnly(other) => (
                ConflictKind::DivergedOnly,
                format!(
                    "{} is restricted to {} in {} but {} requires it in {}; \
                     specify at least the same environments in `only`",
                    dep.app,
                    envs(&dep.opts.only),
                    dep.declared_in(),
                    other.declared_in(),
                    envs(&other.opts.only)
                ),
            ),
            Status::DivergedReq { version, other } => (
                ConflictKind::DivergedReq,
                format!(
                    "{} resolved to {} for {} does not match requirement {} from {}",
                    dep.app,
                    version,
                    dep.declared_in(),
                    other.requirement.as_deref().unwrap_or("*"),
                    other.declared_in()
                ),
            ),
        };
        Some(Self {
            app: dep.app.clone(),
            kind,
            message,
        })
    }
}

fn envs(only: &Option<Vec<String>>) -> String {
    match only {
        Some(envs) => format!("[{}]", envs.join(", ")),
        None => "all environments".to_string(),
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No dependency conflicts.");
        }
        writeln!(f, "Dependency conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  * {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for DepConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_core::dependency::{GitRef, Source};

    fn git(app: &str, tag: &str) -> Dependency {
        Dependency::new(
            app,
            Source::Git {
                url: format!("https://example.com/{app}"),
                reference: GitRef::Tag(tag.to_string()),
            },
        )
    }

    #[test]
    fn empty_report() {
        let report = ConflictReport::from_deps(&[git("a", "v1")]);
        assert!(report.is_empty());
        assert_eq!(report.to_string(), "No dependency conflicts.");
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn report_names_both_declarations() {
        let mut accepted = git("a", "v1");
        let mut other = git("a", "v2");
        other.from = Some("b".to_string());
        accepted.status = Status::Diverged(Box::new(other));

        let report = ConflictReport::from_deps(&[accepted]);
        assert_eq!(report.len(), 1);
        assert_eq!(report.conflicts[0].kind, ConflictKind::Diverged);
        let s = report.to_string();
        assert!(s.contains("tag: v1"), "got: {s}");
        assert!(s.contains("tag: v2"), "got: {s}");
        assert!(s.contains("in b"), "got: {s}");
    }

    #[test]
    fn only_conflict_lists_envs() {
        let mut accepted = git("a", "v1").with_only(&["dev"]);
        accepted.status = Status::DivergedOnly(Box::new(git("a", "v1")));
        let conflict = DepConflict::from_dep(&accepted).unwrap();
        assert!(conflict.message.contains("[dev]"));
        assert!(conflict.message.contains("all environments"));
    }

    #[test]
    fn into_result_fails_with_all_conflicts() {
        let mut a = git("a", "v1");
        a.status = Status::Overridden(Box::new(git("a", "v2")));
        let mut b = git("b", "v1");
        b.status = Status::DivergedReq {
            version: "1.0.0".to_string(),
            other: Box::new(git("b", "v1").with_requirement("^2")),
        };
        let err = ConflictReport::from_deps(&[a, b]).into_result().unwrap_err();
        let s = err.to_string();
        assert!(s.contains("overriding a child"), "got: {s}");
        assert!(s.contains("requirement ^2"), "got: {s}");
    }
}
