//! Merging two occurrences of the same app, or classifying why they can't be.

use braid_core::dependency::{Dependency, Manager, Status};

use crate::loader::Loader;

/// Outcome of resolving a repeated occurrence against the accepted node.
#[derive(Debug)]
pub enum Resolution {
    /// The accepted node stays. The new occurrence was merged into it or
    /// recorded on its status.
    Kept,
    /// The accepted node was only recorded because it was excluded in the
    /// current env, and merging made it available. The merged node must be
    /// taken out and loaded as a first occurrence.
    Replace(Dependency),
}

/// Resolve `dep` against the already accepted `other` (same app).
///
/// `in_upper` is true when `other`'s app was seen in the upper breadth of the
/// frame `dep` belongs to. Conflicts never fail; they are written to
/// `other.status`. Only `Loader::vsn_match` errors propagate.
pub fn resolve<L: Loader + ?Sized>(
    loader: &L,
    env: Option<&str>,
    other: &mut Dependency,
    dep: Dependency,
    in_upper: bool,
) -> miette::Result<Resolution> {
    if other.is_conflicted() {
        tracing::debug!(
            "{} already {}, ignoring occurrence from {}",
            other.app,
            other.status.label(),
            dep.declared_in()
        );
        return Ok(Resolution::Kept);
    }

    // An override wins even across managers.
    if in_upper && other.opts.overrides {
        merge_only(other, &dep, true);
        return Ok(Resolution::Kept);
    }

    if !converges(other, &dep) {
        tracing::debug!(
            "{} from {} does not converge with {} from {}",
            dep.app,
            dep.declared_in(),
            other.source,
            other.declared_in()
        );
        other.status = if in_upper {
            Status::Overridden(Box::new(dep))
        } else {
            Status::Diverged(Box::new(dep))
        };
        return Ok(Resolution::Kept);
    }

    if let Some(version) = req_mismatch(loader, other, &dep)? {
        other.status = Status::DivergedReq {
            version,
            other: Box::new(dep),
        };
        return Ok(Resolution::Kept);
    }

    let was_skipped = loader.skip(other, env);
    other.manager = sort_manager(other.manager, dep.manager, in_upper);
    merge_only(other, &dep, false);
    if was_skipped && !loader.skip(other, env) {
        tracing::debug!("{} is required in this env by {}", other.app, dep.declared_in());
        return Ok(Resolution::Replace(other.clone()));
    }
    Ok(Resolution::Kept)
}

/// Whether two occurrences describe the same code built the same way.
pub fn converges(a: &Dependency, b: &Dependency) -> bool {
    a.source.kind() == b.source.kind()
        && managers_compatible(a.manager, b.manager)
        && a.opts.same_build_opts(&b.opts)
        && a.source.same_source(&b.source)
}

fn managers_compatible(a: Option<Manager>, b: Option<Manager>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// The version already accepted for `other`, if `dep`'s requirement rejects it.
fn req_mismatch<L: Loader + ?Sized>(
    loader: &L,
    other: &Dependency,
    dep: &Dependency,
) -> miette::Result<Option<String>> {
    let (Some(version), Some(requirement)) = (other.version(), dep.requirement.as_deref()) else {
        return Ok(None);
    };
    if loader.vsn_match(requirement, version, &dep.app)? {
        Ok(None)
    } else {
        Ok(Some(version.to_string()))
    }
}

/// Pick the manager for a merged node.
///
/// From the upper breadth the accepted node's manager stands unless unset;
/// between siblings the higher priority manager wins.
fn sort_manager(current: Option<Manager>, other: Option<Manager>, in_upper: bool) -> Option<Manager> {
    if in_upper {
        return current.or(other);
    }
    Manager::PRIORITY
        .iter()
        .copied()
        .find(|m| Some(*m) == current || Some(*m) == other)
}

/// Merge `dep`'s env filter into `target`.
///
/// When `target` is authoritative, `dep` must be restricted to a subset of
/// `target`'s envs, otherwise `target` becomes `DivergedOnly`. Otherwise the
/// filters are unioned, and an unrestricted side makes the result unrestricted.
fn merge_only(target: &mut Dependency, dep: &Dependency, authoritative: bool) {
    if authoritative {
        let Some(upper) = &target.opts.only else {
            return;
        };
        let covered = dep
            .opts
            .only
            .as_ref()
            .is_some_and(|lower| lower.iter().all(|env| upper.contains(env)));
        if !covered {
            target.status = Status::DivergedOnly(Box::new(dep.clone()));
        }
        return;
    }

    target.opts.only = match (target.opts.only.take(), &dep.opts.only) {
        (Some(mut envs), Some(more)) => {
            for env in more {
                if !envs.contains(env) {
                    envs.push(env.clone());
                }
            }
            Some(envs)
        }
        _ => None,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_core::dependency::{GitRef, Source};
    use braid_core::lockfile::Lock;

    struct SemverLoader;

    impl Loader for SemverLoader {
        fn children(&self) -> miette::Result<Vec<Dependency>> {
            Ok(Vec::new())
        }

        fn load(
            &self,
            dep: Dependency,
            _children: Option<Vec<Dependency>>,
        ) -> miette::Result<Dependency> {
            Ok(dep)
        }

        fn read_lock(&self) -> miette::Result<Lock> {
            Ok(Lock::new())
        }

        fn vsn_match(&self, requirement: &str, version: &str, _app: &str) -> miette::Result<bool> {
            Ok(requirement == version)
        }
    }

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
    fn same_source_merges() {
        let mut other = git("a", "v1");
        let res = resolve(&SemverLoader, None, &mut other, git("a", "v1"), false).unwrap();
        assert!(matches!(res, Resolution::Kept));
        assert_eq!(other.status, Status::Clean);
    }

    #[test]
    fn different_source_diverges_between_siblings() {
        let mut other = git("a", "v1");
        resolve(&SemverLoader, None, &mut other, git("a", "v2"), false).unwrap();
        assert!(matches!(other.status, Status::Diverged(ref d) if d.source == git("a", "v2").source));
    }

    #[test]
    fn different_source_is_overridden_from_upper() {
        let mut other = git("a", "v1");
        resolve(&SemverLoader, None, &mut other, git("a", "v2"), true).unwrap();
        assert!(matches!(other.status, Status::Overridden(_)));
    }

    #[test]
    fn override_absorbs_mismatch() {
        let mut other = git("a", "v1").overriding();
        resolve(&SemverLoader, None, &mut other, git("a", "v2"), true).unwrap();
        assert_eq!(other.status, Status::Clean);
    }

    #[test]
    fn override_only_applies_from_upper() {
        let mut other = git("a", "v1").overriding();
        resolve(&SemverLoader, None, &mut other, git("a", "v2"), false).unwrap();
        assert!(matches!(other.status, Status::Diverged(_)));
    }

    #[test]
    fn override_rejects_wider_only() {
        let mut other = git("a", "v1").overriding().with_only(&["dev"]);
        resolve(&SemverLoader, None, &mut other, git("a", "v1"), true).unwrap();
        assert!(matches!(other.status, Status::DivergedOnly(_)));
    }

    #[test]
    fn override_accepts_narrower_only() {
        let mut other = git("a", "v1").overriding().with_only(&["dev", "test"]);
        let dep = git("a", "v1").with_only(&["test"]);
        resolve(&SemverLoader, None, &mut other, dep, true).unwrap();
        assert_eq!(other.status, Status::Clean);
        assert_eq!(other.opts.only, Some(vec!["dev".to_string(), "test".to_string()]));
    }

    #[test]
    fn only_filters_union() {
        let mut other = git("a", "v1").with_only(&["dev"]);
        resolve(&SemverLoader, None, &mut other, git("a", "v1").with_only(&["test"]), false)
            .unwrap();
        assert_eq!(other.opts.only, Some(vec!["dev".to_string(), "test".to_string()]));
    }

    #[test]
    fn unrestricted_side_clears_only() {
        let mut other = git("a", "v1").with_only(&["dev"]);
        resolve(&SemverLoader, None, &mut other, git("a", "v1"), true).unwrap();
        assert_eq!(other.opts.only, None);
        assert_eq!(other.status, Status::Clean);
    }

    #[test]
    fn requirement_rechecked_against_loaded_version() {
        let mut other = git("a", "v1");
        other.status = Status::Ok("1.0.0".to_string());
        let dep = git("a", "v1").with_requirement("2.0.0");
        resolve(&SemverLoader, None, &mut other, dep, false).unwrap();
        assert!(
            matches!(other.status, Status::DivergedReq { ref version, .. } if version == "1.0.0")
        );
    }

    #[test]
    fn manager_adopted_when_unset() {
        let mut other = git("a", "v1");
        resolve(&SemverLoader, None, &mut other, git("a", "v1").with_manager(Manager::Make), true)
            .unwrap();
        assert_eq!(other.manager, Some(Manager::Make));
    }

    #[test]
    fn conflicting_managers_diverge() {
        let mut other = git("a", "v1").with_manager(Manager::Cargo);
        let dep = git("a", "v1").with_manager(Manager::Make);
        resolve(&SemverLoader, None, &mut other, dep, false).unwrap();
        assert!(matches!(other.status, Status::Diverged(_)));
    }

    #[test]
    fn build_opts_must_match() {
        let mut other = git("a", "v1");
        let mut dep = git("a", "v1");
        dep.opts.compile = Some("make".to_string());
        resolve(&SemverLoader, None, &mut other, dep, false).unwrap();
        assert!(matches!(other.status, Status::Diverged(_)));
    }

    #[test]
    fn skipped_sibling_is_replaced() {
        let mut other = git("a", "v1").with_only(&["dev"]);
        let res = resolve(&SemverLoader, Some("prod"), &mut other, git("a", "v1"), false).unwrap();
        match res {
            Resolution::Replace(dep) => assert_eq!(dep.opts.only, None),
            Resolution::Kept => panic!("expected replacement"),
        }
    }

    #[test]
    fn still_skipped_node_is_kept() {
        let mut other = git("a", "v1").with_only(&["dev"]);
        let dep = git("a", "v1").with_only(&["test"]);
        let res = resolve(&SemverLoader, Some("prod"), &mut other, dep, false).unwrap();
        assert!(matches!(res, Resolution::Kept));
        assert_eq!(other.opts.only, Some(vec!["dev".to_string(), "test".to_string()]));
    }

    #[test]
    fn first_conflict_is_kept() {
        let mut other = git("a", "v1");
        resolve(&SemverLoader, None, &mut other, git("a", "v2"), false).unwrap();
        resolve(&SemverLoader, None, &mut other, git("a", "v3"), true).unwrap();
        assert!(matches!(other.status, Status::Diverged(ref d) if d.source == git("a", "v2").source));
    }
}
