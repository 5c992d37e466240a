//! Operation: converge all dependencies and regenerate Braid.lock.

use std::path::Path;

use braid_core::dependency::Dependency;
use braid_core::lockfile::{Lock, LockEntry};
use braid_resolver::conflict::ConflictReport;
use braid_resolver::converger::{ConvergeOptions, Converger};
use braid_resolver::loader::Loader;

use crate::ResolveOptions;

/// Converge with the lock open for rewriting and write the result.
///
/// Entries that still pin their dependency's source are carried over as-is.
/// Stale entries are dropped before the dependency is loaded, and entries for
/// apps that left the tree are removed. Nothing is written if the tree has
/// conflicts.
pub fn lock(project_root: &Path, opts: &ResolveOptions) -> miette::Result<Lock> {
    let loader = crate::open(project_root, opts)?;
    let existing = loader.read_lock()?;

    let converged = Converger::new(&loader)
        .with_options(ConvergeOptions { env: opts.env() })
        .converge(0usize, Some(existing), unlock_stale)?;
    ConflictReport::from_deps(&converged.deps).into_result()?;

    let lock = relock(&converged.deps, &converged.lock);
    lock.write(loader.lockfile_path())?;

    eprintln!(
        "Locked {} of {} dependencies",
        lock.len(),
        converged.deps.len()
    );
    Ok(lock)
}

fn unlock_stale(
    mut dep: Dependency,
    unlocked: usize,
    mut lock: Lock,
) -> miette::Result<(Dependency, usize, Lock)> {
    let stale = dep
        .opts
        .lock
        .as_ref()
        .is_some_and(|entry| !entry.pins(&dep.source));
    if !stale {
        return Ok((dep, unlocked, lock));
    }
    tracing::info!("Unlocking {}: its source changed", dep.app);
    dep.opts.lock = None;
    lock.remove(&dep.app);
    Ok((dep, unlocked + 1, lock))
}

/// One entry per converged dependency that can be pinned.
fn relock(deps: &[Dependency], previous: &Lock) -> Lock {
    deps.iter()
        .filter_map(|dep| {
            let entry = match previous.get(&dep.app) {
                Some(entry) if entry.pins(&dep.source) => entry.clone(),
                _ => LockEntry::for_source(&dep.source, None, dep.version())?,
            };
            Some((dep.app.clone(), entry))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_core::dependency::{GitRef, Source, Status};

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
    fn stale_entry_is_dropped_before_load() {
        let mut dep = git("a", "v2");
        dep.opts.lock = LockEntry::for_source(&git("a", "v1").source, None, None);
        let mut lock = Lock::new();
        lock.insert("a", dep.opts.lock.clone().unwrap());

        let (dep, unlocked, lock) = unlock_stale(dep, 0, lock).unwrap();
        assert_eq!(dep.opts.lock, None);
        assert_eq!(unlocked, 1);
        assert!(lock.is_empty());
    }

    #[test]
    fn relock_keeps_valid_entries() {
        let mut previous = Lock::new();
        let mut kept = LockEntry::for_source(&git("a", "v1").source, None, None).unwrap();
        kept.checksum = Some("sha256:abc".to_string());
        previous.insert("a", kept.clone());
        previous.insert("gone", kept.clone());

        let mut b = git("b", "v3");
        b.status = Status::Ok("3.0.0".to_string());
        let path = Dependency::new("c", Source::Path { path: "libs/c".into() });

        let lock = relock(&[git("a", "v1"), b, path], &previous);
        assert_eq!(lock.len(), 2);
        assert_eq!(lock.get("a"), Some(&kept));
        let b = lock.get("b").unwrap();
        assert_eq!(b.reference, "v3");
        assert_eq!(b.version.as_deref(), Some("3.0.0"));
        assert!(lock.get("gone").is_none());
    }
}
