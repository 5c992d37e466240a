//! Collaborator interfaces the converger drives.

use braid_core::dependency::Dependency;
use braid_core::lockfile::Lock;

/// Produces dependency nodes for the converger.
///
/// Errors from every method are passed through the converger unchanged.
pub trait Loader {
    /// The root project's own declarations.
    fn children(&self) -> miette::Result<Vec<Dependency>>;

    /// Finalize `dep` after it has been fetched.
    ///
    /// When `children` is `Some`, they were already expanded (by a remote
    /// converger) and must be used as-is. Otherwise the loader reads them from
    /// the dependency itself.
    fn load(&self, dep: Dependency, children: Option<Vec<Dependency>>)
        -> miette::Result<Dependency>;

    /// The persisted lock, used when the caller did not supply one.
    fn read_lock(&self) -> miette::Result<Lock>;

    /// Check `version` against an opaque `requirement`.
    fn vsn_match(&self, requirement: &str, version: &str, app: &str) -> miette::Result<bool>;

    /// Whether `dep` is excluded in `env`.
    fn skip(&self, dep: &Dependency, env: Option<&str>) -> bool {
        !dep.available_in(env)
    }

    /// Split `deps` into those kept in `env` and those filtered out.
    fn partition_by_env(
        &self,
        deps: Vec<Dependency>,
        env: Option<&str>,
    ) -> (Vec<Dependency>, Vec<Dependency>) {
        deps.into_iter().partition(|dep| !self.skip(dep, env))
    }
}

/// Registry-aware resolution plugged in next to local convergence.
pub trait RemoteConverger {
    /// Whether the registry, not the local tree, resolves `dep`.
    fn is_remote(&self, dep: &Dependency) -> bool;

    /// Children of a registry-resolved `dep`. Lock data must be re-validated.
    fn deps(&self, dep: &Dependency, lock: &Lock) -> miette::Result<Vec<Dependency>>;

    /// Resolve the remote subset of `deps` and return the rewritten lock.
    fn converge(&self, deps: &[Dependency], lock: Lock) -> miette::Result<Lock>;

    /// Called once when a full convergence finished.
    fn post_converge(&self) {}
}
