pub mod loader;
pub mod ops_check;
pub mod ops_deps;
pub mod ops_lock;
pub mod ops_tree;

use std::path::Path;

use braid_core::config::Config;
use braid_core::dependency::Dependency;
use braid_core::lockfile::Lock;
use braid_resolver::converger::{ConvergeOptions, Converged, Converger};

pub use loader::ManifestLoader;

/// Settings shared by every operation.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub config: Config,
    /// Env given on the command line. Takes precedence over `BRAID_ENV` and
    /// the config file.
    pub env: Option<String>,
}

impl ResolveOptions {
    pub fn env(&self) -> Option<String> {
        self.env.clone().or_else(|| self.config.effective_env())
    }
}

/// Open the project at `project_root` for convergence.
pub fn open(project_root: &Path, opts: &ResolveOptions) -> miette::Result<ManifestLoader> {
    let loader = ManifestLoader::new(project_root, &opts.config)?;
    tracing::debug!(
        "Opened {} (env: {})",
        loader.manifest().package.name,
        opts.env().as_deref().unwrap_or("any")
    );
    Ok(loader)
}

/// Converge without sorting and without rewriting the lock, counting the
/// dependencies that were loaded.
pub(crate) fn converge_read_only(
    loader: &ManifestLoader,
    opts: &ResolveOptions,
) -> miette::Result<Converged<usize>> {
    Converger::new(loader)
        .with_options(ConvergeOptions { env: opts.env() })
        .converge_unsorted(0usize, None, count_loaded)
}

fn count_loaded(
    dep: Dependency,
    count: usize,
    lock: Lock,
) -> miette::Result<(Dependency, usize, Lock)> {
    tracing::debug!("Loading {}", dep.app);
    Ok((dep, count + 1, lock))
}
