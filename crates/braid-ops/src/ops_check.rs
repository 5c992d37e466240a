//! Operation: verify that the dependency tree converges.
//!
//! Reads the lock but never writes it.

use std::path::Path;

use braid_resolver::conflict::ConflictReport;
use braid_resolver::graph;

use crate::ResolveOptions;

/// Converge the project and fail with every conflict found, or with the
/// cycles if the converged set cannot be ordered.
///
/// Returns the number of converged dependencies.
pub fn check(project_root: &Path, opts: &ResolveOptions) -> miette::Result<usize> {
    let loader = crate::open(project_root, opts)?;
    let converged = crate::converge_read_only(&loader, opts)?;

    ConflictReport::from_deps(&converged.deps).into_result()?;
    let sorted = graph::topsort(converged.deps)?;

    eprintln!(
        "Checked {} dependencies ({} loaded), no conflicts",
        sorted.len(),
        converged.state
    );
    Ok(sorted.len())
}
