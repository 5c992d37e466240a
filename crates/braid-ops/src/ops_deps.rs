//! Operation: list dependencies in build order.

use std::path::Path;

use braid_core::dependency::Dependency;
use braid_resolver::graph;

use crate::ResolveOptions;

/// Print every converged dependency, children before their parents.
pub fn deps(project_root: &Path, opts: &ResolveOptions) -> miette::Result<()> {
    for line in build_order(project_root, opts)?.iter().map(describe) {
        println!("{line}");
    }
    Ok(())
}

/// The converged dependencies, topologically sorted.
pub fn build_order(project_root: &Path, opts: &ResolveOptions) -> miette::Result<Vec<Dependency>> {
    let loader = crate::open(project_root, opts)?;
    let converged = crate::converge_read_only(&loader, opts)?;
    graph::topsort(converged.deps)
}

fn describe(dep: &Dependency) -> String {
    let mut line = format!("* {dep}");
    if let Some(manager) = dep.manager {
        line.push_str(&format!(" ({manager})"));
    }
    if dep.is_conflicted() {
        line.push_str(&format!(" {}", dep.status.label()));
    }
    line
}
