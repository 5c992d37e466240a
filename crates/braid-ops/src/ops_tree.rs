//! Operation: display the converged dependency tree.

use std::path::Path;

use braid_resolver::conflict::ConflictReport;
use braid_resolver::graph;

use crate::ResolveOptions;

/// Options for `braid tree`.
#[derive(Debug, Default)]
pub struct TreeOptions {
    pub resolve: ResolveOptions,
    /// Maximum tree depth to display.
    pub depth: Option<usize>,
    /// Show the path from a top-level dependency to this app.
    pub why: Option<String>,
    /// Show conflicts instead of the tree.
    pub conflicts: bool,
}

/// Display the dependency tree for the project.
pub fn tree(project_root: &Path, opts: &TreeOptions) -> miette::Result<()> {
    print!("{}", render(project_root, opts)?);
    Ok(())
}

/// The output of [`tree`].
///
/// Conflicts do not fail the operation: conflicted nodes are labelled with
/// their status.
pub fn render(project_root: &Path, opts: &TreeOptions) -> miette::Result<String> {
    let loader = crate::open(project_root, &opts.resolve)?;
    let converged = crate::converge_read_only(&loader, &opts.resolve)?;
    let deps = &converged.deps;

    if let Some(target) = &opts.why {
        let Some(path) = graph::find_path(deps, target) else {
            return Ok(format!("Dependency '{target}' not found in the graph.\n"));
        };
        let mut out = format!("Path to {target}:\n");
        for (i, dep) in path.iter().enumerate() {
            out.push_str(&format!("{}{dep}\n", "  ".repeat(i)));
        }
        return Ok(out);
    }

    if opts.conflicts {
        let report = ConflictReport::from_deps(deps);
        return Ok(if report.is_empty() {
            format!("{report}\n")
        } else {
            report.to_string()
        });
    }

    let out = graph::print_tree(deps, opts.depth);
    if out.is_empty() {
        return Ok("No dependencies.\n".to_string());
    }
    Ok(out)
}
