//! Build ordering and inspection of a converged dependency set.

use std::collections::{HashMap, HashSet};

use braid_core::dependency::Dependency;
use braid_util::errors::BraidError;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

/// One vertex per app, with an edge from each child to its parent.
fn build_graph(deps: &[Dependency]) -> miette::Result<DiGraph<String, ()>> {
    let mut graph = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for dep in deps {
        let idx = graph.add_node(dep.app.clone());
        index.insert(dep.app.as_str(), idx);
    }

    for dep in deps {
        let Some(&parent) = index.get(dep.app.as_str()) else {
            continue;
        };
        for child in &dep.deps {
            if child.app == dep.app {
                return Err(BraidError::SelfDependency {
                    app: dep.app.clone(),
                }
                .into());
            }
            // Children that were filtered out of the set impose no order.
            if let Some(&child_idx) = index.get(child.app.as_str()) {
                graph.update_edge(child_idx, parent, ());
            }
        }
    }
    Ok(graph)
}

/// Order `deps` so every node comes after all of its children.
///
/// The returned nodes are the ones passed in, moved, not reloaded.
pub fn topsort(deps: Vec<Dependency>) -> miette::Result<Vec<Dependency>> {
    let graph = build_graph(&deps)?;
    let order = toposort(&graph, None).map_err(|cycle| {
        tracing::debug!("Cycle detected at {}", graph[cycle.node_id()]);
        BraidError::Cycle {
            cycles: format_cycles(&find_cycles(&graph)),
        }
    })?;

    let mut by_app: HashMap<String, Dependency> =
        deps.into_iter().map(|dep| (dep.app.clone(), dep)).collect();
    Ok(order
        .into_iter()
        .filter_map(|idx| by_app.remove(&graph[idx]))
        .collect())
}

/// Every cycle in the child/parent relation of `deps`, each as a sorted list
/// of apps. Empty when `deps` can be sorted.
pub fn cycles(deps: &[Dependency]) -> miette::Result<Vec<Vec<String>>> {
    Ok(find_cycles(&build_graph(deps)?))
}

/// Fail with [`BraidError::Cycle`] if `deps` cannot be ordered.
pub fn ensure_acyclic(deps: &[Dependency]) -> miette::Result<()> {
    let found = cycles(deps)?;
    if found.is_empty() {
        return Ok(());
    }
    Err(BraidError::Cycle {
        cycles: format_cycles(&found),
    }
    .into())
}

fn find_cycles(graph: &DiGraph<String, ()>) -> Vec<Vec<String>> {
    let mut cycles: Vec<Vec<String>> = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| {
            let mut apps: Vec<String> = scc.into_iter().map(|idx| graph[idx].clone()).collect();
            apps.sort();
            apps
        })
        .collect();
    cycles.sort();
    cycles
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|apps| format!("[{}]", apps.join(", ")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render the converged set as a tree rooted at the top-level dependencies.
///
/// Children are shown as their converged node. An app repeated along a path
/// is printed but not expanded again.
pub fn print_tree(deps: &[Dependency], max_depth: Option<usize>) -> String {
    let by_app: HashMap<&str, &Dependency> = deps.iter().map(|d| (d.app.as_str(), d)).collect();
    let mut output = String::new();
    let roots: Vec<&Dependency> = deps.iter().filter(|d| d.top_level).collect();
    let count = roots.len();
    let mut visiting = HashSet::new();
    for (i, dep) in roots.into_iter().enumerate() {
        print_subtree(&mut output, &by_app, dep, "", i == count - 1, 1, max_depth, &mut visiting);
    }
    output
}

#[allow(clippy::too_many_arguments)]
fn print_subtree<'a>(
    output: &mut String,
    by_app: &HashMap<&str, &'a Dependency>,
    dep: &'a Dependency,
    prefix: &str,
    is_last: bool,
    depth: usize,
    max_depth: Option<usize>,
    visiting: &mut HashSet<&'a str>,
) {
    let connector = if is_last { "└── " } else { "├── " };
    if dep.is_conflicted() {
        output.push_str(&format!("{prefix}{connector}{dep} ({})\n", dep.status.label()));
    } else {
        output.push_str(&format!("{prefix}{connector}{dep}\n"));
    }

    if let Some(max) = max_depth {
        if depth >= max {
            return;
        }
    }

    if !visiting.insert(dep.app.as_str()) {
        return;
    }

    let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
    let children: Vec<&Dependency> = dep
        .deps
        .iter()
        .filter_map(|child| by_app.get(child.app.as_str()).copied())
        .collect();
    let count = children.len();
    for (i, child) in children.into_iter().enumerate() {
        print_subtree(
            output,
            by_app,
            child,
            &child_prefix,
            i == count - 1,
            depth + 1,
            max_depth,
            visiting,
        );
    }

    visiting.remove(dep.app.as_str());
}

/// Path from a top-level dependency down to `app`, if `app` is reachable.
pub fn find_path<'a>(deps: &'a [Dependency], app: &str) -> Option<Vec<&'a Dependency>> {
    let by_app: HashMap<&str, &Dependency> = deps.iter().map(|d| (d.app.as_str(), d)).collect();
    let mut visited = HashSet::new();
    for root in deps.iter().filter(|d| d.top_level) {
        let mut path = Vec::new();
        if dfs_path(&by_app, root, app, &mut path, &mut visited) {
            return Some(path);
        }
    }
    None
}

fn dfs_path<'a>(
    by_app: &HashMap<&str, &'a Dependency>,
    current: &'a Dependency,
    target: &str,
    path: &mut Vec<&'a Dependency>,
    visited: &mut HashSet<&'a str>,
) -> bool {
    path.push(current);
    if current.app == target {
        return true;
    }
    if !visited.insert(current.app.as_str()) {
        path.pop();
        return false;
    }
    for child in &current.deps {
        if let Some(&next) = by_app.get(child.app.as_str()) {
            if dfs_path(by_app, next, target, path, visited) {
                return true;
            }
        }
    }
    path.pop();
    false
}
