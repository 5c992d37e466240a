//! Handler for `braid tree`.

use braid_ops::ops_tree::{self, TreeOptions};
use braid_ops::ResolveOptions;
use miette::Result;

pub fn exec(
    resolve: ResolveOptions,
    depth: Option<u32>,
    why: Option<String>,
    conflicts: bool,
) -> Result<()> {
    let root = super::project_root()?;
    let opts = TreeOptions {
        resolve,
        depth: depth.map(|d| d as usize),
        why,
        conflicts,
    };
    ops_tree::tree(&root, &opts)
}
