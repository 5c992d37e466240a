use braid_ops::ResolveOptions;
use miette::Result;

pub fn exec(opts: &ResolveOptions) -> Result<()> {
    let root = super::project_root()?;
    braid_ops::ops_deps::deps(&root, opts)
}
