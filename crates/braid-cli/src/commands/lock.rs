//! Handler for `braid lock`.

use braid_ops::ResolveOptions;
use miette::Result;

pub fn exec(opts: &ResolveOptions) -> Result<()> {
    let root = super::project_root()?;
    let lock = braid_ops::ops_lock::lock(&root, opts)?;
    tracing::debug!("Wrote {} lock entries", lock.len());
    Ok(())
}
