//! Command dispatch and handler modules.

mod check;
mod deps;
mod lock;
mod tree;

use std::path::PathBuf;

use braid_core::config::Config;
use braid_core::MANIFEST_FILE;
use braid_ops::ResolveOptions;
use braid_util::errors::BraidError;
use miette::Result;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let opts = resolve_options(cli.env)?;
    match cli.command {
        Command::Check => check::exec(&opts),
        Command::Lock => lock::exec(&opts),
        Command::Tree {
            depth,
            why,
            conflicts,
        } => tree::exec(opts, depth, why, conflicts),
        Command::Deps => deps::exec(&opts),
    }
}

fn resolve_options(env: Option<String>) -> Result<ResolveOptions> {
    Ok(ResolveOptions {
        config: Config::load()?,
        env: env.filter(|e| !e.is_empty()),
    })
}

/// The nearest directory at or above the current one holding a `Braid.toml`.
fn project_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(BraidError::Io)?;
    braid_util::fs::find_ancestor_with(&cwd, MANIFEST_FILE).ok_or_else(|| {
        BraidError::Manifest {
            message: format!(
                "Could not find {MANIFEST_FILE} in {} or any parent directory",
                cwd.display()
            ),
        }
        .into()
    })
}
