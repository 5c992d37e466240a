//! CLI argument definitions for Braid.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "braid",
    version,
    about = "Converge a project's dependency tree",
    long_about = "Braid merges every declaration of a dependency across the whole tree into \
                  a single node, reports the declarations that cannot be merged, and orders \
                  the result so each dependency is built before the ones that need it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Environment used to filter `only` dependencies
    #[arg(short, long, global = true, env = "BRAID_ENV")]
    pub env: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the dependency tree converges
    Check,

    /// Converge the dependency tree and regenerate Braid.lock
    Lock,

    /// Display the converged dependency tree
    Tree {
        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<u32>,
        /// Show how a dependency is reached
        #[arg(long)]
        why: Option<String>,
        /// Show conflicts instead of the tree
        #[arg(long)]
        conflicts: bool,
    },

    /// List dependencies in build order
    Deps,
}

pub fn parse() -> Cli {
    Cli::parse()
}
