use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Braid operations.
#[derive(Debug, Error, Diagnostic)]
pub enum BraidError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed manifest (e.g. Braid.toml).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your Braid.toml for syntax errors"))]
    Manifest { message: String },

    /// The lockfile could not be read or written.
    #[error("Lockfile error: {message}")]
    #[diagnostic(help("Delete Braid.lock and run `braid lock` to regenerate it"))]
    Lockfile { message: String },

    /// Invalid user configuration.
    #[error("Config error: {message}")]
    Config { message: String },

    /// Dependency resolution failed for a reason other than a conflict.
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// One or more dependencies could not be converged.
    #[error("Dependencies have diverged:\n{report}")]
    #[diagnostic(help(
        "Ensure the conflicting declarations match, or declare the dependency \
         in your Braid.toml with `override = true`"
    ))]
    Conflicts { report: String },

    /// The converged dependency set is not a DAG.
    #[error("Could not sort dependencies. There are cycles in the dependency graph: {cycles}")]
    #[diagnostic(help("Break the cycle by removing one of the dependency declarations"))]
    Cycle { cycles: String },

    /// A dependency declares itself as one of its own children.
    #[error("App {app} lists itself as a dependency")]
    SelfDependency { app: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type BraidResult<T> = miette::Result<T>;
