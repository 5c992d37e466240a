//! Core data types for the Braid dependency tool.
//!
//! This crate defines the values the convergence engine works on: the
//! [`dependency::Dependency`] node with its source, options and conflict
//! status, the lock mapping and its on-disk lockfile, the `Braid.toml`
//! manifest, and user configuration.
//!
//! This crate is intentionally free of network I/O.

/// Name of the manifest file at the root of every Braid project.
pub const MANIFEST_FILE: &str = "Braid.toml";

pub mod config;
pub mod dependency;
pub mod lockfile;
pub mod manifest;
