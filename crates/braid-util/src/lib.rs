//! Shared utilities for the Braid dependency tool.
//!
//! This crate provides cross-cutting concerns used by all other Braid crates:
//! the unified error type and a handful of filesystem helpers.

pub mod errors;
pub mod fs;
