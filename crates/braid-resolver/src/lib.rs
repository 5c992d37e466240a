//! Dependency convergence engine: breadth-first convergence with
//! parent-overrides-child precedence, divergence classification, the remote
//! resolution protocol, and topological build ordering.

pub mod conflict;
pub mod converger;
pub mod divergence;
pub mod graph;
pub mod loader;
