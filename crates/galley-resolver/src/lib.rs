//! Feature-pack resolution: depth-first graph construction with version
//! convergence, per-edge package and config inclusion, config contribution
//! merging, and the versioned table of resolution engines.

pub mod builder;
pub mod conflict;
pub mod engine;
pub mod graph;
pub mod inclusion;
pub mod merge;
