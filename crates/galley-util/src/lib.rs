//! Shared utilities for the Galley provisioning engine.
//!
//! This crate provides cross-cutting concerns used by all other Galley crates:
//! the unified error taxonomy, small filesystem helpers and terminal status
//! output.

pub mod errors;
pub mod fs;
pub mod progress;
