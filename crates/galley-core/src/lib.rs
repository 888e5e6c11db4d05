//! Core data types for the Galley provisioning engine.
//!
//! This crate defines the value objects every other crate works with:
//! feature-pack locations and identities, config ids, dependency edges with
//! their inclusion rules, config models, feature specs, feature-pack specs,
//! the provisioning config, and the global user configuration.
//!
//! This crate never contacts a repository.

pub mod config;
pub mod config_id;
pub mod config_model;
pub mod feature_pack;
pub mod feature_pack_spec;
pub mod feature_spec;
pub mod location;
pub mod provisioning;
