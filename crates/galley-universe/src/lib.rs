//! Universe resolution: catalogs of producers and channels, pluggable
//! universe factories, the local artifact transport, build ordering and
//! feature-pack metadata loading.

pub mod catalog;
pub mod factory;
pub mod loader;
pub mod repository;
pub mod resolver;
pub mod version;
