//! Resolution engines, selected by the provisioning format version.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use galley_core::provisioning::ProvisioningConfig;
use galley_universe::loader::FeaturePackLoader;
use galley_universe::resolver::UniverseResolver;
use galley_util::errors::{GalleyError, GalleyResult};

use crate::builder::GraphBuilder;
use crate::graph::FeaturePackGraph;
use crate::inclusion::{self, InstalledFeaturePack};
use crate::merge::{self, ResolvedConfig};

/// Everything needed to lay out an installation.
pub struct ProvisioningPlan {
    pub graph: FeaturePackGraph,
    /// Installed feature-packs, dependencies first.
    pub feature_packs: Vec<InstalledFeaturePack>,
    pub configs: Vec<ResolvedConfig>,
}

pub trait ResolutionEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(
        &self,
        config: &ProvisioningConfig,
        universes: &UniverseResolver,
        loader: &dyn FeaturePackLoader,
    ) -> GalleyResult<ProvisioningPlan>;
}

/// Graph resolution, then inclusion rules, then config merging.
pub struct StandardEngine;

impl ResolutionEngine for StandardEngine {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn resolve(
        &self,
        config: &ProvisioningConfig,
        universes: &UniverseResolver,
        loader: &dyn FeaturePackLoader,
    ) -> GalleyResult<ProvisioningPlan> {
        let graph = GraphBuilder::new(config, universes, loader)?.build()?;
        let feature_packs = inclusion::installed(&graph)?;
        let configs = merge::merge_configs(&graph, &feature_packs, config)?;
        Ok(ProvisioningPlan {
            graph,
            feature_packs,
            configs,
        })
    }
}

/// Engines by major format version.
static ENGINES: &[(&str, &dyn ResolutionEngine)] = &[("1", &StandardEngine), ("2", &StandardEngine)];

static SELECTED: LazyLock<Mutex<HashMap<String, &'static dyn ResolutionEngine>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// The engine for a provisioning format version, looked up once per version.
pub fn engine_for(format_version: &str) -> GalleyResult<&'static dyn ResolutionEngine> {
    let mut selected = SELECTED.lock().map_err(|_| GalleyError::Generic {
        message: "engine cache is poisoned".to_string(),
    })?;
    if let Some(engine) = selected.get(format_version) {
        return Ok(*engine);
    }

    let major = format_version.split('.').next().unwrap_or_default();
    let engine = ENGINES
        .iter()
        .find(|(version, _)| *version == major)
        .map(|(_, engine)| *engine)
        .ok_or_else(|| GalleyError::UnsupportedFormat {
            version: format_version.to_string(),
        })?;
    tracing::debug!("Format {format_version} uses the {} engine", engine.name());
    selected.insert(format_version.to_string(), engine);
    Ok(engine)
}

/// Major format versions with an engine.
pub fn supported_formats() -> Vec<&'static str> {
    ENGINES.iter().map(|(version, _)| *version).collect()
}

/// Resolve a provisioning config with the engine its format version names.
pub fn resolve(
    config: &ProvisioningConfig,
    universes: &UniverseResolver,
    loader: &dyn FeaturePackLoader,
) -> GalleyResult<ProvisioningPlan> {
    engine_for(&config.format_version)?.resolve(config, universes, loader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_by_major_version() {
        assert_eq!(engine_for("2.0").unwrap().name(), "standard");
        assert_eq!(engine_for("2.1").unwrap().name(), "standard");
        assert_eq!(engine_for("1.0").unwrap().name(), "standard");
        assert_eq!(supported_formats(), vec!["1", "2"]);
    }

    #[test]
    fn unknown_version() {
        let err = engine_for("9.0").err().unwrap();
        assert!(matches!(err, GalleyError::UnsupportedFormat { version } if version == "9.0"));
    }
}
