#![allow(dead_code)]

use std::sync::Arc;

use galley_core::config_id::ConfigId;
use galley_core::feature_pack::{FeaturePackConfig, FeaturePackConfigBuilder};
use galley_core::feature_pack_spec::{FeaturePackSpec, PackageSpec};
use galley_core::location::Location;
use galley_core::provisioning::ProvisioningConfig;
use galley_resolver::engine::{self, ProvisioningPlan};
use galley_resolver::graph::FeaturePackGraph;
use galley_resolver::inclusion::InstalledFeaturePack;
use galley_universe::loader::TomlFeaturePackLoader;
use galley_universe::repository::{ArtifactCoords, ArtifactRepository};
use galley_universe::resolver::UniverseResolver;
use galley_util::errors::GalleyResult;

/// A throwaway repository of feature-packs in the implicit universe.
pub struct Fixture {
    _tmp: tempfile::TempDir,
    pub repo: Arc<ArtifactRepository>,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let repo = Arc::new(ArtifactRepository::new("test", tmp.path()));
        Self { _tmp: tmp, repo }
    }

    /// Install a feature-pack under `producer:producer:build`.
    pub fn install(&self, spec: FeaturePackSpec) -> &Self {
        let producer = spec.fpid.producer().to_string();
        let build = spec.fpid.build().unwrap().to_string();
        self.repo
            .put_feature_pack(&ArtifactCoords::new(&producer, &producer, &build), &spec)
            .unwrap();
        self
    }

    pub fn plan(&self, config: &ProvisioningConfig) -> GalleyResult<ProvisioningPlan> {
        let universes = Arc::new(UniverseResolver::new(self.repo.clone()));
        let loader = TomlFeaturePackLoader::new(Arc::clone(&universes));
        engine::resolve(config, &universes, &loader)
    }

    pub fn graph(&self, config: &ProvisioningConfig) -> GalleyResult<FeaturePackGraph> {
        self.plan(config).map(|plan| plan.graph)
    }
}

pub fn loc(s: &str) -> Location {
    Location::parse(s).unwrap()
}

pub fn id(s: &str) -> ConfigId {
    ConfigId::parse(s).unwrap()
}

/// A feature-pack with the default packages `p1` and `p2`.
pub fn pack(location: &str) -> FeaturePackSpec {
    FeaturePackSpec::new(loc(location))
        .with_package(PackageSpec::new("p1"))
        .with_package(PackageSpec::new("p2"))
}

pub fn dep(location: &str) -> FeaturePackConfig {
    FeaturePackConfig::new(loc(location))
}

pub fn edge(location: &str) -> FeaturePackConfigBuilder {
    FeaturePackConfig::builder(loc(location))
}

pub fn provisioning(locations: &[&str]) -> ProvisioningConfig {
    locations
        .iter()
        .fold(ProvisioningConfig::default(), |config, l| config.with_feature_pack(dep(l)))
}

pub fn fpids(graph: &FeaturePackGraph) -> Vec<String> {
    graph.fpids().iter().map(ToString::to_string).collect()
}

pub fn packages_of<'a>(plan: &'a ProvisioningPlan, producer: &str) -> Vec<&'a str> {
    installed(plan, producer)
        .packages
        .iter()
        .map(String::as_str)
        .collect()
}

pub fn installed<'a>(plan: &'a ProvisioningPlan, producer: &str) -> &'a InstalledFeaturePack {
    plan.feature_packs
        .iter()
        .find(|fp| fp.fpid.producer == producer)
        .unwrap()
}
