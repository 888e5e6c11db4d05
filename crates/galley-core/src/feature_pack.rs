//! Dependency edges: a target location plus package and config inclusion rules.

use std::collections::BTreeSet;

use galley_util::errors::{GalleyError, GalleyResult};
use serde::{Deserialize, Serialize};

use crate::config_id::ConfigId;
use crate::location::Location;

/// A dependency on a feature-pack with its inclusion rules.
///
/// Include and exclude sets are disjoint; [`FeaturePackConfigBuilder::build`]
/// rejects anything else, so every value in circulation is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFeaturePackConfig", into = "RawFeaturePackConfig")]
pub struct FeaturePackConfig {
    location: Location,
    transitive: bool,
    inherit_packages: bool,
    inherit_configs: bool,
    included_packages: BTreeSet<String>,
    excluded_packages: BTreeSet<String>,
    included_configs: BTreeSet<ConfigId>,
    excluded_configs: BTreeSet<ConfigId>,
}

impl FeaturePackConfig {
    /// A plain dependency inheriting every default.
    pub fn new(location: Location) -> Self {
        Self {
            location,
            transitive: false,
            inherit_packages: true,
            inherit_configs: true,
            included_packages: BTreeSet::new(),
            excluded_packages: BTreeSet::new(),
            included_configs: BTreeSet::new(),
            excluded_configs: BTreeSet::new(),
        }
    }

    pub fn builder(location: Location) -> FeaturePackConfigBuilder {
        FeaturePackConfigBuilder {
            config: Self::new(location),
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn is_transitive(&self) -> bool {
        self.transitive
    }

    pub fn inherit_packages(&self) -> bool {
        self.inherit_packages
    }

    pub fn inherit_configs(&self) -> bool {
        self.inherit_configs
    }

    pub fn included_packages(&self) -> &BTreeSet<String> {
        &self.included_packages
    }

    pub fn excluded_packages(&self) -> &BTreeSet<String> {
        &self.excluded_packages
    }

    pub fn included_configs(&self) -> &BTreeSet<ConfigId> {
        &self.included_configs
    }

    pub fn excluded_configs(&self) -> &BTreeSet<ConfigId> {
        &self.excluded_configs
    }

    /// The same rules pointing at another location.
    pub fn with_location(&self, location: Location) -> Self {
        Self {
            location,
            ..self.clone()
        }
    }

    /// Layer a transitive override declared higher up the tree onto this edge.
    ///
    /// Inherit flags are AND-ed; where the two disagree about an item, the
    /// override's verdict wins. The result keeps this edge's location and
    /// transitive flag.
    pub fn overridden_by(&self, over: &FeaturePackConfig) -> Self {
        fn layer<T: Ord + Clone>(
            own_in: &BTreeSet<T>,
            own_out: &BTreeSet<T>,
            over_in: &BTreeSet<T>,
            over_out: &BTreeSet<T>,
        ) -> (BTreeSet<T>, BTreeSet<T>) {
            let included = own_in
                .union(over_in)
                .filter(|i| !over_out.contains(*i))
                .cloned()
                .collect();
            let excluded = own_out
                .union(over_out)
                .filter(|i| !over_in.contains(*i))
                .cloned()
                .collect();
            (included, excluded)
        }

        let (included_packages, excluded_packages) = layer(
            &self.included_packages,
            &self.excluded_packages,
            &over.included_packages,
            &over.excluded_packages,
        );
        let (included_configs, excluded_configs) = layer(
            &self.included_configs,
            &self.excluded_configs,
            &over.included_configs,
            &over.excluded_configs,
        );
        Self {
            location: self.location.clone(),
            transitive: self.transitive,
            inherit_packages: self.inherit_packages && over.inherit_packages,
            inherit_configs: self.inherit_configs && over.inherit_configs,
            included_packages,
            excluded_packages,
            included_configs,
            excluded_configs,
        }
    }
}

/// Builder validating the include/exclude disjointness of a [`FeaturePackConfig`].
#[derive(Debug, Clone)]
pub struct FeaturePackConfigBuilder {
    config: FeaturePackConfig,
}

impl FeaturePackConfigBuilder {
    pub fn transitive(mut self, transitive: bool) -> Self {
        self.config.transitive = transitive;
        self
    }

    pub fn inherit_packages(mut self, inherit: bool) -> Self {
        self.config.inherit_packages = inherit;
        self
    }

    pub fn inherit_configs(mut self, inherit: bool) -> Self {
        self.config.inherit_configs = inherit;
        self
    }

    pub fn include_package(mut self, name: impl Into<String>) -> Self {
        self.config.included_packages.insert(name.into());
        self
    }

    pub fn exclude_package(mut self, name: impl Into<String>) -> Self {
        self.config.excluded_packages.insert(name.into());
        self
    }

    pub fn include_config(mut self, id: ConfigId) -> Self {
        self.config.included_configs.insert(id);
        self
    }

    pub fn exclude_config(mut self, id: ConfigId) -> Self {
        self.config.excluded_configs.insert(id);
        self
    }

    pub fn build(self) -> GalleyResult<FeaturePackConfig> {
        let config = self.config;
        let edge = config.location.to_string();
        if let Some(name) = config
            .included_packages
            .intersection(&config.excluded_packages)
            .next()
        {
            return Err(GalleyError::InclusionRule {
                edge,
                message: format!("package {name} is both included and excluded"),
            });
        }
        if let Some(id) = config
            .included_configs
            .intersection(&config.excluded_configs)
            .next()
        {
            return Err(GalleyError::InclusionRule {
                edge,
                message: format!("config {id} is both included and excluded"),
            });
        }
        Ok(config)
    }
}

/// Persisted form of a [`FeaturePackConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawFeaturePackConfig {
    location: Location,
    #[serde(default)]
    transitive: bool,
    #[serde(default = "default_inherit")]
    inherit_packages: bool,
    #[serde(default = "default_inherit")]
    inherit_configs: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    include_packages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    exclude_packages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    include_configs: Vec<ConfigId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    exclude_configs: Vec<ConfigId>,
}

fn default_inherit() -> bool {
    true
}

impl TryFrom<RawFeaturePackConfig> for FeaturePackConfig {
    type Error = GalleyError;

    fn try_from(raw: RawFeaturePackConfig) -> GalleyResult<Self> {
        let mut builder = FeaturePackConfig::builder(raw.location)
            .transitive(raw.transitive)
            .inherit_packages(raw.inherit_packages)
            .inherit_configs(raw.inherit_configs);
        for name in raw.include_packages {
            builder = builder.include_package(name);
        }
        for name in raw.exclude_packages {
            builder = builder.exclude_package(name);
        }
        for id in raw.include_configs {
            builder = builder.include_config(id);
        }
        for id in raw.exclude_configs {
            builder = builder.exclude_config(id);
        }
        builder.build()
    }
}

impl From<FeaturePackConfig> for RawFeaturePackConfig {
    fn from(config: FeaturePackConfig) -> Self {
        Self {
            location: config.location,
            transitive: config.transitive,
            inherit_packages: config.inherit_packages,
            inherit_configs: config.inherit_configs,
            include_packages: config.included_packages.into_iter().collect(),
            exclude_packages: config.excluded_packages.into_iter().collect(),
            include_configs: config.included_configs.into_iter().collect(),
            exclude_configs: config.excluded_configs.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(s: &str) -> Location {
        Location::parse(s).unwrap()
    }

    #[test]
    fn defaults_inherit_everything() {
        let config = FeaturePackConfig::new(loc("fp1#1.0"));
        assert!(config.inherit_packages());
        assert!(config.inherit_configs());
        assert!(!config.is_transitive());
    }

    #[test]
    fn overlapping_packages_rejected_at_construction() {
        let err = FeaturePackConfig::builder(loc("fp1#1.0"))
            .include_package("p1")
            .exclude_package("p1")
            .build()
            .unwrap_err();
        match err {
            GalleyError::InclusionRule { edge, message } => {
                assert_eq!(edge, "fp1#1.0");
                assert!(message.contains("p1"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn overlapping_configs_rejected_at_construction() {
        let id = ConfigId::parse("standalone/main").unwrap();
        let result = FeaturePackConfig::builder(loc("fp1#1.0"))
            .include_config(id.clone())
            .exclude_config(id)
            .build();
        assert!(matches!(result, Err(GalleyError::InclusionRule { .. })));
    }

    #[test]
    fn overlapping_rules_rejected_when_deserializing() {
        let toml = r#"
location = "fp1#1.0"
include-packages = ["p1"]
exclude-packages = ["p1"]
"#;
        assert!(toml::from_str::<FeaturePackConfig>(toml).is_err());
    }

    #[test]
    fn deserialize_full_edge() {
        let toml = r#"
location = "fp3#1.0.1"
transitive = true
inherit-configs = false
include-packages = ["p3"]
exclude-packages = ["p2"]
include-configs = ["standalone/main"]
"#;
        let config: FeaturePackConfig = toml::from_str(toml).unwrap();
        assert!(config.is_transitive());
        assert!(config.inherit_packages());
        assert!(!config.inherit_configs());
        assert!(config.included_packages().contains("p3"));
        assert!(config.excluded_packages().contains("p2"));
        assert_eq!(config.included_configs().len(), 1);
    }

    #[test]
    fn override_layers_rules() {
        let reference = FeaturePackConfig::builder(loc("fp3#1.0.0"))
            .exclude_package("p3")
            .include_package("p4")
            .build()
            .unwrap();
        let over = FeaturePackConfig::builder(loc("fp3#1.0.1"))
            .transitive(true)
            .include_package("p3")
            .exclude_package("p4")
            .exclude_package("p2")
            .build()
            .unwrap();
        let layered = reference.overridden_by(&over);
        assert_eq!(layered.location(), reference.location());
        assert!(!layered.is_transitive());
        assert!(layered.included_packages().contains("p3"));
        assert!(!layered.included_packages().contains("p4"));
        assert!(layered.excluded_packages().contains("p4"));
        assert!(layered.excluded_packages().contains("p2"));
        assert!(!layered.excluded_packages().contains("p3"));
    }
}
