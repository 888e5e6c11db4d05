use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config_id::ConfigId;

/// Config property: wrap every branch of the config in a batch.
pub const PROP_BRANCH_IS_BATCH: &str = "config.branch-is-batch";
/// Config property: default for specs without a `parent-children-branch` annotation.
pub const PROP_PARENT_CHILDREN_BRANCH: &str = "config.parent-children-branch";
/// Config property: default for specs without a `spec-branch` annotation.
pub const PROP_SPEC_BRANCH: &str = "config.spec-branch";

/// A named configuration: an ordered list of features plus properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigModel {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Installed unless excluded. Non-default configs must be included explicitly.
    #[serde(default = "default_true")]
    pub default: bool,
    #[serde(default)]
    pub props: BTreeMap<String, String>,
    #[serde(default, rename = "feature")]
    pub features: Vec<FeatureConfig>,
    /// Features inherited from earlier contributions that this one removes.
    #[serde(default, rename = "exclude")]
    pub excludes: Vec<FeatureExclusion>,
}

fn default_true() -> bool {
    true
}

impl ConfigModel {
    pub fn new(model: Option<&str>, name: Option<&str>) -> Self {
        Self {
            model: model.map(str::to_string),
            name: name.map(str::to_string),
            default: true,
            ..Default::default()
        }
    }

    pub fn id(&self) -> ConfigId {
        ConfigId {
            model: self.model.clone(),
            name: self.name.clone(),
        }
    }

    pub fn with_feature(mut self, feature: FeatureConfig) -> Self {
        self.features.push(feature);
        self
    }

    pub fn with_prop(mut self, key: &str, value: &str) -> Self {
        self.props.insert(key.to_string(), value.to_string());
        self
    }

    /// Boolean property lookup; anything but `true` (case-insensitive) is false.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.props
            .get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
    }
}

/// One feature entry of a config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub spec: String,
    /// Producer whose spec of this name is meant, when several define it.
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl FeatureConfig {
    pub fn new(spec: &str) -> Self {
        Self {
            spec: spec.to_string(),
            origin: None,
            params: BTreeMap::new(),
        }
    }

    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = Some(origin.to_string());
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }
}

/// Removes inherited features of a spec, optionally only those whose
/// parameters match every listed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureExclusion {
    pub spec: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl FeatureExclusion {
    pub fn matches(&self, feature: &FeatureConfig) -> bool {
        feature.spec == self.spec
            && self
                .params
                .iter()
                .all(|(k, v)| feature.params.get(k) == Some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config_model() {
        let toml = r#"
model = "standalone"
name = "main"

[props]
"config.branch-is-batch" = "TRUE"

[[feature]]
spec = "interface"
origin = "fp1"
params = { name = "public" }

[[exclude]]
spec = "logger"
params = { category = "org.noise" }
"#;
        let model: ConfigModel = toml::from_str(toml).unwrap();
        assert_eq!(model.id().to_string(), "standalone/main");
        assert!(model.default);
        assert_eq!(model.flag(PROP_BRANCH_IS_BATCH), Some(true));
        assert_eq!(model.flag(PROP_SPEC_BRANCH), None);
        assert_eq!(model.features[0].origin.as_deref(), Some("fp1"));
        assert_eq!(model.excludes.len(), 1);
    }

    #[test]
    fn exclusion_matches_by_spec_and_params() {
        let exclusion = FeatureExclusion {
            spec: "logger".to_string(),
            params: BTreeMap::from([("category".to_string(), "a".to_string())]),
        };
        assert!(exclusion.matches(&FeatureConfig::new("logger").param("category", "a")));
        assert!(!exclusion.matches(&FeatureConfig::new("logger").param("category", "b")));
        assert!(!exclusion.matches(&FeatureConfig::new("handler").param("category", "a")));
    }
}
