use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use galley_util::errors::{GalleyError, GalleyResult};

use crate::config_model::ConfigModel;
use crate::feature_pack::FeaturePackConfig;
use crate::location::{Location, UniverseSpec};

/// File name of a persisted provisioning config.
pub const PROVISIONING_FILE: &str = "provisioning.toml";

/// Format version written by this release.
pub const CURRENT_FORMAT_VERSION: &str = "2.0";

/// Option key selecting how diverging builds of one producer are handled.
pub const OPTION_VERSION_CONVERGENCE: &str = "version-convergence";

/// What to do when a pinned build overrides a build reached transitively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionConvergence {
    /// The pinned build wins silently.
    #[default]
    Override,
    /// Report every override as a conflict.
    Fail,
}

impl VersionConvergence {
    pub fn parse(value: &str) -> GalleyResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "override" | "first-processed" => Ok(Self::Override),
            "fail" => Ok(Self::Fail),
            other => Err(GalleyError::Config {
                message: format!(
                    "Unknown value '{other}' for option {OPTION_VERSION_CONVERGENCE} (expected override or fail)"
                ),
            }),
        }
    }
}

/// The full description of what to provision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProvisioningConfig {
    #[serde(default = "default_format_version")]
    pub format_version: String,
    /// An alias from `universes` or a universe spec.
    #[serde(default)]
    pub default_universe: Option<String>,
    #[serde(default)]
    pub universes: BTreeMap<String, UniverseSpec>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default, rename = "feature-pack")]
    pub feature_packs: Vec<FeaturePackConfig>,
    #[serde(default, rename = "config")]
    pub configs: Vec<ConfigModel>,
}

fn default_format_version() -> String {
    CURRENT_FORMAT_VERSION.to_string()
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            format_version: default_format_version(),
            default_universe: None,
            universes: BTreeMap::new(),
            options: BTreeMap::new(),
            feature_packs: Vec::new(),
            configs: Vec::new(),
        }
    }
}

impl ProvisioningConfig {
    /// Parse a provisioning config from a TOML string.
    pub fn parse_toml(content: &str) -> GalleyResult<Self> {
        toml::from_str(content).map_err(|e| GalleyError::Config {
            message: format!("Failed to parse provisioning config: {e}"),
        })
    }

    /// Load and parse a provisioning config from the given path.
    pub fn from_path(path: &Path) -> GalleyResult<Self> {
        let content = galley_util::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    pub fn to_toml(&self) -> GalleyResult<String> {
        toml::to_string_pretty(self).map_err(|e| GalleyError::Config {
            message: format!("Failed to serialize provisioning config: {e}"),
        })
    }

    pub fn with_feature_pack(mut self, config: FeaturePackConfig) -> Self {
        self.feature_packs.push(config);
        self
    }

    pub fn with_config(mut self, config: ConfigModel) -> Self {
        self.configs.push(config);
        self
    }

    pub fn with_option(mut self, key: &str, value: &str) -> Self {
        self.options.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_universe(mut self, alias: &str, spec: UniverseSpec) -> Self {
        self.universes.insert(alias.to_string(), spec);
        self
    }

    pub fn version_convergence(&self) -> GalleyResult<VersionConvergence> {
        self.options
            .get(OPTION_VERSION_CONVERGENCE)
            .map(|v| VersionConvergence::parse(v.as_str()))
            .transpose()
            .map(Option::unwrap_or_default)
    }

    /// The configured default universe, with aliases expanded.
    pub fn default_universe_spec(&self) -> GalleyResult<Option<UniverseSpec>> {
        match &self.default_universe {
            None => Ok(None),
            Some(name) => match self.universes.get(name) {
                Some(spec) => Ok(Some(spec.clone())),
                None => UniverseSpec::parse(name).map(Some),
            },
        }
    }

    /// The universe a location refers to once aliases are expanded.
    ///
    /// A bare `@name` matching an alias is replaced by the aliased spec;
    /// a location without a universe gets `fallback`.
    pub fn universe_for(
        &self,
        location: &Location,
        fallback: Option<&UniverseSpec>,
    ) -> Option<UniverseSpec> {
        match location.universe() {
            Some(universe) if universe.location().is_none() => Some(
                self.universes
                    .get(universe.factory())
                    .cloned()
                    .unwrap_or_else(|| universe.clone()),
            ),
            Some(universe) => Some(universe.clone()),
            None => fallback.cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
format-version = "2.0"
default-universe = "community"

[universes]
community = "repo(org.example:universe)"

[options]
version-convergence = "FAIL"

[[feature-pack]]
location = "fp1@community:1#1.0.0.Final"

[[feature-pack]]
location = "fp3:1"
transitive = true
exclude-packages = ["p2"]

[[config]]
model = "standalone"
name = "main"
"#;

    #[test]
    fn parse_sample() {
        let config = ProvisioningConfig::parse_toml(SAMPLE).unwrap();
        assert_eq!(config.feature_packs.len(), 2);
        assert_eq!(config.version_convergence().unwrap(), VersionConvergence::Fail);
        let universe = config.default_universe_spec().unwrap().unwrap();
        assert_eq!(universe.to_string(), "repo(org.example:universe)");
    }

    #[test]
    fn alias_expansion() {
        let config = ProvisioningConfig::parse_toml(SAMPLE).unwrap();
        let aliased = Location::parse("fp1@community:1").unwrap();
        let explicit = Location::parse("fp1@other(x):1").unwrap();
        let bare = Location::parse("fp1:1").unwrap();
        let fallback = UniverseSpec::new("implicit", None);

        assert_eq!(
            config.universe_for(&aliased, None).unwrap().to_string(),
            "repo(org.example:universe)"
        );
        assert_eq!(
            config.universe_for(&explicit, None).unwrap().to_string(),
            "other(x)"
        );
        assert_eq!(config.universe_for(&bare, Some(&fallback)), Some(fallback));
    }

    #[test]
    fn default_convergence_is_override() {
        let config = ProvisioningConfig::default();
        assert_eq!(
            config.version_convergence().unwrap(),
            VersionConvergence::Override
        );
        assert_eq!(config.format_version, CURRENT_FORMAT_VERSION);
    }

    #[test]
    fn unknown_convergence_value_rejected() {
        let config = ProvisioningConfig::default().with_option(OPTION_VERSION_CONVERGENCE, "maybe");
        assert!(config.version_convergence().is_err());
    }

    #[test]
    fn invalid_location_is_a_config_error() {
        let err = ProvisioningConfig::parse_toml("[[feature-pack]]\nlocation = \"fp1@x\"\n").unwrap_err();
        assert!(matches!(err, GalleyError::Config { .. }));
    }
}
