use serde::{Deserialize, Serialize};
use std::path::Path;

use galley_util::errors::{GalleyError, GalleyResult};

use crate::config_id::ConfigId;
use crate::config_model::ConfigModel;
use crate::feature_pack::FeaturePackConfig;
use crate::feature_spec::FeatureSpec;
use crate::location::Location;

/// File name of the metadata inside a feature-pack artifact directory.
pub const FEATURE_PACK_FILE: &str = "feature-pack.toml";

/// Metadata of one feature-pack build, as found in `feature-pack.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePackSpec {
    pub fpid: Location,
    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<FeaturePackConfig>,
    #[serde(default, rename = "package")]
    pub packages: Vec<PackageSpec>,
    #[serde(default, rename = "config")]
    pub configs: Vec<ConfigModel>,
    #[serde(default, rename = "feature-spec")]
    pub feature_specs: Vec<FeatureSpec>,
}

/// An installable package of a feature-pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageSpec {
    pub name: String,
    #[serde(default = "default_true")]
    pub default: bool,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub optional_requires: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl PackageSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default: true,
            requires: Vec::new(),
            optional_requires: Vec::new(),
        }
    }

    pub fn non_default(name: &str) -> Self {
        Self {
            default: false,
            ..Self::new(name)
        }
    }

    pub fn requiring(mut self, name: &str) -> Self {
        self.requires.push(name.to_string());
        self
    }
}

impl FeaturePackSpec {
    pub fn new(fpid: Location) -> Self {
        Self {
            fpid,
            dependencies: Vec::new(),
            packages: Vec::new(),
            configs: Vec::new(),
            feature_specs: Vec::new(),
        }
    }

    /// Parse a `feature-pack.toml` document.
    pub fn parse_toml(content: &str) -> GalleyResult<Self> {
        let spec: Self = toml::from_str(content).map_err(|e| GalleyError::Config {
            message: format!("Failed to parse feature-pack spec: {e}"),
        })?;
        if !spec.fpid.is_resolved() {
            return Err(GalleyError::Config {
                message: format!("Feature-pack id {} has no build", spec.fpid),
            });
        }
        Ok(spec)
    }

    /// Load the spec from an artifact directory or directly from a file.
    pub fn from_path(path: &Path) -> GalleyResult<Self> {
        let file = if path.is_dir() {
            path.join(FEATURE_PACK_FILE)
        } else {
            path.to_path_buf()
        };
        let content = galley_util::fs::read_to_string(&file)?;
        Self::parse_toml(&content)
    }

    pub fn to_toml(&self) -> GalleyResult<String> {
        toml::to_string_pretty(self).map_err(|e| GalleyError::Config {
            message: format!("Failed to serialize feature-pack spec: {e}"),
        })
    }

    pub fn with_dependency(mut self, dep: FeaturePackConfig) -> Self {
        self.dependencies.push(dep);
        self
    }

    pub fn with_package(mut self, package: PackageSpec) -> Self {
        self.packages.push(package);
        self
    }

    pub fn with_config(mut self, config: ConfigModel) -> Self {
        self.configs.push(config);
        self
    }

    pub fn with_feature_spec(mut self, spec: FeatureSpec) -> Self {
        self.feature_specs.push(spec);
        self
    }

    pub fn package(&self, name: &str) -> Option<&PackageSpec> {
        self.packages.iter().find(|p| p.name == name)
    }

    pub fn default_packages(&self) -> impl Iterator<Item = &PackageSpec> {
        self.packages.iter().filter(|p| p.default)
    }

    pub fn config(&self, id: &ConfigId) -> Option<&ConfigModel> {
        self.configs.iter().find(|c| &c.id() == id)
    }

    pub fn feature_spec(&self, name: &str) -> Option<&FeatureSpec> {
        self.feature_specs.iter().find(|s| s.name == name)
    }
}
