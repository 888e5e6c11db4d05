//! Everything an operation needs before it can run the engine.

use std::path::Path;
use std::sync::Arc;

use galley_core::config::GlobalConfig;
use galley_core::location::UniverseSpec;
use galley_core::provisioning::ProvisioningConfig;
use galley_resolver::engine::{self, ProvisioningPlan};
use galley_universe::loader::TomlFeaturePackLoader;
use galley_universe::repository::ArtifactRepository;
use galley_universe::resolver::UniverseResolver;
use galley_util::errors::GalleyResult;

/// A provisioning config bound to the repository it resolves against.
pub struct ProvisioningContext {
    pub config: ProvisioningConfig,
    universes: Arc<UniverseResolver>,
    loader: TomlFeaturePackLoader,
}

impl ProvisioningContext {
    /// Load `config_path` and open the local repository.
    ///
    /// `repository` overrides the root named by the global config.
    pub fn load(config_path: &Path, repository: Option<&Path>) -> GalleyResult<Self> {
        let global = GlobalConfig::load()?;
        let config = ProvisioningConfig::from_path(config_path)?;
        Self::new(&global, config, repository)
    }

    pub fn new(
        global: &GlobalConfig,
        config: ProvisioningConfig,
        repository: Option<&Path>,
    ) -> GalleyResult<Self> {
        let root = repository
            .map(Path::to_path_buf)
            .unwrap_or_else(|| global.repository_root());
        tracing::debug!("Using repository {}", root.display());
        let repo = Arc::new(ArtifactRepository::new(&global.repository.name, &root));

        let mut universes = UniverseResolver::new(repo);
        if let Some(default) = &global.default_universe {
            universes = universes.with_default_universe(UniverseSpec::parse(default)?);
        }
        let universes = Arc::new(universes);
        let loader = TomlFeaturePackLoader::new(Arc::clone(&universes));
        Ok(Self {
            config,
            universes,
            loader,
        })
    }

    /// Resolve the config with the engine its format version selects.
    pub fn plan(&self) -> GalleyResult<ProvisioningPlan> {
        tracing::info!(
            "Resolving {} feature-pack(s) (format {})",
            self.config.feature_packs.len(),
            self.config.format_version
        );
        engine::resolve(&self.config, &self.universes, &self.loader)
    }
}
