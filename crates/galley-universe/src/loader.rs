//! Loading feature-pack metadata for resolved locations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use galley_core::feature_pack_spec::FeaturePackSpec;
use galley_core::location::{Fpid, Location};
use galley_util::errors::{GalleyError, GalleyResult};

use crate::resolver::UniverseResolver;

/// Supplies the [`FeaturePackSpec`] of a build-qualified location.
pub trait FeaturePackLoader {
    fn load(&self, location: &Location) -> GalleyResult<Arc<FeaturePackSpec>>;
}

/// Reads `feature-pack.toml` from the artifact a universe resolves to.
pub struct TomlFeaturePackLoader {
    universes: Arc<UniverseResolver>,
    loaded: Mutex<HashMap<Fpid, Arc<FeaturePackSpec>>>,
}

impl TomlFeaturePackLoader {
    pub fn new(universes: Arc<UniverseResolver>) -> Self {
        Self {
            universes,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn universes(&self) -> &UniverseResolver {
        &self.universes
    }
}

impl FeaturePackLoader for TomlFeaturePackLoader {
    fn load(&self, location: &Location) -> GalleyResult<Arc<FeaturePackSpec>> {
        let fpid = location.fpid();
        let mut loaded = self.loaded.lock().map_err(|_| GalleyError::Generic {
            message: "feature-pack cache is poisoned".to_string(),
        })?;
        if let Some(spec) = loaded.get(&fpid) {
            return Ok(Arc::clone(spec));
        }

        let dir = self.universes.resolve(location)?;
        let spec = FeaturePackSpec::from_path(&dir)?;
        if spec.fpid.producer() != location.producer() || spec.fpid.build() != location.build() {
            return Err(GalleyError::UnresolvableArtifact {
                artifact: location.to_string(),
                reason: format!("artifact describes feature-pack {}", spec.fpid),
            });
        }
        tracing::debug!("Loaded feature-pack {fpid} from {}", dir.display());
        let spec = Arc::new(spec);
        loaded.insert(fpid, Arc::clone(&spec));
        Ok(spec)
    }
}
