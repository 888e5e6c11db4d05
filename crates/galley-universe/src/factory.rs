//! Universe factories turn a [`UniverseSpec`] into a [`UniverseCatalog`].

use std::collections::BTreeMap;

use galley_core::location::UniverseSpec;
use galley_util::errors::{GalleyError, GalleyResult};

use crate::catalog::{UniverseCatalog, UNIVERSE_FILE};
use crate::repository::{ArtifactCoords, ArtifactTransport};
use crate::version::BuildVersion;

/// Builds catalogs for the universes whose spec names this factory.
pub trait UniverseFactory: Send + Sync {
    /// The `factory` part of the universe specs this factory handles.
    fn factory_id(&self) -> &str;

    fn create(
        &self,
        spec: &UniverseSpec,
        transport: &dyn ArtifactTransport,
    ) -> GalleyResult<UniverseCatalog>;
}

/// Factory id of the universe used when nothing else is configured.
pub const IMPLICIT_FACTORY: &str = "implicit";

/// Factory id of universes published as an artifact holding `universe.toml`.
pub const REPO_FACTORY: &str = "repo";

/// Serves an open catalog: producer `p` is the artifact `p:p`.
#[derive(Debug, Default)]
pub struct ImplicitUniverseFactory;

impl UniverseFactory for ImplicitUniverseFactory {
    fn factory_id(&self) -> &str {
        IMPLICIT_FACTORY
    }

    fn create(
        &self,
        spec: &UniverseSpec,
        _transport: &dyn ArtifactTransport,
    ) -> GalleyResult<UniverseCatalog> {
        Ok(UniverseCatalog::open(spec.clone()))
    }
}

/// Reads the catalog from a universe artifact located at `group:artifact[:version]`.
///
/// Without a version the highest published one is used.
#[derive(Debug, Default)]
pub struct RepoUniverseFactory;

impl UniverseFactory for RepoUniverseFactory {
    fn factory_id(&self) -> &str {
        REPO_FACTORY
    }

    fn create(
        &self,
        spec: &UniverseSpec,
        transport: &dyn ArtifactTransport,
    ) -> GalleyResult<UniverseCatalog> {
        let location = spec.location().ok_or_else(|| GalleyError::UnresolvableArtifact {
            artifact: spec.to_string(),
            reason: "a repo universe needs a group:artifact location".to_string(),
        })?;
        let (group, artifact, version) = ArtifactCoords::parse(location)?;
        let version = match version {
            Some(v) => v,
            None => transport
                .versions(&group, &artifact)?
                .iter()
                .map(|v| BuildVersion::parse(v))
                .max()
                .map(|v| v.original)
                .ok_or_else(|| GalleyError::UnresolvableArtifact {
                    artifact: spec.to_string(),
                    reason: format!("no published versions of {group}:{artifact}"),
                })?,
        };

        let coords = ArtifactCoords::new(&group, &artifact, &version);
        let dir = transport.resolve(&coords)?;
        tracing::debug!("Loading universe {spec} from {coords}");
        let content = galley_util::fs::read_to_string(&dir.join(UNIVERSE_FILE))?;
        UniverseCatalog::parse_toml(spec.clone(), &content)
    }
}

/// Serves catalogs registered up front, keyed by universe location.
#[derive(Debug)]
pub struct StaticUniverseFactory {
    id: String,
    catalogs: BTreeMap<Option<String>, UniverseCatalog>,
}

impl StaticUniverseFactory {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            catalogs: BTreeMap::new(),
        }
    }

    pub fn with_catalog(mut self, location: Option<&str>, catalog: UniverseCatalog) -> Self {
        self.catalogs.insert(location.map(str::to_string), catalog);
        self
    }
}

impl UniverseFactory for StaticUniverseFactory {
    fn factory_id(&self) -> &str {
        &self.id
    }

    fn create(
        &self,
        spec: &UniverseSpec,
        _transport: &dyn ArtifactTransport,
    ) -> GalleyResult<UniverseCatalog> {
        self.catalogs
            .get(&spec.location().map(str::to_string))
            .map(|catalog| catalog.clone().with_spec(spec.clone()))
            .ok_or_else(|| GalleyError::UnresolvableArtifact {
                artifact: spec.to_string(),
                reason: "no such universe".to_string(),
            })
    }
}
