//! Resolution of locations against universes.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use galley_core::location::{Location, UniverseSpec};
use galley_util::errors::{GalleyError, GalleyResult};

use crate::catalog::{Channel, ProducerEntry, UniverseCatalog};
use crate::factory::{
    ImplicitUniverseFactory, RepoUniverseFactory, UniverseFactory, IMPLICIT_FACTORY,
};
use crate::repository::ArtifactTransport;

/// Resolves locations to artifacts through pluggable universe factories.
///
/// Catalogs are created at most once per [`UniverseSpec`] and kept for the
/// lifetime of the resolver.
pub struct UniverseResolver {
    transport: Arc<dyn ArtifactTransport>,
    factories: BTreeMap<String, Box<dyn UniverseFactory>>,
    default_universe: UniverseSpec,
    catalogs: Mutex<HashMap<UniverseSpec, Arc<UniverseCatalog>>>,
}

impl UniverseResolver {
    /// A resolver with the `implicit` and `repo` factories registered and
    /// `implicit` as the default universe.
    pub fn new(transport: Arc<dyn ArtifactTransport>) -> Self {
        Self {
            transport,
            factories: BTreeMap::new(),
            default_universe: UniverseSpec::new(IMPLICIT_FACTORY, None),
            catalogs: Mutex::new(HashMap::new()),
        }
        .with_factory(ImplicitUniverseFactory)
        .with_factory(RepoUniverseFactory)
    }

    /// Register a factory, replacing any with the same id.
    pub fn with_factory(mut self, factory: impl UniverseFactory + 'static) -> Self {
        self.factories
            .insert(factory.factory_id().to_string(), Box::new(factory));
        self
    }

    pub fn with_default_universe(mut self, spec: UniverseSpec) -> Self {
        self.default_universe = spec;
        self
    }

    pub fn default_universe(&self) -> &UniverseSpec {
        &self.default_universe
    }

    pub fn transport(&self) -> &dyn ArtifactTransport {
        self.transport.as_ref()
    }

    /// The catalog for `spec`, created through its factory on first use.
    pub fn catalog(&self, spec: &UniverseSpec) -> GalleyResult<Arc<UniverseCatalog>> {
        let mut catalogs = self.catalogs.lock().map_err(|_| GalleyError::Generic {
            message: "universe catalog cache is poisoned".to_string(),
        })?;
        if let Some(catalog) = catalogs.get(spec) {
            return Ok(Arc::clone(catalog));
        }

        let factory = self
            .factories
            .get(spec.factory())
            .ok_or_else(|| GalleyError::UnresolvableArtifact {
                artifact: spec.to_string(),
                reason: format!("no universe factory named '{}'", spec.factory()),
            })?;
        tracing::debug!("Creating catalog for universe {spec}");
        let catalog = Arc::new(factory.create(spec, self.transport.as_ref())?);
        catalogs.insert(spec.clone(), Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Number of catalogs created so far.
    pub fn cached_catalogs(&self) -> usize {
        self.catalogs.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Resolve a build-qualified location to the local artifact directory.
    pub fn resolve(&self, location: &Location) -> GalleyResult<PathBuf> {
        let (producer, channel) = self.lookup(location)?;
        let build = location
            .build()
            .ok_or_else(|| unresolvable(location, "no build given"))?;
        if let Some(channel) = channel {
            if !channel.admits(build) {
                return Err(unresolvable(
                    location,
                    &format!("build {build} is not part of channel {}", channel.name),
                ));
            }
        }
        self.transport
            .resolve(&producer.coords(build))
            .map_err(|e| match e {
                GalleyError::UnresolvableArtifact { reason, .. } => unresolvable(location, &reason),
                other => other,
            })
    }

    /// The highest build of the location's channel, honouring its frequency.
    ///
    /// The returned location carries the channel that was used and the build.
    pub fn resolve_latest_build(&self, location: &Location) -> GalleyResult<Location> {
        let (producer, channel) = self.lookup(location)?;
        let channel =
            channel.ok_or_else(|| unresolvable(location, "no channel to pick a build from"))?;
        let min = location
            .frequency()
            .or(producer.default_frequency.as_deref())
            .map(|f| producer.stability_for(f))
            .transpose()?;

        let builds = self.transport.versions(&producer.group, &producer.artifact)?;
        let latest = channel.latest(&builds, min).ok_or_else(|| {
            unresolvable(
                location,
                &format!("channel {} has no matching builds", channel.name),
            )
        })?;
        tracing::debug!("Latest build of {location} is {latest}");
        Ok(location
            .clone()
            .with_channel(channel.name.as_str())
            .with_build(latest))
    }

    /// The channel a location's build would be picked from, if any.
    pub fn channel_for(&self, location: &Location) -> GalleyResult<Option<String>> {
        let (_, channel) = self.lookup(location)?;
        Ok(channel.map(|c| c.name))
    }

    fn lookup(&self, location: &Location) -> GalleyResult<(ProducerEntry, Option<Channel>)> {
        let universe = location.universe().unwrap_or(&self.default_universe);
        let catalog = self.catalog(universe)?;
        let producer = catalog.producer(location.producer()).ok_or_else(|| {
            unresolvable(
                location,
                &format!("producer is not in universe {universe}"),
            )
        })?;
        let channel = match location.channel().or(producer.default_channel.as_deref()) {
            Some(name) => Some(producer.channel(name).ok_or_else(|| {
                unresolvable(
                    location,
                    &format!("producer {} has no channel {name}", producer.name),
                )
            })?),
            None => None,
        };
        Ok((producer, channel))
    }
}

fn unresolvable(location: &Location, reason: &str) -> GalleyError {
    GalleyError::UnresolvableArtifact {
        artifact: location.to_string(),
        reason: reason.to_string(),
    }
}
