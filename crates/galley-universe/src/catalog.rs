//! Universe catalogs: producers, their channels and frequencies.

use serde::Deserialize;
use std::collections::BTreeMap;

use galley_core::location::UniverseSpec;
use galley_util::errors::{GalleyError, GalleyResult};

use crate::repository::ArtifactCoords;
use crate::version::{BuildVersion, Stability, VersionRange};

/// File name of a catalog inside a universe artifact.
pub const UNIVERSE_FILE: &str = "universe.toml";

/// A queryable catalog of producers for one universe.
#[derive(Debug, Clone)]
pub struct UniverseCatalog {
    spec: UniverseSpec,
    producers: BTreeMap<String, ProducerEntry>,
    /// Open catalogs answer for any producer name.
    open: bool,
}

/// One producer of a universe and where its builds live.
#[derive(Debug, Clone)]
pub struct ProducerEntry {
    pub name: String,
    pub group: String,
    pub artifact: String,
    pub frequencies: Vec<String>,
    pub default_frequency: Option<String>,
    pub default_channel: Option<String>,
    channels: BTreeMap<String, Channel>,
    open: bool,
}

/// A stream of builds of one producer.
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    range: Option<VersionRange>,
    prefix_match: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CatalogFile {
    #[serde(default)]
    producers: BTreeMap<String, RawProducer>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawProducer {
    group: Option<String>,
    artifact: Option<String>,
    #[serde(default)]
    frequencies: Vec<String>,
    default_frequency: Option<String>,
    default_channel: Option<String>,
    #[serde(default)]
    channels: BTreeMap<String, RawChannel>,
}

#[derive(Deserialize)]
struct RawChannel {
    versions: Option<String>,
}

impl UniverseCatalog {
    pub fn new(spec: UniverseSpec) -> Self {
        Self {
            spec,
            producers: BTreeMap::new(),
            open: false,
        }
    }

    /// A catalog where every producer `p` lives at `p:p` and channels are build prefixes.
    pub fn open(spec: UniverseSpec) -> Self {
        Self {
            open: true,
            ..Self::new(spec)
        }
    }

    /// Parse the contents of a `universe.toml`.
    pub fn parse_toml(spec: UniverseSpec, content: &str) -> GalleyResult<Self> {
        let file: CatalogFile = toml::from_str(content).map_err(|e| GalleyError::Config {
            message: format!("Failed to parse universe catalog for {spec}: {e}"),
        })?;
        let mut catalog = Self::new(spec);
        for (name, raw) in file.producers {
            let mut entry = ProducerEntry::new(
                &name,
                raw.group.as_deref().unwrap_or(&name),
                raw.artifact.as_deref().unwrap_or(&name),
            );
            entry.default_frequency = raw.default_frequency;
            entry.default_channel = raw.default_channel;
            for frequency in &raw.frequencies {
                if Stability::parse(frequency).is_none() {
                    return Err(GalleyError::Config {
                        message: format!("Producer {name} declares unknown frequency '{frequency}'"),
                    });
                }
            }
            entry.frequencies = raw.frequencies;
            for (channel, raw_channel) in raw.channels {
                let range = match raw_channel.versions {
                    Some(text) => Some(VersionRange::parse(&text).ok_or_else(|| {
                        GalleyError::Config {
                            message: format!(
                                "Channel {name}:{channel} has an invalid version range '{text}'"
                            ),
                        }
                    })?),
                    None => None,
                };
                entry = entry.with_channel(Channel::ranged(&channel, range));
            }
            catalog = catalog.with_producer(entry);
        }
        Ok(catalog)
    }

    pub fn with_producer(mut self, producer: ProducerEntry) -> Self {
        self.producers.insert(producer.name.clone(), producer);
        self
    }

    pub fn spec(&self) -> &UniverseSpec {
        &self.spec
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn producer(&self, name: &str) -> Option<ProducerEntry> {
        match self.producers.get(name) {
            Some(entry) => Some(entry.clone()),
            None if self.open => {
                let mut entry = ProducerEntry::new(name, name, name);
                entry.open = true;
                Some(entry)
            }
            None => None,
        }
    }

    pub fn producer_names(&self) -> impl Iterator<Item = &str> {
        self.producers.keys().map(String::as_str)
    }

    /// The same catalog answering for another spec.
    pub fn with_spec(mut self, spec: UniverseSpec) -> Self {
        self.spec = spec;
        self
    }
}

impl ProducerEntry {
    pub fn new(name: &str, group: &str, artifact: &str) -> Self {
        Self {
            name: name.to_string(),
            group: group.to_string(),
            artifact: artifact.to_string(),
            frequencies: Vec::new(),
            default_frequency: None,
            default_channel: None,
            channels: BTreeMap::new(),
            open: false,
        }
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channels.insert(channel.name.clone(), channel);
        self
    }

    pub fn with_default_channel(mut self, channel: &str) -> Self {
        self.default_channel = Some(channel.to_string());
        self
    }

    pub fn with_frequencies(mut self, frequencies: &[&str], default: Option<&str>) -> Self {
        self.frequencies = frequencies.iter().map(|f| f.to_string()).collect();
        self.default_frequency = default.map(str::to_string);
        self
    }

    pub fn channel(&self, name: &str) -> Option<Channel> {
        match self.channels.get(name) {
            Some(channel) => Some(channel.clone()),
            None if self.open => Some(Channel::prefixed(name)),
            None => None,
        }
    }

    pub fn coords(&self, build: &str) -> ArtifactCoords {
        ArtifactCoords::new(&self.group, &self.artifact, build)
    }

    /// Check that `frequency` is one this producer publishes.
    pub fn stability_for(&self, frequency: &str) -> GalleyResult<Stability> {
        if !self.frequencies.is_empty() && !self.frequencies.iter().any(|f| f == frequency) {
            return Err(GalleyError::UnresolvableArtifact {
                artifact: self.name.clone(),
                reason: format!(
                    "frequency '{frequency}' is not one of [{}]",
                    self.frequencies.join(", ")
                ),
            });
        }
        Stability::parse(frequency).ok_or_else(|| GalleyError::UnresolvableArtifact {
            artifact: self.name.clone(),
            reason: format!("unknown frequency '{frequency}'"),
        })
    }
}

impl Channel {
    /// A channel bounded by an optional version range; no range admits every build.
    pub fn ranged(name: &str, range: Option<VersionRange>) -> Self {
        Self {
            name: name.to_string(),
            range,
            prefix_match: false,
        }
    }

    /// A channel admitting builds equal to its name or starting with `name.` / `name-`.
    pub fn prefixed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            range: None,
            prefix_match: true,
        }
    }

    pub fn admits(&self, build: &str) -> bool {
        if self.prefix_match {
            return build == self.name
                || build
                    .strip_prefix(self.name.as_str())
                    .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('-'));
        }
        match &self.range {
            Some(range) => range.contains(&BuildVersion::parse(build)),
            None => true,
        }
    }

    /// Highest admitted build whose stability is at least `min`.
    pub fn latest<'a>(
        &self,
        builds: impl IntoIterator<Item = &'a String>,
        min: Option<Stability>,
    ) -> Option<String> {
        builds
            .into_iter()
            .filter(|b| self.admits(b))
            .map(|b| BuildVersion::parse(b.as_str()))
            .filter(|v| min.map_or(true, |m| v.stability() >= m))
            .max()
            .map(|v| v.original)
    }
}
