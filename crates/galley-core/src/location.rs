//! Qualified feature-pack locations: `producer[@factory[(location)]]:channel[/frequency]#build`.
//!
//! A [`Location`] names a feature-pack without contacting any repository. Its
//! identity view, [`Fpid`], ignores the frequency so that two locations that
//! only differ in the release stream they asked for denote the same build.

use std::fmt;

use galley_util::errors::{GalleyError, GalleyResult};
use serde::{Deserialize, Serialize};

const UNIVERSE_START: char = '@';
const UNIVERSE_LOCATION_START: char = '(';
const UNIVERSE_LOCATION_END: char = ')';
const CHANNEL_START: char = ':';
const FREQUENCY_START: char = '/';
const BUILD_START: char = '#';

/// Identifies a universe provider instance: a factory id plus an optional
/// factory-specific location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UniverseSpec {
    factory: String,
    location: Option<String>,
}

impl UniverseSpec {
    pub fn new(factory: impl Into<String>, location: Option<String>) -> Self {
        Self {
            factory: factory.into(),
            location,
        }
    }

    /// Parse `factory` or `factory(location)`.
    pub fn parse(s: &str) -> GalleyResult<Self> {
        let fail = |reason: &str| format_error(s, reason);
        let (factory, location) = match s.find(UNIVERSE_LOCATION_START) {
            Some(open) => {
                if !s.ends_with(UNIVERSE_LOCATION_END) {
                    return Err(fail("universe location is missing its closing ')'"));
                }
                let inner = &s[open + 1..s.len() - 1];
                if inner.is_empty() {
                    return Err(fail("universe location is empty"));
                }
                (&s[..open], Some(inner.to_string()))
            }
            None => {
                if s.contains(UNIVERSE_LOCATION_END) {
                    return Err(fail("unexpected ')' in universe"));
                }
                (s, None)
            }
        };
        if factory.is_empty() {
            return Err(fail("universe factory is empty"));
        }
        Ok(Self::new(factory, location))
    }

    pub fn factory(&self) -> &str {
        &self.factory
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

impl fmt::Display for UniverseSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}({})", self.factory, location),
            None => f.write_str(&self.factory),
        }
    }
}

impl TryFrom<String> for UniverseSpec {
    type Error = GalleyError;

    fn try_from(value: String) -> GalleyResult<Self> {
        Self::parse(&value)
    }
}

impl From<UniverseSpec> for String {
    fn from(value: UniverseSpec) -> Self {
        value.to_string()
    }
}

/// A universe-qualified producer: the key under which builds must converge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProducerSpec {
    pub universe: Option<UniverseSpec>,
    pub producer: String,
}

impl fmt::Display for ProducerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.producer)?;
        if let Some(universe) = &self.universe {
            write!(f, "{UNIVERSE_START}{universe}")?;
        }
        Ok(())
    }
}

/// A feature-pack location, possibly partially resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Location {
    universe: Option<UniverseSpec>,
    producer: String,
    channel: Option<String>,
    frequency: Option<String>,
    build: Option<String>,
}

impl Location {
    /// A location naming only a producer.
    pub fn new(producer: impl Into<String>) -> Self {
        Self {
            universe: None,
            producer: producer.into(),
            channel: None,
            frequency: None,
            build: None,
        }
    }

    /// Parse the textual form, right to left.
    pub fn parse(s: &str) -> GalleyResult<Self> {
        if s.is_empty() {
            return Err(format_error(s, "location is empty"));
        }

        let (head, build) = match s.rfind(BUILD_START) {
            Some(i) => (&s[..i], Some(non_empty(s, &s[i + 1..], "build")?)),
            None => (s, None),
        };

        let mut channel_start = None;
        let mut frequency_start = None;
        for (i, c) in head.char_indices().rev() {
            match c {
                FREQUENCY_START if frequency_start.is_none() => frequency_start = Some(i),
                CHANNEL_START => {
                    channel_start = Some(i);
                    break;
                }
                UNIVERSE_START | UNIVERSE_LOCATION_END => break,
                _ => {}
            }
        }

        let (rest, channel, frequency) = match channel_start {
            Some(start) => {
                let (channel_end, frequency) = match frequency_start {
                    Some(f) => (f, Some(non_empty(s, &head[f + 1..], "frequency")?)),
                    None => (head.len(), None),
                };
                let channel = non_empty(s, &head[start + 1..channel_end], "channel")?;
                (&head[..start], Some(channel), frequency)
            }
            None => (head, None, None),
        };

        let (producer, universe) = match rest.find(UNIVERSE_START) {
            Some(at) => {
                if channel.is_none() {
                    return Err(format_error(
                        s,
                        "a universe must be followed by a ':channel' separator",
                    ));
                }
                let universe = UniverseSpec::parse(&rest[at + 1..]).map_err(|e| match e {
                    GalleyError::LocationFormat { reason, .. } => format_error(s, &reason),
                    other => other,
                })?;
                (&rest[..at], Some(universe))
            }
            None => (rest, None),
        };
        let producer = non_empty(s, producer, "producer")?;

        Ok(Self {
            universe,
            producer,
            channel,
            frequency,
            build,
        })
    }

    pub fn with_universe(mut self, universe: Option<UniverseSpec>) -> Self {
        self.universe = universe;
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_frequency(mut self, frequency: impl Into<String>) -> Self {
        self.frequency = Some(frequency.into());
        self
    }

    pub fn with_build(mut self, build: impl Into<String>) -> Self {
        self.build = Some(build.into());
        self
    }

    pub fn universe(&self) -> Option<&UniverseSpec> {
        self.universe.as_ref()
    }

    pub fn producer(&self) -> &str {
        &self.producer
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn frequency(&self) -> Option<&str> {
        self.frequency.as_deref()
    }

    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    /// Whether the location names a concrete build.
    pub fn is_resolved(&self) -> bool {
        self.build.is_some()
    }

    /// The identity view of this location (frequency dropped).
    pub fn fpid(&self) -> Fpid {
        Fpid {
            universe: self.universe.clone(),
            producer: self.producer.clone(),
            channel: self.channel.clone(),
            build: self.build.clone(),
        }
    }

    pub fn producer_spec(&self) -> ProducerSpec {
        ProducerSpec {
            universe: self.universe.clone(),
            producer: self.producer.clone(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.producer)?;
        if let Some(universe) = &self.universe {
            write!(f, "{UNIVERSE_START}{universe}")?;
        }
        if let Some(channel) = &self.channel {
            write!(f, "{CHANNEL_START}{channel}")?;
            if let Some(frequency) = &self.frequency {
                write!(f, "{FREQUENCY_START}{frequency}")?;
            }
        }
        if let Some(build) = &self.build {
            write!(f, "{BUILD_START}{build}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Location {
    type Err = GalleyError;

    fn from_str(s: &str) -> GalleyResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Location {
    type Error = GalleyError;

    fn try_from(value: String) -> GalleyResult<Self> {
        Self::parse(&value)
    }
}

impl From<Location> for String {
    fn from(value: Location) -> Self {
        value.to_string()
    }
}

/// Feature-pack identity: universe, producer, channel and build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fpid {
    pub universe: Option<UniverseSpec>,
    pub producer: String,
    pub channel: Option<String>,
    pub build: Option<String>,
}

impl Fpid {
    pub fn producer_spec(&self) -> ProducerSpec {
        ProducerSpec {
            universe: self.universe.clone(),
            producer: self.producer.clone(),
        }
    }

    /// A location carrying exactly this identity.
    pub fn location(&self) -> Location {
        Location {
            universe: self.universe.clone(),
            producer: self.producer.clone(),
            channel: self.channel.clone(),
            frequency: None,
            build: self.build.clone(),
        }
    }
}

impl fmt::Display for Fpid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.location().fmt(f)
    }
}

fn non_empty(input: &str, segment: &str, what: &str) -> GalleyResult<String> {
    if segment.is_empty() {
        Err(format_error(input, &format!("{what} is empty")))
    } else {
        Ok(segment.to_string())
    }
}

fn format_error(input: &str, reason: &str) -> GalleyError {
    GalleyError::LocationFormat {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}
