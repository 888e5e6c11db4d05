use std::collections::BTreeMap;
use std::fmt;

use galley_core::location::ProducerSpec;

/// Identity of a feature within a config: the producer defining its spec,
/// the spec name and the id parameter values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedFeatureId {
    pub producer: ProducerSpec,
    pub spec: String,
    pub params: BTreeMap<String, String>,
}

impl ResolvedFeatureId {
    pub fn new(producer: ProducerSpec, spec: &str) -> Self {
        Self {
            producer,
            spec: spec.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }
}

/// `producer/spec:name=value,other=value`, or `producer/spec` without id
/// parameters.
impl fmt::Display for ResolvedFeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.producer, self.spec)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { ':' } else { ',' };
            write!(f, "{sep}{name}={value}")?;
        }
        Ok(())
    }
}
