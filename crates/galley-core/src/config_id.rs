use std::fmt;

use galley_util::errors::{GalleyError, GalleyResult};
use serde::{Deserialize, Serialize};

/// Identifies a named configuration: `model/name`.
///
/// Either half may be absent. Used as a pattern, an absent half matches
/// anything; a model without a name identifies a model-only config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfigId {
    pub model: Option<String>,
    pub name: Option<String>,
}

impl ConfigId {
    pub fn new(model: Option<&str>, name: Option<&str>) -> Self {
        Self {
            model: model.map(str::to_string),
            name: name.map(str::to_string),
        }
    }

    /// Parse `model/name`, `model/`, `/name` or `name`.
    pub fn parse(s: &str) -> GalleyResult<Self> {
        let non_empty = |part: &str| (!part.is_empty()).then(|| part.to_string());
        match s.split_once('/') {
            Some((model, name)) => {
                if name.contains('/') {
                    return Err(GalleyError::LocationFormat {
                        input: s.to_string(),
                        reason: "config id contains more than one '/'".to_string(),
                    });
                }
                Ok(Self {
                    model: non_empty(model),
                    name: non_empty(name),
                })
            }
            None if s.is_empty() => Err(GalleyError::LocationFormat {
                input: s.to_string(),
                reason: "config id is empty".to_string(),
            }),
            None => Ok(Self {
                model: None,
                name: Some(s.to_string()),
            }),
        }
    }

    /// A config defined for a model only, inherited by every named config of the model.
    pub fn is_model_only(&self) -> bool {
        self.model.is_some() && self.name.is_none()
    }

    /// Whether `self`, read as a pattern, selects `id`.
    pub fn matches(&self, id: &ConfigId) -> bool {
        let half = |pattern: &Option<String>, value: &Option<String>| match pattern {
            None => true,
            Some(p) => value.as_ref() == Some(p),
        };
        half(&self.model, &id.model) && half(&self.name, &id.name)
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.model, &self.name) {
            (Some(model), Some(name)) => write!(f, "{model}/{name}"),
            (Some(model), None) => write!(f, "{model}/"),
            (None, Some(name)) => f.write_str(name),
            (None, None) => f.write_str("/"),
        }
    }
}

impl TryFrom<String> for ConfigId {
    type Error = GalleyError;

    fn try_from(value: String) -> GalleyResult<Self> {
        Self::parse(&value)
    }
}

impl From<ConfigId> for String {
    fn from(value: ConfigId) -> Self {
        value.to_string()
    }
}
