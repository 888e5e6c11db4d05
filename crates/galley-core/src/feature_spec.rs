//! Feature specs: parameters, references, capabilities and branch annotations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The schema of a feature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    #[serde(default, rename = "param")]
    pub params: Vec<FeatureParam>,
    #[serde(default, rename = "ref")]
    pub refs: Vec<FeatureReference>,
    #[serde(default)]
    pub provides: Vec<CapabilitySpec>,
    #[serde(default)]
    pub requires: Vec<CapabilitySpec>,
    #[serde(default)]
    pub annotations: BranchAnnotations,
}

impl FeatureSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Id parameters in declaration order.
    pub fn id_params(&self) -> impl Iterator<Item = &FeatureParam> {
        self.params.iter().filter(|p| p.id)
    }

    pub fn param(&self, name: &str) -> Option<&FeatureParam> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn with_param(mut self, param: FeatureParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_ref(mut self, reference: FeatureReference) -> Self {
        self.refs.push(reference);
        self
    }

    pub fn provides(mut self, capability: &str) -> Self {
        self.provides.push(CapabilitySpec::new(capability));
        self
    }

    pub fn requires(mut self, capability: &str) -> Self {
        self.requires.push(CapabilitySpec::new(capability));
        self
    }
}

/// A feature parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureParam {
    pub name: String,
    #[serde(default)]
    pub id: bool,
    #[serde(default)]
    pub nillable: bool,
    #[serde(default)]
    pub default: Option<String>,
}

impl FeatureParam {
    pub fn id(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: true,
            ..Default::default()
        }
    }

    pub fn nillable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nillable: true,
            ..Default::default()
        }
    }

    pub fn with_default(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            default: Some(value.to_string()),
            ..Default::default()
        }
    }
}

/// A reference from a feature to a feature of another spec.
///
/// Normally the referenced feature (the parent) is ordered first; with
/// `parent_follows_child` the referring feature goes first instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FeatureReference {
    /// Name of the referenced spec.
    pub feature: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nillable: bool,
    #[serde(default)]
    pub parent_follows_child: bool,
    /// Local parameter to target id parameter. Unmapped target id
    /// parameters are taken from the local parameter of the same name.
    #[serde(default)]
    pub mappings: BTreeMap<String, String>,
}

impl FeatureReference {
    pub fn to(feature: &str) -> Self {
        Self {
            feature: feature.to_string(),
            ..Default::default()
        }
    }

    pub fn map(mut self, local: &str, target: &str) -> Self {
        self.mappings.insert(local.to_string(), target.to_string());
        self
    }

    pub fn nillable(mut self) -> Self {
        self.nillable = true;
        self
    }

    pub fn reversed(mut self) -> Self {
        self.parent_follows_child = true;
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.feature)
    }

    /// Local parameter supplying the target's id parameter `target_param`.
    pub fn local_param_for<'a>(&'a self, target_param: &'a str) -> &'a str {
        self.mappings
            .iter()
            .find(|(_, target)| target.as_str() == target_param)
            .map(|(local, _)| local.as_str())
            .unwrap_or(target_param)
    }
}

/// A capability string with `$param` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawCapability")]
pub struct CapabilitySpec {
    pub name: String,
    /// An optional requirement is dropped when nothing provides it.
    pub optional: bool,
}

impl CapabilitySpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            optional: false,
        }
    }

    pub fn optional(name: &str) -> Self {
        Self {
            name: name.to_string(),
            optional: true,
        }
    }

    /// Substitute `$param` placeholders. Returns `None` if a referenced
    /// parameter has no value.
    pub fn resolve(&self, params: &BTreeMap<String, String>) -> Option<String> {
        let mut out = String::with_capacity(self.name.len());
        let mut chars = self.name.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            let mut param = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_alphanumeric() || next == '_' || next == '-' {
                    param.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if param.is_empty() {
                out.push('$');
            } else {
                out.push_str(params.get(&param)?);
            }
        }
        Some(out)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCapability {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        optional: bool,
    },
}

impl From<RawCapability> for CapabilitySpec {
    fn from(raw: RawCapability) -> Self {
        match raw {
            RawCapability::Name(name) => Self::new(&name),
            RawCapability::Detailed { name, optional } => Self { name, optional },
        }
    }
}

/// Branch-control annotations of a spec. Unset values fall back to the
/// config's policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BranchAnnotations {
    #[serde(default)]
    pub parent_children_branch: Option<bool>,
    #[serde(default)]
    pub spec_branch: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn capability_substitution() {
        let cap = CapabilitySpec::new("org.net.interface.$name");
        assert_eq!(
            cap.resolve(&params(&[("name", "public")])).as_deref(),
            Some("org.net.interface.public")
        );
        assert!(cap.resolve(&params(&[])).is_none());
    }

    #[test]
    fn capability_with_several_placeholders() {
        let cap = CapabilitySpec::new("$host.server.$name");
        assert_eq!(
            cap.resolve(&params(&[("host", "h1"), ("name", "s1")])).as_deref(),
            Some("h1.server.s1")
        );
    }

    #[test]
    fn capability_from_string_or_table() {
        let toml = r#"
name = "socket"
provides = ["socket.$name"]
requires = [{ name = "interface.$iface", optional = true }]
"#;
        let spec: FeatureSpec = toml::from_str(toml).unwrap();
        assert!(!spec.provides[0].optional);
        assert!(spec.requires[0].optional);
    }

    #[test]
    fn reference_mapping_lookup() {
        let r = FeatureReference::to("profile").map("profile-name", "name");
        assert_eq!(r.local_param_for("name"), "profile-name");
        assert_eq!(r.local_param_for("other"), "other");
        assert_eq!(r.name(), "profile");
    }

    #[test]
    fn id_params_in_order() {
        let spec = FeatureSpec::new("s")
            .with_param(FeatureParam::id("b"))
            .with_param(FeatureParam::nillable("x"))
            .with_param(FeatureParam::id("a"));
        let ids: Vec<&str> = spec.id_params().map(|p| p.name.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
