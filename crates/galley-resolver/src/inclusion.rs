//! Effective package and config sets of resolved feature-packs.
//!
//! Per incoming edge:
//!
//! ```text
//! packages = (inherit-packages ? defaults : {}) + included - excluded
//! ```
//!
//! closed over required package dependencies. Edges into the same node
//! union their sets. Configs follow the same rule with [`ConfigId`]
//! patterns, again scoped to the edge that declares them.

use std::collections::BTreeSet;

use petgraph::graph::NodeIndex;

use galley_core::config_id::ConfigId;
use galley_core::feature_pack::FeaturePackConfig;
use galley_core::feature_pack_spec::FeaturePackSpec;
use galley_core::location::Fpid;
use galley_util::errors::{GalleyError, GalleyResult};

use crate::graph::FeaturePackGraph;

/// What gets installed from one resolved feature-pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledFeaturePack {
    pub node: NodeIndex,
    pub fpid: Fpid,
    pub packages: BTreeSet<String>,
    /// Configs this feature-pack contributes, in its declaration order.
    pub configs: Vec<ConfigId>,
}

/// Effective sets of every node, in the graph's dependency-first order.
pub fn installed(graph: &FeaturePackGraph) -> GalleyResult<Vec<InstalledFeaturePack>> {
    let mut out = Vec::with_capacity(graph.len());
    for idx in graph.indices() {
        let node = graph.node(idx);
        let mut packages = BTreeSet::new();
        let mut config_ids = BTreeSet::new();
        for edge in &node.edges {
            packages.extend(edge_packages(&node.spec, &edge.config)?);
            config_ids.extend(edge_configs(&node.spec, &edge.config));
        }
        if packages.is_empty() {
            tracing::debug!("{} installs no packages", node.fpid);
        }
        let configs = node
            .spec
            .configs
            .iter()
            .map(|c| c.id())
            .filter(|id| config_ids.contains(id))
            .collect();
        out.push(InstalledFeaturePack {
            node: idx,
            fpid: node.fpid.clone(),
            packages,
            configs,
        });
    }
    Ok(out)
}

/// Packages one edge selects from a feature-pack.
pub fn edge_packages(
    spec: &FeaturePackSpec,
    edge: &FeaturePackConfig,
) -> GalleyResult<BTreeSet<String>> {
    let rule_error = |message: String| GalleyError::InclusionRule {
        edge: edge.location().to_string(),
        message,
    };

    for name in edge.included_packages() {
        if spec.package(name).is_none() {
            return Err(rule_error(format!(
                "package {name} is not defined by {}",
                spec.fpid
            )));
        }
    }

    let mut selected: BTreeSet<String> = if edge.inherit_packages() {
        spec.default_packages().map(|p| p.name.clone()).collect()
    } else {
        BTreeSet::new()
    };
    selected.extend(edge.included_packages().iter().cloned());
    selected.retain(|p| !edge.excluded_packages().contains(p));

    let mut pending: Vec<String> = selected.iter().cloned().collect();
    while let Some(name) = pending.pop() {
        let Some(package) = spec.package(&name) else {
            continue;
        };
        for required in &package.requires {
            if edge.excluded_packages().contains(required) {
                return Err(rule_error(format!(
                    "package {name} requires excluded package {required}"
                )));
            }
            if spec.package(required).is_none() {
                return Err(rule_error(format!(
                    "package {name} requires unknown package {required}"
                )));
            }
            if selected.insert(required.clone()) {
                pending.push(required.clone());
            }
        }
        for optional in &package.optional_requires {
            if edge.excluded_packages().contains(optional) || spec.package(optional).is_none() {
                continue;
            }
            if selected.insert(optional.clone()) {
                pending.push(optional.clone());
            }
        }
    }
    Ok(selected)
}

/// Configs one edge selects from a feature-pack.
///
/// An exact include beats an exclude pattern, which beats an include
/// pattern, which beats the inherited defaults.
pub fn edge_configs(spec: &FeaturePackSpec, edge: &FeaturePackConfig) -> BTreeSet<ConfigId> {
    let mut selected = BTreeSet::new();
    for model in &spec.configs {
        let id = model.id();
        let keep = if edge.included_configs().contains(&id) {
            true
        } else if edge.excluded_configs().iter().any(|p| p.matches(&id)) {
            false
        } else if edge.included_configs().iter().any(|p| p.matches(&id)) {
            true
        } else {
            edge.inherit_configs() && model.default
        };
        if keep {
            selected.insert(id);
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use galley_core::config_model::ConfigModel;
    use galley_core::feature_pack_spec::PackageSpec;
    use galley_core::location::Location;

    fn spec() -> FeaturePackSpec {
        let mut non_default = ConfigModel::new(Some("standalone"), Some("ha"));
        non_default.default = false;
        FeaturePackSpec::new(Location::parse("fp3:1#1.0.1").unwrap())
            .with_package(PackageSpec::new("p1"))
            .with_package(PackageSpec::new("p2"))
            .with_package(PackageSpec::non_default("p3"))
            .with_config(ConfigModel::new(Some("standalone"), Some("main")))
            .with_config(ConfigModel::new(Some("domain"), Some("main")))
            .with_config(non_default)
    }

    fn edge() -> galley_core::feature_pack::FeaturePackConfigBuilder {
        FeaturePackConfig::builder(Location::parse("fp3:1#1.0.1").unwrap())
    }

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn defaults_plus_included_minus_excluded() {
        let e = edge()
            .exclude_package("p2")
            .include_package("p3")
            .build()
            .unwrap();
        assert_eq!(names(&edge_packages(&spec(), &e).unwrap()), vec!["p1", "p3"]);
    }

    #[test]
    fn no_inherited_packages() {
        let e = edge().inherit_packages(false).build().unwrap();
        assert!(edge_packages(&spec(), &e).unwrap().is_empty());
    }

    #[test]
    fn unknown_included_package() {
        let e = edge().include_package("p9").build().unwrap();
        let err = edge_packages(&spec(), &e).unwrap_err();
        assert!(matches!(err, GalleyError::InclusionRule { .. }));
    }

    #[test]
    fn config_patterns() {
        let e = edge()
            .exclude_config(ConfigId::parse("standalone/").unwrap())
            .include_config(ConfigId::parse("standalone/ha").unwrap())
            .build()
            .unwrap();
        let ids: Vec<String> = edge_configs(&spec(), &e).iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["domain/main", "standalone/ha"]);

        let none = edge().inherit_configs(false).build().unwrap();
        assert!(edge_configs(&spec(), &none).is_empty());
    }
}
