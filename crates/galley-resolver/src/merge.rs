//! Merging config contributions into resolved configs.
//!
//! Every installed feature-pack contributes the configs it selected, in
//! dependency-first order, and the provisioning config contributes last.
//! A model-only contribution (`model/`) is layered underneath every named
//! config of that model.

use std::collections::BTreeMap;

use petgraph::graph::NodeIndex;

use galley_core::config_id::ConfigId;
use galley_core::config_model::{ConfigModel, FeatureConfig, FeatureExclusion};
use galley_core::feature_spec::FeatureSpec;
use galley_core::location::Fpid;
use galley_core::provisioning::ProvisioningConfig;
use galley_util::errors::{GalleyError, GalleyResult};

use crate::graph::FeaturePackGraph;
use crate::inclusion::InstalledFeaturePack;

/// A feature config together with the spec it instantiates.
#[derive(Debug, Clone)]
pub struct ConfiguredFeature {
    /// Feature-pack that defines the spec.
    pub fpid: Fpid,
    pub spec: FeatureSpec,
    pub config: FeatureConfig,
}

/// A named config with every contribution applied.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub id: ConfigId,
    pub props: BTreeMap<String, String>,
    pub features: Vec<ConfiguredFeature>,
    /// Every exclusion applied while merging, so references to removed
    /// features can be told apart from dangling ones.
    pub excluded: Vec<FeatureExclusion>,
}

impl ResolvedConfig {
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.props.get(key).map(|v| v.eq_ignore_ascii_case("true"))
    }
}

struct Contribution<'a> {
    source: Option<NodeIndex>,
    model: &'a ConfigModel,
}

/// Merge every contribution into one [`ResolvedConfig`] per named config,
/// in order of first appearance.
pub fn merge_configs(
    graph: &FeaturePackGraph,
    installed: &[InstalledFeaturePack],
    provisioning: &ProvisioningConfig,
) -> GalleyResult<Vec<ResolvedConfig>> {
    let mut contributions = Vec::new();
    for pack in installed {
        let spec = &graph.node(pack.node).spec;
        for id in &pack.configs {
            if let Some(model) = spec.config(id) {
                contributions.push(Contribution {
                    source: Some(pack.node),
                    model,
                });
            }
        }
    }
    contributions.extend(provisioning.configs.iter().map(|model| Contribution {
        source: None,
        model,
    }));

    let mut named: Vec<ConfigId> = Vec::new();
    for contribution in &contributions {
        let id = contribution.model.id();
        if !id.is_model_only() && !named.contains(&id) {
            named.push(id);
        }
    }

    let mut out = Vec::with_capacity(named.len());
    for id in named {
        let model_layers = contributions
            .iter()
            .filter(|c| c.model.id().is_model_only() && c.model.model == id.model);
        let own_layers = contributions.iter().filter(|c| c.model.id() == id);

        let mut props = BTreeMap::new();
        let mut features: Vec<ConfiguredFeature> = Vec::new();
        let mut excluded = Vec::new();
        for layer in model_layers.chain(own_layers) {
            features.retain(|f| !layer.model.excludes.iter().any(|x| x.matches(&f.config)));
            excluded.extend(layer.model.excludes.iter().cloned());
            props.extend(layer.model.props.clone());
            for feature in &layer.model.features {
                let (fpid, spec) = find_spec(graph, layer.source, feature, &id)?;
                features.push(ConfiguredFeature {
                    fpid,
                    spec,
                    config: feature.clone(),
                });
            }
        }
        tracing::debug!("Config {id} has {} feature(s)", features.len());
        out.push(ResolvedConfig {
            id,
            props,
            features,
            excluded,
        });
    }
    Ok(out)
}

/// Locate the spec a feature instantiates: its explicit origin, then the
/// contributing feature-pack, then that pack's dependencies, then any
/// installed feature-pack.
fn find_spec(
    graph: &FeaturePackGraph,
    source: Option<NodeIndex>,
    feature: &FeatureConfig,
    config: &ConfigId,
) -> GalleyResult<(Fpid, FeatureSpec)> {
    let error = |message: String| GalleyError::Arrangement {
        config: config.to_string(),
        message,
    };
    let defined_by = |idx: NodeIndex| {
        let node = graph.node(idx);
        node.spec
            .feature_spec(&feature.spec)
            .map(|spec| (node.fpid.clone(), spec.clone()))
    };

    if let Some(origin) = &feature.origin {
        let idx = graph.find_producer(origin).ok_or_else(|| {
            error(format!(
                "origin {origin} of feature {} is not installed",
                feature.spec
            ))
        })?;
        return defined_by(idx).ok_or_else(|| {
            error(format!(
                "{} does not define feature spec {}",
                graph.node(idx).fpid,
                feature.spec
            ))
        });
    }

    let mut scopes: Vec<Vec<NodeIndex>> = Vec::new();
    if let Some(source) = source {
        let mut reachable = graph.reachable_from(source);
        let deps = reachable.split_off(1);
        scopes.push(reachable);
        scopes.push(deps);
    }
    scopes.push(graph.indices().collect());

    for scope in scopes {
        let mut found: Vec<(Fpid, FeatureSpec)> =
            scope.into_iter().filter_map(defined_by).collect();
        match found.len() {
            0 => continue,
            1 => return Ok(found.remove(0)),
            _ => {
                let candidates: Vec<String> = found.iter().map(|(f, _)| f.to_string()).collect();
                return Err(error(format!(
                    "feature spec {} is defined by more than one feature-pack [{}]; set its origin",
                    feature.spec,
                    candidates.join(", ")
                )));
            }
        }
    }
    Err(error(format!(
        "no installed feature-pack defines feature spec {}",
        feature.spec
    )))
}
