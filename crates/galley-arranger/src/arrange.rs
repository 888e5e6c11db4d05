//! Ordering of a resolved config's features into branches and batches.
//!
//! 1. Every feature gets a [`ResolvedFeatureId`]; duplicates merge their
//!    parameters and keep the first position.
//! 2. Reference edges put the referenced feature first (the referrer first
//!    for `parent-follows-child` references). Capability edges put every
//!    provider of a capability before every feature requiring it.
//! 3. Strongly connected components are sorted topologically; among ready
//!    components the one holding the earliest declared feature goes first.
//! 4. The sorted run is cut into branches. Mutual capability requirements
//!    between siblings of one parent become a batch; any other cycle fails.
//!
//! The whole arrangement is computed before anything is delivered.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use galley_core::config_id::ConfigId;
use galley_core::config_model::{
    PROP_BRANCH_IS_BATCH, PROP_PARENT_CHILDREN_BRANCH, PROP_SPEC_BRANCH,
};
use galley_core::feature_spec::{FeatureReference, FeatureSpec};
use galley_core::location::{Fpid, ProducerSpec};
use galley_resolver::merge::ResolvedConfig;
use galley_util::errors::{GalleyError, GalleyResult};

use crate::feature_id::ResolvedFeatureId;

/// A feature as it will be delivered.
#[derive(Debug, Clone)]
pub struct ArrangedFeature {
    pub id: ResolvedFeatureId,
    /// Feature-pack defining the spec.
    pub fpid: Fpid,
    pub spec: FeatureSpec,
    /// Every parameter with a value, defaults included.
    pub params: BTreeMap<String, String>,
}

/// Part of a branch: one feature, or features that must arrive together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Feature(usize),
    Batch(Vec<usize>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Branch {
    /// The whole branch is delivered as one batch.
    pub batch: bool,
    pub segments: Vec<Segment>,
}

impl Branch {
    /// Feature indices in delivery order.
    pub fn features(&self) -> Vec<usize> {
        self.segments
            .iter()
            .flat_map(|segment| match segment {
                Segment::Feature(idx) => vec![*idx],
                Segment::Batch(members) => members.clone(),
            })
            .collect()
    }
}

/// The delivery plan of one config.
#[derive(Debug, Clone)]
pub struct ConfigArrangement {
    pub config: ConfigId,
    pub props: BTreeMap<String, String>,
    /// Features in declaration order; branches index into this list.
    pub features: Vec<ArrangedFeature>,
    pub branches: Vec<Branch>,
}

impl ConfigArrangement {
    pub fn feature(&self, idx: usize) -> &ArrangedFeature {
        &self.features[idx]
    }

    /// Features in delivery order.
    pub fn ordered(&self) -> impl Iterator<Item = &ArrangedFeature> {
        self.branches
            .iter()
            .flat_map(Branch::features)
            .map(move |idx| &self.features[idx])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeKind {
    Reference,
    Capability,
}

/// Arrange every config of a plan, in plan order. Every config is tried;
/// the failures of all of them come back in one error.
pub fn arrange_all(configs: &[ResolvedConfig]) -> GalleyResult<Vec<ConfigArrangement>> {
    let mut arranged = Vec::with_capacity(configs.len());
    let mut failures = Vec::new();
    for config in configs {
        match arrange(config) {
            Ok(arrangement) => arranged.push(arrangement),
            Err(GalleyError::Arrangement { config, message }) => {
                tracing::debug!("Config {config} cannot be arranged: {message}");
                failures.push((config, message));
            }
            Err(other) => return Err(other),
        }
    }
    if failures.len() > 1 {
        return Err(GalleyError::Arrangements {
            failures: failures
                .into_iter()
                .map(|(config, message)| format!("{config}: {message}"))
                .collect(),
        });
    }
    match failures.pop() {
        Some((config, message)) => Err(GalleyError::Arrangement { config, message }),
        None => Ok(arranged),
    }
}

pub fn arrange(config: &ResolvedConfig) -> GalleyResult<ConfigArrangement> {
    let mut layout = Layout::new(config);
    layout.collect()?;
    layout.link_references()?;
    layout.link_capabilities()?;
    let units = layout.sort()?;
    let branches = layout.branches(&units);
    tracing::debug!(
        "Arranged {} feature(s) of {} into {} branch(es)",
        layout.features.len(),
        config.id,
        branches.len()
    );
    Ok(ConfigArrangement {
        config: config.id.clone(),
        props: config.props.clone(),
        features: layout.features,
        branches,
    })
}

struct Layout<'c> {
    config: &'c ResolvedConfig,
    features: Vec<ArrangedFeature>,
    index: HashMap<ResolvedFeatureId, usize>,
    graph: DiGraph<usize, EdgeKind>,
    parents: Vec<Option<usize>>,
}

impl<'c> Layout<'c> {
    fn new(config: &'c ResolvedConfig) -> Self {
        Self {
            config,
            features: Vec::new(),
            index: HashMap::new(),
            graph: DiGraph::new(),
            parents: Vec::new(),
        }
    }

    fn error(&self, message: String) -> GalleyError {
        GalleyError::Arrangement {
            config: self.config.id.to_string(),
            message,
        }
    }

    fn collect(&mut self) -> GalleyResult<()> {
        let config = self.config;
        for configured in &config.features {
            let spec = &configured.spec;
            let given = &configured.config.params;
            if let Some(unknown) = given.keys().find(|name| spec.param(name).is_none()) {
                return Err(self.error(format!(
                    "feature spec {} has no parameter {unknown}",
                    spec.name
                )));
            }

            let mut params = BTreeMap::new();
            for param in &spec.params {
                match given.get(&param.name).or(param.default.as_ref()) {
                    Some(value) => {
                        params.insert(param.name.clone(), value.clone());
                    }
                    None if param.nillable && !param.id => {}
                    None => {
                        return Err(self.error(format!(
                            "parameter {} of a {} feature has no value",
                            param.name, spec.name
                        )))
                    }
                }
            }

            let id = ResolvedFeatureId {
                producer: configured.fpid.producer_spec(),
                spec: spec.name.clone(),
                params: spec
                    .id_params()
                    .filter_map(|p| params.get(&p.name).map(|v| (p.name.clone(), v.clone())))
                    .collect(),
            };
            let keyed = spec.id_params().next().is_some();
            if keyed {
                if let Some(&existing) = self.index.get(&id) {
                    tracing::debug!("Merging parameters of duplicate feature {id}");
                    self.features[existing].params.extend(given.clone());
                    continue;
                }
                self.index.insert(id.clone(), self.features.len());
            }
            let node = self.graph.add_node(self.features.len());
            debug_assert_eq!(node.index(), self.features.len());
            self.features.push(ArrangedFeature {
                id,
                fpid: configured.fpid.clone(),
                spec: spec.clone(),
                params,
            });
            self.parents.push(None);
        }
        Ok(())
    }

    fn link(&mut self, before: usize, after: usize, kind: EdgeKind) {
        let (a, b) = (NodeIndex::new(before), NodeIndex::new(after));
        if self.graph.find_edge(a, b).is_none() {
            self.graph.add_edge(a, b, kind);
        }
    }

    fn was_excluded(&self, target: &ResolvedFeatureId) -> bool {
        self.config.excluded.iter().any(|x| {
            x.spec == target.spec
                && x.params
                    .iter()
                    .all(|(k, v)| target.params.get(k) == Some(v))
        })
    }

    /// A configured feature of the spec named by a reference. Features of
    /// the referring producer win over those of other producers.
    fn defining_feature(&self, producer: &ProducerSpec, name: &str) -> Option<&ArrangedFeature> {
        let mut named = self.features.iter().filter(|f| f.spec.name == name);
        let first = named.clone().next();
        named.find(|f| &f.id.producer == producer).or(first)
    }

    fn link_references(&mut self) -> GalleyResult<()> {
        for idx in 0..self.features.len() {
            let refs = self.features[idx].spec.refs.clone();
            for reference in &refs {
                if let Some(target) = self.reference_target(idx, reference)? {
                    if target == idx {
                        continue;
                    }
                    if reference.parent_follows_child {
                        self.link(idx, target, EdgeKind::Reference);
                    } else {
                        self.link(target, idx, EdgeKind::Reference);
                    }
                    if self.parents[idx].is_none() {
                        self.parents[idx] = Some(target);
                    }
                }
            }
        }
        Ok(())
    }

    /// The feature a reference points at; `None` when the edge is dropped.
    fn reference_target(
        &self,
        idx: usize,
        reference: &FeatureReference,
    ) -> GalleyResult<Option<usize>> {
        let feature = &self.features[idx];
        let dropped_spec = self.config.excluded.iter().any(|x| x.spec == reference.feature);
        let Some(defining) = self.defining_feature(&feature.id.producer, &reference.feature) else {
            if reference.nillable || dropped_spec {
                return Ok(None);
            }
            return Err(self.error(format!(
                "{} references {} but no {} feature is configured",
                feature.id,
                reference.name(),
                reference.feature
            )));
        };

        let mut params = BTreeMap::new();
        for param in defining.spec.id_params() {
            let local = reference.local_param_for(&param.name);
            match feature.params.get(local) {
                Some(value) => {
                    params.insert(param.name.clone(), value.clone());
                }
                None if reference.nillable => return Ok(None),
                None => {
                    return Err(self.error(format!(
                        "reference {} of {} has no value for {local}",
                        reference.name(),
                        feature.id
                    )))
                }
            }
        }

        let target = ResolvedFeatureId {
            producer: defining.id.producer.clone(),
            spec: reference.feature.clone(),
            params,
        };
        match self.index.get(&target) {
            Some(&found) => Ok(Some(found)),
            None if self.was_excluded(&target) => {
                tracing::debug!("Dropping reference from {} to excluded {target}", feature.id);
                Ok(None)
            }
            None => Err(self.error(format!(
                "{} references missing feature {target}",
                feature.id
            ))),
        }
    }

    fn link_capabilities(&mut self) -> GalleyResult<()> {
        let mut providers: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, feature) in self.features.iter().enumerate() {
            for capability in &feature.spec.provides {
                match capability.resolve(&feature.params) {
                    Some(name) => providers.entry(name).or_default().push(idx),
                    None if capability.optional => {}
                    None => {
                        return Err(self.error(format!(
                            "{} cannot resolve provided capability {}",
                            feature.id, capability.name
                        )))
                    }
                }
            }
        }

        let mut edges = Vec::new();
        let mut unresolved = Vec::new();
        for (idx, feature) in self.features.iter().enumerate() {
            for capability in &feature.spec.requires {
                let Some(name) = capability.resolve(&feature.params) else {
                    if !capability.optional {
                        unresolved.push(format!("{} required by {}", capability.name, feature.id));
                    }
                    continue;
                };
                let Some(from) = providers.get(&name) else {
                    if !capability.optional {
                        unresolved.push(format!("{name} required by {}", feature.id));
                    }
                    continue;
                };
                // A feature providing what it requires needs no edge to itself.
                edges.extend(from.iter().filter(|&&p| p != idx).map(|&p| (p, idx)));
            }
        }
        if !unresolved.is_empty() {
            return Err(self.error(format!(
                "unresolved capabilities: {}",
                unresolved.join(", ")
            )));
        }
        for (provider, requirer) in edges {
            self.link(provider, requirer, EdgeKind::Capability);
        }
        Ok(())
    }

    /// Topological order of components, each component in declaration order.
    fn sort(&self) -> GalleyResult<Vec<Vec<usize>>> {
        let sccs = tarjan_scc(&self.graph);
        let mut component = vec![0; self.features.len()];
        let mut members: Vec<Vec<usize>> = Vec::with_capacity(sccs.len());
        for (c, scc) in sccs.iter().enumerate() {
            let mut indices: Vec<usize> = scc.iter().map(|n| n.index()).collect();
            indices.sort_unstable();
            for &idx in &indices {
                component[idx] = c;
            }
            members.push(indices);
        }

        for group in members.iter().filter(|m| m.len() > 1) {
            self.check_cycle(group, &component)?;
        }

        let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); members.len()];
        let mut in_degree = vec![0usize; members.len()];
        for edge in self.graph.edge_references() {
            let from = component[edge.source().index()];
            let to = component[edge.target().index()];
            if from != to && successors[from].insert(to) {
                in_degree[to] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<(usize, usize)>> = members
            .iter()
            .enumerate()
            .filter(|(c, _)| in_degree[*c] == 0)
            .map(|(c, m)| Reverse((m[0], c)))
            .collect();
        let mut units = Vec::with_capacity(members.len());
        while let Some(Reverse((_, c))) = ready.pop() {
            units.push(members[c].clone());
            for &next in &successors[c] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse((members[next][0], next)));
                }
            }
        }
        Ok(units)
    }

    /// A cycle is only acceptable between siblings of one parent linked
    /// by capabilities alone.
    fn check_cycle(&self, group: &[usize], component: &[usize]) -> GalleyResult<()> {
        let parent = self.parents[group[0]];
        let siblings = parent.is_some() && group.iter().all(|&m| self.parents[m] == parent);
        let capabilities_only = group.iter().all(|&m| {
            self.graph
                .edges_directed(NodeIndex::new(m), Direction::Outgoing)
                .filter(|e| component[e.target().index()] == component[m])
                .all(|e| *e.weight() == EdgeKind::Capability)
        });
        if siblings && capabilities_only {
            return Ok(());
        }
        let ids: Vec<String> = group
            .iter()
            .map(|&m| self.features[m].id.to_string())
            .collect();
        Err(self.error(format!(
            "features [{}] form a dependency cycle",
            ids.join(", ")
        )))
    }

    fn parent_children_branch(&self, spec: &FeatureSpec) -> bool {
        spec.annotations
            .parent_children_branch
            .or_else(|| self.config.flag(PROP_PARENT_CHILDREN_BRANCH))
            .unwrap_or(false)
    }

    fn spec_branch(&self, spec: &FeatureSpec) -> bool {
        spec.annotations
            .spec_branch
            .or_else(|| self.config.flag(PROP_SPEC_BRANCH))
            .unwrap_or(true)
    }

    fn branches(&self, units: &[Vec<usize>]) -> Vec<Branch> {
        let branch_is_batch = self.config.flag(PROP_BRANCH_IS_BATCH).unwrap_or(false);
        let new_branch = || Branch {
            batch: branch_is_batch,
            segments: Vec::new(),
        };

        let mut branches = Vec::new();
        let mut current = new_branch();
        let mut open: HashSet<usize> = HashSet::new();
        let mut emitted: HashSet<usize> = HashSet::new();
        let mut family: Option<usize> = None;
        let mut last_spec: Option<&FeatureSpec> = None;

        for unit in units {
            let first = unit[0];
            let spec = &self.features[first].spec;

            let depends_on_open = unit.iter().any(|&m| {
                self.graph
                    .neighbors_directed(NodeIndex::new(m), Direction::Incoming)
                    .any(|n| open.contains(&n.index()))
            });
            let joins_family =
                family.is_some() && unit.iter().all(|&m| self.parents[m] == family);
            let opens_family = unit.len() == 1
                && self.parent_children_branch(spec)
                && (0..self.features.len())
                    .any(|j| self.parents[j] == Some(first) && !emitted.contains(&j));
            let spec_interrupted = last_spec
                .is_some_and(|last| last.name != spec.name && !self.spec_branch(last));

            let starts_new = opens_family
                || (!joins_family && (spec_interrupted || depends_on_open));
            if starts_new && !current.segments.is_empty() {
                branches.push(std::mem::replace(&mut current, new_branch()));
                open.clear();
            }
            if opens_family {
                family = Some(first);
            } else if !joins_family {
                family = None;
            }

            if unit.len() == 1 || branch_is_batch {
                current
                    .segments
                    .extend(unit.iter().map(|&m| Segment::Feature(m)));
            } else {
                current.segments.push(Segment::Batch(unit.clone()));
            }
            open.extend(unit.iter().copied());
            emitted.extend(unit.iter().copied());
            last_spec = Some(spec);
        }
        if !current.segments.is_empty() {
            branches.push(current);
        }
        branches
    }
}
