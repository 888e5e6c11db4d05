//! Depth-first construction of the feature-pack graph with version convergence.
//!
//! Declarations made by the provisioning config, and `transitive` overrides
//! declared by any feature-pack, are *pinned*. Plain dependencies declared
//! inside feature-packs are reached *transitively*. A pin is in scope for the
//! whole subtree of its declarer; an ancestor's pin shadows deeper ones.
//!
//! For each producer the first build reached is the candidate. Later
//! references to other builds:
//! - pinned vs pinned: conflict
//! - transitive vs pinned: the pinned build wins, unless the
//!   `version-convergence` option is `fail`
//! - transitive vs transitive: conflict
//!
//! A pin that turns up after a transitive candidate was already expanded is
//! promoted and the pass runs again. Every conflict and missing version of a
//! pass is collected into one [`ConvergenceReport`].

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use galley_core::feature_pack::FeaturePackConfig;
use galley_core::feature_pack_spec::FeaturePackSpec;
use galley_core::location::{Fpid, Location, ProducerSpec, UniverseSpec};
use galley_core::provisioning::{ProvisioningConfig, VersionConvergence};
use galley_universe::loader::FeaturePackLoader;
use galley_universe::resolver::UniverseResolver;
use galley_util::errors::{GalleyError, GalleyResult};

use crate::conflict::ConvergenceReport;
use crate::graph::{Authority, DepEdge, FeaturePackGraph, FeaturePackNode, IncomingEdge};

/// A transitive override, or a provisioning config declaration, in scope.
#[derive(Debug, Clone)]
struct Pin {
    config: FeaturePackConfig,
    declared_by: Option<Fpid>,
}

type Scope = BTreeMap<ProducerSpec, Pin>;

struct Draft {
    location: Location,
    spec: Arc<FeaturePackSpec>,
    authority: Authority,
    edges: Vec<IncomingEdge>,
    overrides: Vec<FeaturePackConfig>,
    children: Vec<(usize, DepEdge)>,
}

/// A build-less reference waiting for another reference to pick the build.
struct Deferred {
    producer: ProducerSpec,
    parent: Option<usize>,
    config: FeaturePackConfig,
    authority: Authority,
    order: usize,
}

/// Builds the [`FeaturePackGraph`] of one provisioning config.
///
/// A builder holds no state between calls; every [`GraphBuilder::build`]
/// starts from scratch.
pub struct GraphBuilder<'a> {
    config: &'a ProvisioningConfig,
    universes: &'a UniverseResolver,
    loader: &'a dyn FeaturePackLoader,
    convergence: VersionConvergence,
    default_universe: UniverseSpec,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        config: &'a ProvisioningConfig,
        universes: &'a UniverseResolver,
        loader: &'a dyn FeaturePackLoader,
    ) -> GalleyResult<Self> {
        let convergence = config.version_convergence()?;
        let default_universe = config
            .default_universe_spec()?
            .unwrap_or_else(|| universes.default_universe().clone());
        Ok(Self {
            config,
            universes,
            loader,
            convergence,
            default_universe,
        })
    }

    pub fn build(&self) -> GalleyResult<FeaturePackGraph> {
        let mut promoted: BTreeMap<ProducerSpec, Location> = BTreeMap::new();
        loop {
            let mut pass = Pass::new(self, &promoted);
            pass.run()?;
            if pass.late_pins.is_empty() {
                return pass.finish();
            }
            let before = promoted.len();
            for (producer, location) in std::mem::take(&mut pass.late_pins) {
                tracing::debug!("Promoting {location} and resolving again");
                promoted.entry(producer).or_insert(location);
            }
            if promoted.len() == before {
                return Err(GalleyError::Generic {
                    message: "Feature-pack versions did not converge".to_string(),
                });
            }
        }
    }

    /// Expand universe aliases and fill in the inherited universe. The
    /// default universe is left implicit so that keys and messages stay short.
    fn normalize(&self, location: &Location, declarer: Option<&UniverseSpec>) -> Location {
        let fallback = declarer.unwrap_or(&self.default_universe);
        let universe = self
            .config
            .universe_for(location, Some(fallback))
            .filter(|u| u != &self.default_universe);
        location.clone().with_universe(universe)
    }

    /// The location with the default universe spelled out, for universe lookups.
    fn explicit(&self, location: &Location) -> Location {
        match location.universe() {
            Some(_) => location.clone(),
            None => location
                .clone()
                .with_universe(Some(self.default_universe.clone())),
        }
    }
}

struct Pass<'b, 'a> {
    builder: &'b GraphBuilder<'a>,
    promoted: &'b BTreeMap<ProducerSpec, Location>,
    drafts: Vec<Draft>,
    index: HashMap<ProducerSpec, usize>,
    order: Vec<usize>,
    roots: Vec<usize>,
    deferred: Vec<Deferred>,
    report: ConvergenceReport,
    late_pins: Vec<(ProducerSpec, Location)>,
    declared_pins: Vec<(Option<Fpid>, ProducerSpec, Location)>,
    used_pins: HashSet<(Option<Fpid>, ProducerSpec)>,
    edge_seq: usize,
}

impl<'b, 'a> Pass<'b, 'a> {
    fn new(builder: &'b GraphBuilder<'a>, promoted: &'b BTreeMap<ProducerSpec, Location>) -> Self {
        Self {
            builder,
            promoted,
            drafts: Vec::new(),
            index: HashMap::new(),
            order: Vec::new(),
            roots: Vec::new(),
            deferred: Vec::new(),
            report: ConvergenceReport::new(),
            late_pins: Vec::new(),
            declared_pins: Vec::new(),
            used_pins: HashSet::new(),
            edge_seq: 0,
        }
    }

    fn run(&mut self) -> GalleyResult<()> {
        let config = self.builder.config;
        let mut scope = Scope::new();
        for dep in &config.feature_packs {
            let location = self.builder.normalize(dep.location(), None);
            let producer = location.producer_spec();
            if let Some(existing) = scope.get(&producer) {
                let other = existing.config.location();
                if other.build().is_some()
                    && location.build().is_some()
                    && other.build() != location.build()
                {
                    self.report.conflict(other.fpid(), location.fpid());
                }
                continue;
            }
            if dep.is_transitive() {
                self.declared_pins
                    .push((None, producer.clone(), location.clone()));
            }
            scope.insert(
                producer,
                Pin {
                    config: dep.with_location(location),
                    declared_by: None,
                },
            );
        }

        for dep in config.feature_packs.iter().filter(|d| !d.is_transitive()) {
            self.visit(None, dep, Authority::Pinned, None, &scope)?;
        }

        for deferred in std::mem::take(&mut self.deferred) {
            match self.index.get(&deferred.producer).copied() {
                Some(idx) => {
                    let location = self.drafts[idx].location.clone();
                    let edge = IncomingEdge {
                        config: deferred.config.with_location(location),
                        requested: deferred.config.location().clone(),
                        authority: deferred.authority,
                        parent: deferred.parent.map(|p| self.drafts[p].location.fpid()),
                    };
                    self.drafts[idx].edges.push(edge);
                    self.link(deferred.parent, idx, deferred.authority, deferred.order);
                }
                None => self.report.missing(deferred.producer),
            }
        }
        Ok(())
    }

    /// Follow one dependency edge. Returns the node it ended at, if any.
    fn visit(
        &mut self,
        parent: Option<usize>,
        dep: &FeaturePackConfig,
        declared: Authority,
        declarer_universe: Option<&UniverseSpec>,
        scope: &Scope,
    ) -> GalleyResult<Option<usize>> {
        let order = self.edge_seq;
        self.edge_seq += 1;
        let promoted = self.promoted;

        let requested = self.builder.normalize(dep.location(), declarer_universe);
        let producer = requested.producer_spec();
        let pin = match declared {
            Authority::Pinned => None,
            Authority::Transitive => scope.get(&producer),
        };
        if let Some(pin) = pin {
            self.used_pins
                .insert((pin.declared_by.clone(), producer.clone()));
        }
        let pinned = pin
            .map(|p| p.config.location())
            .filter(|l| l.build().is_some())
            .or_else(|| promoted.get(&producer));
        let authority = match (declared, pinned) {
            (Authority::Pinned, _) | (_, Some(_)) => Authority::Pinned,
            _ => Authority::Transitive,
        };

        let target = match pinned {
            Some(pinned) => {
                if requested.build().is_some() && requested.build() != pinned.build() {
                    if self.builder.convergence == VersionConvergence::Fail {
                        self.report.conflict(pinned.fpid(), requested.fpid());
                        return Ok(None);
                    }
                    tracing::debug!("{pinned} overrides {requested}");
                }
                Some(pinned.clone())
            }
            None if requested.build().is_some() => Some(requested.clone()),
            None => match self.index.get(&producer) {
                Some(&idx) => Some(self.drafts[idx].location.clone()),
                None => self.latest(&requested)?,
            },
        };

        let mut config = dep.with_location(requested.clone());
        if let Some(pin) = pin {
            config = config.overridden_by(&pin.config);
        }

        let Some(mut target) = target else {
            self.deferred.push(Deferred {
                producer,
                parent,
                config,
                authority: declared,
                order,
            });
            return Ok(None);
        };

        let existing = self.index.get(&producer).copied();
        if let Some(idx) = existing {
            let chosen = &self.drafts[idx];
            if chosen.location.build() != target.build() {
                match (chosen.authority, authority) {
                    (Authority::Pinned, Authority::Transitive)
                        if self.builder.convergence == VersionConvergence::Override =>
                    {
                        tracing::debug!("{} overrides {target}", chosen.location);
                        target = chosen.location.clone();
                    }
                    (Authority::Transitive, Authority::Pinned)
                        if self.builder.convergence == VersionConvergence::Override =>
                    {
                        self.late_pins.push((producer, target));
                        return Ok(None);
                    }
                    _ => {
                        self.report.conflict(chosen.location.fpid(), target.fpid());
                        return Ok(None);
                    }
                }
            }
        }

        let edge = IncomingEdge {
            config: config.with_location(target.clone()),
            requested,
            authority: declared,
            parent: parent.map(|p| self.drafts[p].location.fpid()),
        };

        let idx = match existing {
            Some(idx) => idx,
            None => {
                let spec = self.builder.loader.load(&self.builder.explicit(&target))?;
                let idx = self.drafts.len();
                self.drafts.push(Draft {
                    location: target,
                    spec,
                    authority,
                    edges: Vec::new(),
                    overrides: Vec::new(),
                    children: Vec::new(),
                });
                self.index.insert(producer, idx);
                idx
            }
        };

        let draft = &mut self.drafts[idx];
        draft.edges.push(edge);
        if let Some(pin) = pin.filter(|p| p.config.is_transitive()) {
            if !draft.overrides.contains(&pin.config) {
                draft.overrides.push(pin.config.clone());
            }
        }
        self.link(parent, idx, declared, order);

        if existing.is_none() {
            self.expand(idx, scope)?;
            self.order.push(idx);
        }
        Ok(Some(idx))
    }

    fn expand(&mut self, idx: usize, scope: &Scope) -> GalleyResult<()> {
        let spec = Arc::clone(&self.drafts[idx].spec);
        let fpid = self.drafts[idx].location.fpid();
        let universe = self.drafts[idx].location.universe().cloned();

        let mut inner = Cow::Borrowed(scope);
        for dep in spec.dependencies.iter().filter(|d| d.is_transitive()) {
            let location = self.builder.normalize(dep.location(), universe.as_ref());
            let producer = location.producer_spec();
            if inner.contains_key(&producer) {
                tracing::debug!("{fpid}: override {location} is shadowed by an earlier declaration");
                continue;
            }
            self.declared_pins
                .push((Some(fpid.clone()), producer.clone(), location.clone()));
            inner.to_mut().insert(
                producer,
                Pin {
                    config: dep.with_location(location),
                    declared_by: Some(fpid.clone()),
                },
            );
        }

        for dep in spec.dependencies.iter().filter(|d| !d.is_transitive()) {
            self.visit(Some(idx), dep, Authority::Transitive, universe.as_ref(), &inner)?;
        }
        Ok(())
    }

    fn latest(&self, requested: &Location) -> GalleyResult<Option<Location>> {
        let explicit = self.builder.explicit(requested);
        if self.builder.universes.channel_for(&explicit)?.is_none() {
            return Ok(None);
        }
        let latest = self.builder.universes.resolve_latest_build(&explicit)?;
        Ok(Some(latest.with_universe(requested.universe().cloned())))
    }

    fn link(&mut self, parent: Option<usize>, idx: usize, authority: Authority, order: usize) {
        if let Some(parent) = parent {
            let children = &mut self.drafts[parent].children;
            if !children.iter().any(|(child, _)| *child == idx) {
                children.push((idx, DepEdge { authority, order }));
            }
        } else if !self.roots.contains(&idx) {
            self.roots.push(idx);
        }
    }

    fn finish(self) -> GalleyResult<FeaturePackGraph> {
        if !self.report.is_empty() {
            return Err(self.report.into_error());
        }

        for (declared_by, producer, location) in &self.declared_pins {
            if !self
                .used_pins
                .contains(&(declared_by.clone(), producer.clone()))
            {
                let declarer = declared_by
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "the provisioning config".to_string());
                tracing::warn!("Transitive override {location} declared by {declarer} was never reached");
            }
        }

        let mut graph = FeaturePackGraph::new();
        let mut drafts: Vec<Option<Draft>> = self.drafts.into_iter().map(Some).collect();
        let mut node_of = HashMap::new();
        let mut children = Vec::new();
        for &i in &self.order {
            let Some(draft) = drafts[i].take() else {
                continue;
            };
            let node = graph.add_node(FeaturePackNode {
                fpid: draft.location.fpid(),
                location: draft.location,
                spec: draft.spec,
                authority: draft.authority,
                edges: draft.edges,
                overrides: draft.overrides,
            });
            node_of.insert(i, node);
            children.push((i, draft.children));
        }
        for (from, deps) in children {
            for (to, edge) in deps {
                if let (Some(&from), Some(&to)) = (node_of.get(&from), node_of.get(&to)) {
                    graph.add_edge(from, to, edge);
                }
            }
        }
        for root in &self.roots {
            if let Some(&node) = node_of.get(root) {
                graph.add_root(node);
            }
        }
        tracing::debug!("Resolved {} feature-packs", graph.len());
        Ok(graph)
    }
}
