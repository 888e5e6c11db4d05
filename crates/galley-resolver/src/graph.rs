//! The resolved feature-pack graph and its traversal.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use galley_core::feature_pack::FeaturePackConfig;
use galley_core::feature_pack_spec::FeaturePackSpec;
use galley_core::location::{Fpid, Location, ProducerSpec};

/// Whether a build was asked for by the provisioning config or an override
/// (pinned), or merely reached through another feature-pack's dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Authority {
    Pinned,
    Transitive,
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pinned => f.write_str("pinned"),
            Self::Transitive => f.write_str("transitive"),
        }
    }
}

/// One way the node was reached.
#[derive(Debug, Clone)]
pub struct IncomingEdge {
    /// Inclusion rules in effect on this edge, overrides already layered in.
    pub config: FeaturePackConfig,
    /// The location as declared, before any override applied.
    pub requested: Location,
    pub authority: Authority,
    /// Declaring feature-pack; `None` for the provisioning config.
    pub parent: Option<Fpid>,
}

/// A feature-pack chosen for installation.
#[derive(Debug, Clone)]
pub struct FeaturePackNode {
    pub fpid: Fpid,
    pub location: Location,
    pub spec: Arc<FeaturePackSpec>,
    pub authority: Authority,
    pub edges: Vec<IncomingEdge>,
    /// Transitive overrides that were layered onto incoming edges.
    pub overrides: Vec<FeaturePackConfig>,
}

impl fmt::Display for FeaturePackNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fpid.fmt(f)
    }
}

/// Edge label: a dependency declared by the source on the target.
#[derive(Debug, Clone)]
pub struct DepEdge {
    pub authority: Authority,
    /// Declaration sequence, used to list dependencies in declared order.
    pub order: usize,
}

/// Resolved feature-packs, one per producer, in dependency-first order.
pub struct FeaturePackGraph {
    graph: DiGraph<FeaturePackNode, DepEdge>,
    index: HashMap<ProducerSpec, NodeIndex>,
    roots: Vec<NodeIndex>,
}

impl FeaturePackGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            roots: Vec::new(),
        }
    }

    /// Add or retrieve a node. If the producer already has one, returns the existing index.
    pub fn add_node(&mut self, node: FeaturePackNode) -> NodeIndex {
        let key = node.fpid.producer_spec();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(node);
        self.index.insert(key, idx);
        idx
    }

    /// Mark a node as declared by the provisioning config.
    pub fn add_root(&mut self, idx: NodeIndex) {
        if !self.roots.contains(&idx) {
            self.roots.push(idx);
        }
    }

    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: DepEdge) {
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, edge);
        }
    }

    pub fn find(&self, producer: &ProducerSpec) -> Option<NodeIndex> {
        self.index.get(producer).copied()
    }

    /// First node, in dependency-first order, whose producer has this name.
    pub fn find_producer(&self, name: &str) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx].fpid.producer == name)
    }

    pub fn node(&self, idx: NodeIndex) -> &FeaturePackNode {
        &self.graph[idx]
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    /// Node indices, dependencies before their dependents.
    pub fn indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Nodes, dependencies before their dependents; ties in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &FeaturePackNode> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    pub fn fpids(&self) -> Vec<Fpid> {
        self.nodes().map(|n| n.fpid.clone()).collect()
    }

    /// Direct dependencies of a node in declaration order.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        let mut deps: Vec<(NodeIndex, &DepEdge)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
            .collect();
        deps.sort_by_key(|(_, edge)| edge.order);
        deps
    }

    /// Reverse dependencies (who depends on this node).
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        let mut deps: Vec<(NodeIndex, &DepEdge)> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
            .collect();
        deps.sort_by_key(|(_, edge)| edge.order);
        deps
    }

    /// The node followed by everything it depends on, breadth first.
    pub fn reachable_from(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut seen = HashSet::from([idx]);
        let mut queue = VecDeque::from([idx]);
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            out.push(current);
            for (dep, _) in self.dependencies_of(current) {
                if seen.insert(dep) {
                    queue.push_back(dep);
                }
            }
        }
        out
    }

    /// Print the dependency tree starting at the provisioning config's feature-packs.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let mut visited = HashSet::new();
        for &root in &self.roots {
            output.push_str(&format!("{}\n", self.graph[root]));
            visited.insert(root);
            let deps = self.dependencies_of(root);
            let count = deps.len();
            for (i, (child, edge)) in deps.into_iter().enumerate() {
                let is_last = i == count - 1;
                self.print_subtree(&mut output, child, edge, "", is_last, 1, max_depth, &mut visited);
            }
            visited.remove(&root);
        }
        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        edge: &DepEdge,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        let marker = if !node.overrides.is_empty() && edge.authority == Authority::Transitive {
            " (overridden)"
        } else {
            ""
        };
        output.push_str(&format!("{prefix}{connector}{node}{marker}\n"));

        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (child, edge)) in deps.into_iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(
                output,
                child,
                edge,
                &child_prefix,
                is_last,
                depth + 1,
                max_depth,
                visited,
            );
        }

        visited.remove(&idx);
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FeaturePackGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_node(location: &str) -> FeaturePackNode {
        let location = Location::parse(location).unwrap();
        FeaturePackNode {
            fpid: location.fpid(),
            spec: Arc::new(FeaturePackSpec::new(location.clone())),
            location,
            authority: Authority::Pinned,
            edges: Vec::new(),
            overrides: Vec::new(),
        }
    }

    fn edge(order: usize) -> DepEdge {
        DepEdge {
            authority: Authority::Transitive,
            order,
        }
    }

    #[test]
    fn add_and_find() {
        let mut g = FeaturePackGraph::new();
        let node = make_node("fp1:1#1.0");
        let key = node.fpid.producer_spec();
        let idx = g.add_node(node);
        assert_eq!(g.find(&key), Some(idx));
        assert_eq!(g.find_producer("fp1"), Some(idx));
        assert_eq!(g.node(idx).fpid.build.as_deref(), Some("1.0"));
    }

    #[test]
    fn one_node_per_producer() {
        let mut g = FeaturePackGraph::new();
        let idx1 = g.add_node(make_node("fp1:1#1.0"));
        let idx2 = g.add_node(make_node("fp1:1#2.0"));
        assert_eq!(idx1, idx2);
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn dependencies_in_declaration_order() {
        let mut g = FeaturePackGraph::new();
        let b = g.add_node(make_node("b:1#1"));
        let a = g.add_node(make_node("a:1#1"));
        let root = g.add_node(make_node("root:1#1"));
        g.add_root(root);
        g.add_edge(root, a, edge(0));
        g.add_edge(root, b, edge(1));

        let deps: Vec<NodeIndex> = g.dependencies_of(root).into_iter().map(|(i, _)| i).collect();
        assert_eq!(deps, vec![a, b]);
        assert_eq!(g.reachable_from(root), vec![root, a, b]);
        assert_eq!(g.dependents_of(a)[0].0, root);
    }

    #[test]
    fn tree_printing() {
        let mut g = FeaturePackGraph::new();
        let c = g.add_node(make_node("fp3:1#1.0.1"));
        let b = g.add_node(make_node("fp2:1#1.0"));
        let a = g.add_node(make_node("fp1:1#1.0"));
        g.add_root(a);
        g.add_edge(a, b, edge(0));
        g.add_edge(b, c, edge(1));

        let tree = g.print_tree(None);
        assert_eq!(tree, "fp1:1#1.0\n└── fp2:1#1.0\n    └── fp3:1#1.0.1\n");
        let shallow = g.print_tree(Some(1));
        assert!(!shallow.contains("fp3"));
    }
}
