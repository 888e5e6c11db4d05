//! Operation: display the feature-pack dependency tree.

use std::path::{Path, PathBuf};

use galley_resolver::graph::{Authority, FeaturePackGraph, FeaturePackNode, IncomingEdge};

use crate::context::ProvisioningContext;

/// Options for `galley tree`.
#[derive(Default)]
pub struct TreeOptions {
    pub repository: Option<PathBuf>,
    /// Maximum tree depth to display.
    pub depth: Option<usize>,
    /// Show how one producer was reached instead of the tree.
    pub why: Option<String>,
    /// List only producers whose requested builds were overridden.
    pub overrides: bool,
}

/// Display the dependency tree of the provisioning config.
pub fn tree(config_path: &Path, opts: &TreeOptions) -> miette::Result<()> {
    let context = ProvisioningContext::load(config_path, opts.repository.as_deref())?;
    let graph = context.plan()?.graph;

    if let Some(producer) = &opts.why {
        print!("{}", why(&graph, producer));
    } else if opts.overrides {
        print!("{}", overrides(&graph));
    } else {
        print!("{}", graph.print_tree(opts.depth));
    }
    Ok(())
}

/// Every edge that reached `producer`.
pub fn why(graph: &FeaturePackGraph, producer: &str) -> String {
    let Some(idx) = graph.find_producer(producer) else {
        return format!("Feature-pack '{producer}' is not part of the installation.\n");
    };
    let node = graph.node(idx);
    let mut out = format!("{} ({})\n", node.fpid, node.authority);
    for edge in &node.edges {
        let from = edge
            .parent
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "provisioning config".to_string());
        out.push_str(&format!(
            "  {} requested by {from} ({})\n",
            edge.requested, edge.authority
        ));
    }
    out
}

/// Transitive requests that did not get the build they asked for.
pub fn overrides(graph: &FeaturePackGraph) -> String {
    let mut out = String::new();
    for node in graph.nodes() {
        let replaced = replaced_requests(node);
        if replaced.is_empty() {
            continue;
        }
        out.push_str(&format!("{}\n", node.fpid));
        for edge in replaced {
            let from = edge
                .parent
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            out.push_str(&format!("  replaces {} from {from}\n", edge.requested));
        }
    }
    if out.is_empty() {
        out.push_str("No overridden feature-packs.\n");
    }
    out
}

/// Transitive edges of `node` that asked for a build other than the chosen one.
pub fn replaced_requests(node: &FeaturePackNode) -> Vec<&IncomingEdge> {
    node.edges
        .iter()
        .filter(|e| e.authority == Authority::Transitive)
        .filter(|e| {
            e.requested
                .build()
                .is_some_and(|b| Some(b) != node.fpid.build.as_deref())
        })
        .collect()
}
