//! The entity-jump graph: one node per `(type, subgraph)` pair, one edge
//! per usable key jump. A subgraph A can hand an instance of entity T to
//! subgraph B when B declares a resolvable `@key` on T whose field set A
//! also declares, so B can be entered with a representation built by A.

use indexmap::{IndexMap, IndexSet};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;

use crate::definitions::ParentDefinitionData;
use crate::merge::FederationContext;

pub(super) struct EntityJumpGraph {
    graph: DiGraph<(), ()>,
    node_indices: IndexMap<(String, String), NodeIndex>,
    /// Node labels, parallel to the graph's node indices.
    labels: Vec<(String, String)>,
}

impl EntityJumpGraph {
    pub(super) fn build(ctx: &FederationContext) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = IndexMap::new();
        let mut labels = Vec::new();

        for (type_name, parent) in &ctx.parents {
            let (ParentDefinitionData::Object(data) | ParentDefinitionData::Interface(data)) = parent else {
                continue;
            };
            for subgraph_name in &data.subgraph_names {
                let index = graph.add_node(());
                node_indices.insert((type_name.clone(), subgraph_name.clone()), index);
                labels.push((type_name.clone(), subgraph_name.clone()));
            }
            for (target_subgraph, target_keys) in &data.keys_by_subgraph_name {
                for key in target_keys {
                    if !key.resolvable {
                        continue;
                    }
                    for (source_subgraph, source_keys) in &data.keys_by_subgraph_name {
                        if source_subgraph == target_subgraph {
                            continue;
                        }
                        if source_keys.iter().any(|source_key| source_key.canonical == key.canonical) {
                            let source = node_indices[&(type_name.clone(), source_subgraph.clone())];
                            let target = node_indices[&(type_name.clone(), target_subgraph.clone())];
                            graph.update_edge(source, target, ());
                        }
                    }
                }
            }
        }

        Self { graph, node_indices, labels }
    }

    /// Expands a set of subgraphs that can hold an instance of `type_name`
    /// with every subgraph reachable through shared-key jumps.
    pub(super) fn key_closure(&self, type_name: &str, seed: &IndexSet<String>) -> IndexSet<String> {
        let mut reachable: IndexSet<String> = seed.clone();
        for subgraph_name in seed {
            let Some(start) = self
                .node_indices
                .get(&(type_name.to_owned(), subgraph_name.clone()))
            else {
                continue;
            };
            let mut bfs = Bfs::new(&self.graph, *start);
            while let Some(node) = bfs.next(&self.graph) {
                let (_, reached_subgraph) = &self.labels[node.index()];
                reachable.insert(reached_subgraph.clone());
            }
        }
        reachable
    }
}
