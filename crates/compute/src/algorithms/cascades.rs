//! Cascade detection over window-adjacent high-level events.
//!
//! Events anchored in consecutive non-empty windows are compared pairwise;
//! a shared entity always connects, distinct entities connect when their
//! link value reaches the threshold. A quiet window interrupts every chain
//! crossing it. Cascades are the connected components of the result.

use std::collections::HashMap;

use tracing::debug;

use stau_core::HleId;
use stau_graph::{HleGraph, NodeIdx};

use crate::pipeline::generation::HleSet;
use crate::pipeline::linkage::EntityLinkage;

/// High-level events grouped into cascades, plus the graph that produced
/// the grouping.
#[derive(Debug, Clone, Default)]
pub struct CascadeAssignment {
    pub graph: HleGraph,
    /// Cascade label per event id; labels are contiguous from zero.
    pub cascade_of: HashMap<HleId, usize>,
}

impl CascadeAssignment {
    /// Number of cascades.
    pub fn len(&self) -> usize {
        self.cascade_of
            .values()
            .map(|&label| label + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.cascade_of.is_empty()
    }

    /// Member ids per cascade, each group sorted by id.
    pub fn groups(&self) -> Vec<Vec<HleId>> {
        let mut groups = vec![Vec::new(); self.len()];
        for (&id, &label) in &self.cascade_of {
            groups[label].push(id);
        }
        for group in &mut groups {
            group.sort_unstable();
        }
        groups
    }
}

/// Connects events across adjacent windows by entity affinity and labels
/// the connected components.
pub fn correlate_by_links(set: &HleSet, links: &EntityLinkage, threshold: f64) -> CascadeAssignment {
    let mut graph = HleGraph::new();
    let mut previous: Option<Vec<(HleId, NodeIdx)>> = None;

    for ids in set.by_window.values() {
        if ids.is_empty() {
            previous = None;
            continue;
        }
        let current: Vec<(HleId, NodeIdx)> =
            ids.iter().map(|&id| (id, graph.add_node(id))).collect();
        if let Some(prev) = &previous {
            for &(left_id, left_idx) in prev {
                for &(right_id, right_idx) in &current {
                    let left = &set.hles[left_id];
                    let right = &set.hles[right_id];
                    let weight = if left.entity == right.entity {
                        1.0
                    } else {
                        links.value(&left.entity, &right.entity)
                    };
                    if weight >= threshold {
                        graph.add_edge_undirected(left_idx, right_idx);
                    }
                }
            }
        }
        previous = Some(current);
    }

    let labels = graph.components();
    let cascades = labels.iter().map(|&label| label + 1).max().unwrap_or(0);
    let cascade_of = graph
        .node_indices()
        .map(|idx| (graph.hle_id(idx), labels[idx]))
        .collect();
    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        cascades,
        "grouped events into cascades"
    );

    CascadeAssignment { graph, cascade_of }
}
