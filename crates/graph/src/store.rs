use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;
use stau_core::HleId;

/// Index of a node inside one [`HleGraph`].
pub type NodeIdx = usize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
}

/// Directed graph over high-level events with dense node indices.
///
/// Nodes keep insertion order, which makes component numbering and
/// neighbor iteration deterministic. Undirected uses (cascade detection)
/// treat every edge as bidirectional.
#[derive(Debug, Clone, Default)]
pub struct HleGraph {
    nodes: Vec<HleId>,
    index: HashMap<HleId, NodeIdx>,
    outgoing: Vec<Vec<NodeIdx>>,
    incoming: Vec<Vec<NodeIdx>>,
    edges: HashSet<(NodeIdx, NodeIdx)>,
}

impl HleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the node if absent, returning its index either way.
    pub fn add_node(&mut self, id: HleId) -> NodeIdx {
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(id);
        self.index.insert(id, idx);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        idx
    }

    /// Adds a directed edge between existing nodes; duplicates are ignored.
    pub fn add_edge(&mut self, source: NodeIdx, target: NodeIdx) {
        if self.edges.insert((source, target)) {
            self.outgoing[source].push(target);
            self.incoming[target].push(source);
        }
    }

    /// Adds both directions at once for undirected use.
    pub fn add_edge_undirected(&mut self, a: NodeIdx, b: NodeIdx) {
        self.add_edge(a, b);
        self.add_edge(b, a);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
        }
    }

    pub fn contains(&self, id: HleId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn idx(&self, id: HleId) -> Option<NodeIdx> {
        self.index.get(&id).copied()
    }

    pub fn hle_id(&self, idx: NodeIdx) -> HleId {
        self.nodes[idx]
    }

    /// Node indices in insertion order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIdx> {
        0..self.nodes.len()
    }

    pub fn has_edge(&self, source: NodeIdx, target: NodeIdx) -> bool {
        self.edges.contains(&(source, target))
    }

    pub fn successors(&self, idx: NodeIdx) -> &[NodeIdx] {
        &self.outgoing[idx]
    }

    pub fn predecessors(&self, idx: NodeIdx) -> &[NodeIdx] {
        &self.incoming[idx]
    }

    /// Drops every directed edge the predicate rejects and rebuilds the
    /// adjacency lists.
    pub fn retain_edges(&mut self, mut keep: impl FnMut(NodeIdx, NodeIdx) -> bool) {
        let kept: HashSet<(NodeIdx, NodeIdx)> = self
            .edges
            .iter()
            .copied()
            .filter(|&(u, v)| keep(u, v))
            .collect();
        self.edges = kept;
        for list in self.outgoing.iter_mut().chain(self.incoming.iter_mut()) {
            list.clear();
        }
        let mut edges: Vec<(NodeIdx, NodeIdx)> = self.edges.iter().copied().collect();
        edges.sort_unstable();
        for (u, v) in edges {
            self.outgoing[u].push(v);
            self.incoming[v].push(u);
        }
    }

    /// Connected components of the undirected projection.
    ///
    /// Returns one component label per node index; labels are assigned in
    /// first-seen node order starting at 0.
    pub fn components(&self) -> Vec<usize> {
        let n = self.nodes.len();
        let mut labels = vec![usize::MAX; n];
        let mut next_label = 0;

        for start in 0..n {
            if labels[start] != usize::MAX {
                continue;
            }
            labels[start] = next_label;
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                for &neighbor in self.outgoing[node].iter().chain(&self.incoming[node]) {
                    if labels[neighbor] == usize::MAX {
                        labels[neighbor] = next_label;
                        queue.push_back(neighbor);
                    }
                }
            }
            next_label += 1;
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_node_is_idempotent() {
        let mut g = HleGraph::new();
        let a = g.add_node(7);
        let again = g.add_node(7);
        assert_eq!(a, again);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.hle_id(a), 7);
    }

    #[test]
    fn duplicate_edges_are_ignored() {
        let mut g = HleGraph::new();
        let a = g.add_node(0);
        let b = g.add_node(1);
        g.add_edge(a, b);
        g.add_edge(a, b);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.successors(a), &[b]);
        assert_eq!(g.predecessors(b), &[a]);
    }

    #[test]
    fn components_label_in_first_seen_order() {
        let mut g = HleGraph::new();
        let a = g.add_node(10);
        let b = g.add_node(11);
        let c = g.add_node(12);
        let d = g.add_node(13);
        g.add_edge_undirected(a, b);
        g.add_edge(c, d);

        let labels = g.components();
        assert_eq!(labels[a], 0);
        assert_eq!(labels[b], 0);
        // Directed edges still connect components in the undirected view.
        assert_eq!(labels[c], 1);
        assert_eq!(labels[d], 1);
    }

    #[test]
    fn isolated_nodes_form_singleton_components() {
        let mut g = HleGraph::new();
        g.add_node(1);
        g.add_node(2);
        assert_eq!(g.components(), vec![0, 1]);
    }

    #[test]
    fn retain_edges_rebuilds_adjacency() {
        let mut g = HleGraph::new();
        let a = g.add_node(0);
        let b = g.add_node(1);
        let c = g.add_node(2);
        g.add_edge(a, b);
        g.add_edge(b, c);

        g.retain_edges(|u, _| u != a);
        assert_eq!(g.edge_count(), 1);
        assert!(g.successors(a).is_empty());
        assert!(g.has_edge(b, c));
        assert_eq!(g.predecessors(c), &[b]);
    }
}
