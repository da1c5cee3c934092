//! Path search over the correlation graph.
//!
//! Every node seeds one depth-first search; a path only extends to a
//! neighbor while the running case intersection keeps enough overlap, so
//! the ratio bound prunes as it extends. Seeds are searched in parallel
//! and the results concatenated in seed order.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use stau_core::{CaseSet, HighLevelActivity, HighLevelEvent, HleId};
use stau_graph::{HleGraph, NodeIdx};

use crate::algorithms::overlap::case_overlap_ratio;
use crate::algorithms::trie::PathTrie;

/// Projection batch size; partial maps are merged key-wise afterwards.
const PROJECTION_BATCH: usize = 100;

/// One enumerated event path plus the cases all of its members share.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinedPath {
    pub hles: Vec<HleId>,
    pub cases: CaseSet,
}

/// Frequency and case pool of one projected activity path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HlaPathStats {
    pub frequency: usize,
    pub cases: CaseSet,
}

/// Enumerates paths from every node of the graph.
///
/// With `only_maximal` each search emits only the sequences it cannot
/// extend further; otherwise every explored extension is a path of its
/// own. A path threshold stricter than the edge threshold first drops the
/// edges whose pairwise overlap the path bound already rules out.
pub fn mine_paths(
    graph: &HleGraph,
    case_sets: &[CaseSet],
    overlap_threshold: f64,
    path_threshold: f64,
    only_maximal: bool,
) -> Vec<MinedPath> {
    let pruned;
    let graph = if path_threshold > overlap_threshold {
        let mut g = graph.clone();
        let ids: Vec<HleId> = g.node_indices().map(|idx| g.hle_id(idx)).collect();
        g.retain_edges(|u, v| {
            case_overlap_ratio(&case_sets[ids[u]], &case_sets[ids[v]]) >= path_threshold
        });
        pruned = g;
        &pruned
    } else {
        graph
    };

    let seeds: Vec<NodeIdx> = graph.node_indices().collect();
    let per_seed: Vec<Vec<MinedPath>> = seeds
        .par_iter()
        .map(|&seed| paths_from(graph, case_sets, path_threshold, seed, only_maximal))
        .collect();

    let paths: Vec<MinedPath> = per_seed.into_iter().flatten().collect();
    debug!(paths = paths.len(), "enumerated event paths");
    paths
}

/// Keeps only the paths that are not a strict prefix of another
/// enumerated path.
pub fn maximal_paths(paths: Vec<MinedPath>) -> Vec<MinedPath> {
    let mut cases_by_path: HashMap<Vec<HleId>, CaseSet> = HashMap::new();
    let mut trie = PathTrie::new();
    for path in paths {
        trie.insert(&path.hles);
        cases_by_path.entry(path.hles).or_insert(path.cases);
    }

    trie.leaves()
        .into_iter()
        .map(|hles| {
            let cases = cases_by_path.remove(&hles).unwrap_or_default();
            MinedPath { hles, cases }
        })
        .collect()
}

/// Projects event paths onto activity paths and merges the duplicates:
/// one count per contributing event path, case pools unioned.
pub fn project_to_hla_paths(
    paths: &[MinedPath],
    hles: &[HighLevelEvent],
) -> HashMap<Vec<HighLevelActivity>, HlaPathStats> {
    paths
        .par_chunks(PROJECTION_BATCH)
        .map(|chunk| {
            let mut partial: HashMap<Vec<HighLevelActivity>, HlaPathStats> = HashMap::new();
            for path in chunk {
                let signature: Vec<HighLevelActivity> =
                    path.hles.iter().map(|&id| hles[id].hla()).collect();
                let stats = partial.entry(signature).or_default();
                stats.frequency += 1;
                stats.cases.extend(path.cases.iter().cloned());
            }
            partial
        })
        .reduce(HashMap::new, merge_stats)
}

fn merge_stats(
    mut into: HashMap<Vec<HighLevelActivity>, HlaPathStats>,
    from: HashMap<Vec<HighLevelActivity>, HlaPathStats>,
) -> HashMap<Vec<HighLevelActivity>, HlaPathStats> {
    for (signature, stats) in from {
        let entry = into.entry(signature).or_default();
        entry.frequency += stats.frequency;
        entry.cases.extend(stats.cases);
    }
    into
}

struct Frame {
    cases: CaseSet,
    neighbors: Vec<NodeIdx>,
    next: usize,
}

/// Depth-first search from one seed with an explicit stack. `on_path`
/// guards against cycles; the running case set shrinks monotonically, so
/// a rejected extension never needs revisiting.
fn paths_from(
    graph: &HleGraph,
    case_sets: &[CaseSet],
    threshold: f64,
    seed: NodeIdx,
    only_maximal: bool,
) -> Vec<MinedPath> {
    let mut found = Vec::new();
    let mut on_path = vec![false; graph.node_count()];
    let mut path = vec![seed];
    on_path[seed] = true;

    let seed_cases = case_sets[graph.hle_id(seed)].clone();
    let seed_neighbors = qualifying(graph, case_sets, threshold, seed, &seed_cases, &on_path);
    if seed_neighbors.is_empty() {
        found.push(MinedPath {
            hles: vec![graph.hle_id(seed)],
            cases: seed_cases,
        });
        return found;
    }

    let mut stack = vec![Frame {
        cases: seed_cases,
        neighbors: seed_neighbors,
        next: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        if frame.next >= frame.neighbors.len() {
            stack.pop();
            if let Some(done) = path.pop() {
                on_path[done] = false;
            }
            continue;
        }

        let neighbor = frame.neighbors[frame.next];
        frame.next += 1;

        let cases: CaseSet = frame
            .cases
            .intersection(&case_sets[graph.hle_id(neighbor)])
            .cloned()
            .collect();
        path.push(neighbor);
        on_path[neighbor] = true;
        let neighbors = qualifying(graph, case_sets, threshold, neighbor, &cases, &on_path);

        if !only_maximal {
            found.push(MinedPath {
                hles: to_ids(graph, &path),
                cases: cases.clone(),
            });
        }
        if neighbors.is_empty() {
            if only_maximal {
                found.push(MinedPath {
                    hles: to_ids(graph, &path),
                    cases,
                });
            }
            path.pop();
            on_path[neighbor] = false;
        } else {
            stack.push(Frame {
                cases,
                neighbors,
                next: 0,
            });
        }
    }

    found
}

/// Unvisited successors whose overlap with the running case set stays at
/// or above the threshold.
fn qualifying(
    graph: &HleGraph,
    case_sets: &[CaseSet],
    threshold: f64,
    node: NodeIdx,
    running: &CaseSet,
    on_path: &[bool],
) -> Vec<NodeIdx> {
    graph
        .successors(node)
        .iter()
        .copied()
        .filter(|&n| !on_path[n])
        .filter(|&n| case_overlap_ratio(running, &case_sets[graph.hle_id(n)]) >= threshold)
        .collect()
}

fn to_ids(graph: &HleGraph, path: &[NodeIdx]) -> Vec<HleId> {
    path.iter().map(|&idx| graph.hle_id(idx)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stau_core::{Aspect, ComponentType, Entity, TrafficClass};

    fn cases(ids: &[&str]) -> CaseSet {
        ids.iter().map(|c| c.to_string()).collect()
    }

    fn graph_with(n: usize, edges: &[(HleId, HleId)]) -> HleGraph {
        let mut graph = HleGraph::new();
        for id in 0..n {
            graph.add_node(id);
        }
        for &(u, v) in edges {
            let u = graph.add_node(u);
            let v = graph.add_node(v);
            graph.add_edge(u, v);
        }
        graph
    }

    /// Six events in a diamond-ish graph with partially shared cases.
    fn fixture() -> (HleGraph, Vec<CaseSet>) {
        let graph = graph_with(6, &[(0, 1), (0, 2), (0, 3), (2, 3), (3, 4), (3, 5)]);
        let case_sets = vec![
            cases(&["1", "2", "3", "4"]),
            cases(&["1", "2"]),
            cases(&["1", "3", "4"]),
            cases(&["1", "3", "4", "6"]),
            cases(&["1", "6"]),
            cases(&["3", "6"]),
        ];
        (graph, case_sets)
    }

    #[test]
    fn terminal_paths_follow_the_overlap_bound() {
        let (graph, case_sets) = fixture();
        let paths = mine_paths(&graph, &case_sets, 0.5, 0.5, true);
        let sequences: Vec<Vec<HleId>> = paths.iter().map(|p| p.hles.clone()).collect();

        assert_eq!(
            sequences,
            vec![
                vec![0, 1],
                vec![0, 2, 3],
                vec![0, 3],
                vec![1],
                vec![2, 3],
                vec![3, 4],
                vec![3, 5],
                vec![4],
                vec![5],
            ]
        );

        // The running intersection survives on each path.
        assert_eq!(paths[1].cases, cases(&["1", "3", "4"]));
        assert_eq!(paths[0].cases, cases(&["1", "2"]));
    }

    #[test]
    fn maximal_extraction_drops_strict_prefixes() {
        let (graph, case_sets) = fixture();
        let paths = mine_paths(&graph, &case_sets, 0.5, 0.5, true);
        let maximal = maximal_paths(paths);
        let sequences: Vec<Vec<HleId>> = maximal.iter().map(|p| p.hles.clone()).collect();

        // Terminals from distinct seeds are never prefixes of each other,
        // so everything survives, now in trie order.
        assert_eq!(sequences.len(), 9);
        assert!(sequences.contains(&vec![0, 2, 3]));
        assert!(sequences.contains(&vec![1]));

        let with_prefix = vec![
            MinedPath { hles: vec![7, 8], cases: cases(&["x"]) },
            MinedPath { hles: vec![7, 8, 9], cases: cases(&["x"]) },
            MinedPath { hles: vec![4], cases: cases(&["y"]) },
        ];
        let maximal = maximal_paths(with_prefix);
        let sequences: Vec<Vec<HleId>> = maximal.into_iter().map(|p| p.hles).collect();
        assert_eq!(sequences, vec![vec![4], vec![7, 8, 9]]);
    }

    #[test]
    fn prefix_mode_keeps_every_extension() {
        let graph = graph_with(3, &[(0, 1), (1, 2)]);
        let case_sets = vec![cases(&["c"]), cases(&["c"]), cases(&["c"])];

        let paths = mine_paths(&graph, &case_sets, 0.5, 0.5, false);
        let sequences: Vec<Vec<HleId>> = paths.into_iter().map(|p| p.hles).collect();
        assert_eq!(
            sequences,
            vec![vec![0, 1], vec![0, 1, 2], vec![1, 2], vec![2]]
        );
    }

    #[test]
    fn stricter_path_bound_prunes_edges_up_front() {
        // Pairwise, 1 -> 2 overlaps 2/4; the running set {a, b, c} would
        // overlap 2/3. Pre-pruning wins and the path stops at 1.
        let graph = graph_with(3, &[(0, 1), (1, 2)]);
        let case_sets = vec![
            cases(&["a", "b", "c"]),
            cases(&["a", "b", "c", "d"]),
            cases(&["a", "b"]),
        ];

        let paths = mine_paths(&graph, &case_sets, 0.5, 0.6, true);
        let sequences: Vec<Vec<HleId>> = paths.into_iter().map(|p| p.hles).collect();
        assert_eq!(sequences, vec![vec![0, 1], vec![1], vec![2]]);
    }

    #[test]
    fn cycles_are_never_revisited() {
        let graph = graph_with(2, &[(0, 1), (1, 0)]);
        let case_sets = vec![cases(&["c"]), cases(&["c"])];

        let paths = mine_paths(&graph, &case_sets, 0.5, 0.5, true);
        let sequences: Vec<Vec<HleId>> = paths.into_iter().map(|p| p.hles).collect();
        assert_eq!(sequences, vec![vec![0, 1], vec![1, 0]]);
    }

    #[test]
    fn isolated_nodes_seed_singleton_paths() {
        let graph = graph_with(2, &[]);
        let case_sets = vec![cases(&["c1"]), cases(&["c2"])];

        let paths = mine_paths(&graph, &case_sets, 0.5, 0.5, true);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].hles, vec![0]);
        assert_eq!(paths[0].cases, cases(&["c1"]));
    }

    #[test]
    fn projection_merges_paths_with_one_signature() {
        let segment = Entity::segment("a", "b");
        let hle = |id: HleId, window| HighLevelEvent {
            id,
            aspect: Aspect::Cross,
            entity: segment.clone(),
            component: ComponentType::Segment,
            class: TrafficClass::High,
            value: 1.0,
            window,
            co_window: None,
        };
        let hles = vec![hle(0, 0), hle(1, 3)];

        let paths = vec![
            MinedPath { hles: vec![0], cases: cases(&["c1"]) },
            MinedPath { hles: vec![1], cases: cases(&["c2"]) },
        ];
        let projected = project_to_hla_paths(&paths, &hles);

        assert_eq!(projected.len(), 1);
        let stats = &projected[&vec![hles[0].hla()]];
        assert_eq!(stats.frequency, 2);
        assert_eq!(stats.cases, cases(&["c1", "c2"]));
    }
}
