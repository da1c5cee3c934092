//! Case-overlap correlation of high-level events.
//!
//! Each event gets a temporal spread (where its underlying work starts and
//! ends), a cheap sweep rules out pairs that cannot be ordered, and the
//! surviving pairs are connected when they continue the same segment chain
//! with enough shared cases.

use std::collections::HashSet;

use tracing::debug;

use stau_core::{Aspect, CaseSet, ComponentType, HleId, WindowId};
use stau_graph::HleGraph;

use crate::pipeline::generation::HleSet;
use crate::pipeline::windowing::Windowing;

/// Window hull of where an event's instances start and end.
///
/// Only the bounds matter downstream: pairs are pruned by comparing bounds
/// and connected by hull containment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpreadBounds {
    pub start_first: WindowId,
    pub start_last: WindowId,
    pub end_first: WindowId,
    pub end_last: WindowId,
}

impl SpreadBounds {
    fn point(window: WindowId) -> Self {
        Self {
            start_first: window,
            start_last: window,
            end_first: window,
            end_last: window,
        }
    }
}

/// Aspects whose instances genuinely stretch over windows. Everything else
/// collapses to its anchor window.
fn spreads_over_windows(aspect: Aspect) -> bool {
    matches!(
        aspect,
        Aspect::Enter
            | Aspect::Exit
            | Aspect::Workload
            | Aspect::Handover
            | Aspect::Batch
            | Aspect::Delay
    )
}

/// One spread per event, indexed by id.
pub fn spread_bounds(set: &HleSet, windowing: &Windowing) -> Vec<SpreadBounds> {
    set.hles
        .iter()
        .map(|hle| {
            if hle.component != ComponentType::Segment || !spreads_over_windows(hle.aspect) {
                return SpreadBounds::point(hle.window);
            }
            if let Some(co_window) = hle.co_window {
                // Bundles start where they entered and end where they left.
                return SpreadBounds {
                    start_first: co_window,
                    start_last: co_window,
                    end_first: hle.window,
                    end_last: hle.window,
                };
            }

            let instances = &set.instances[hle.id];
            if instances.is_empty() {
                return SpreadBounds::point(hle.window);
            }
            match hle.aspect {
                Aspect::Exit | Aspect::Workload | Aspect::Handover => {
                    // The completed steps may have started windows ago.
                    let (first, last) = window_hull(
                        instances.iter().map(|i| windowing.window_of(i.first())),
                    );
                    SpreadBounds {
                        start_first: first,
                        start_last: last,
                        end_first: hle.window,
                        end_last: hle.window,
                    }
                }
                Aspect::Enter => {
                    let (first, last) = window_hull(
                        instances.iter().map(|i| windowing.window_of(i.second())),
                    );
                    SpreadBounds {
                        start_first: hle.window,
                        start_last: hle.window,
                        end_first: first,
                        end_last: last,
                    }
                }
                _ => SpreadBounds::point(hle.window),
            }
        })
        .collect()
}

fn window_hull(windows: impl Iterator<Item = WindowId>) -> (WindowId, WindowId) {
    let mut first = usize::MAX;
    let mut last = 0;
    for w in windows {
        first = first.min(w);
        last = last.max(w);
    }
    (first, last)
}

/// |intersection| / |union| of two case sets; empty sets overlap nobody.
pub fn case_overlap_ratio(a: &CaseSet, b: &CaseSet) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Ordered pairs that cannot satisfy any time ordering, found by two
/// advance-only sweeps over sorted bounds.
///
/// The sweeps under-mark on purpose: a pair they miss is still rejected by
/// the exact hull test later, so soundness only needs every marked pair to
/// be genuinely impossible.
pub fn excluded_pairs(bounds: &[SpreadBounds]) -> HashSet<(HleId, HleId)> {
    let mut excluded = HashSet::new();

    let by = |key: fn(&SpreadBounds) -> WindowId| {
        let mut ids: Vec<HleId> = (0..bounds.len()).collect();
        ids.sort_by_key(|&id| key(&bounds[id]));
        ids
    };
    let start_by_first = by(|b| b.start_first);
    let start_by_last = by(|b| b.start_last);
    let end_by_first = by(|b| b.end_first);
    let end_by_last = by(|b| b.end_last);

    // (h1, h2) is impossible when h1 ends strictly after h2's start hull.
    let mut cursor = 0;
    for &h2 in &start_by_last {
        let start_last = bounds[h2].start_last;
        while cursor < end_by_first.len() && start_last < bounds[end_by_first[cursor]].end_first {
            excluded.insert((end_by_first[cursor], h2));
            cursor += 1;
        }
    }

    // Mirror: (h1, h2) is impossible when h1 ends strictly before h2's
    // start hull.
    let mut cursor = 0;
    for &h1 in &end_by_last {
        let end_last = bounds[h1].end_last;
        while cursor < start_by_first.len() && end_last < bounds[start_by_first[cursor]].start_first
        {
            excluded.insert((h1, start_by_first[cursor]));
            cursor += 1;
        }
    }

    excluded
}

/// Builds the directed correlation graph over all events.
///
/// A pair is connected when the first event's segment feeds the second's,
/// one hull contains the other, and the case sets overlap at least
/// `threshold`. Every event is a node even when nothing connects it.
pub fn build_overlap_graph(
    set: &HleSet,
    bounds: &[SpreadBounds],
    threshold: f64,
) -> HleGraph {
    let mut graph = HleGraph::new();
    for hle in &set.hles {
        graph.add_node(hle.id);
    }

    let excluded = excluded_pairs(bounds);
    for first in &set.hles {
        if first.component != ComponentType::Segment {
            continue;
        }
        for second in &set.hles {
            if first.id == second.id
                || second.component != ComponentType::Segment
                || excluded.contains(&(first.id, second.id))
            {
                continue;
            }
            if first.entity.second_activity() != second.entity.first_activity() {
                continue;
            }
            if !hulls_nested(&bounds[first.id], &bounds[second.id]) {
                continue;
            }
            let ratio = case_overlap_ratio(&set.case_sets[first.id], &set.case_sets[second.id]);
            if ratio >= threshold {
                let u = graph.add_node(first.id);
                let v = graph.add_node(second.id);
                graph.add_edge(u, v);
            }
        }
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built overlap graph"
    );
    graph
}

/// True when the first event's end hull and the second's start hull nest
/// either way.
fn hulls_nested(first: &SpreadBounds, second: &SpreadBounds) -> bool {
    let end_in_start = second.start_first <= first.end_first && first.end_last <= second.start_last;
    let start_in_end = first.end_first <= second.start_first && second.start_last <= first.end_last;
    end_in_start || start_in_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use stau_core::{Entity, HighLevelEvent, TrafficClass};

    use crate::pipeline::features::Instance;

    fn make_hle(id: HleId, aspect: Aspect, entity: Entity, window: WindowId) -> HighLevelEvent {
        let component = entity.component_type();
        HighLevelEvent {
            id,
            aspect,
            entity,
            component,
            class: TrafficClass::High,
            value: 1.0,
            window,
            co_window: None,
        }
    }

    fn cases(ids: &[&str]) -> CaseSet {
        ids.iter().map(|c| c.to_string()).collect()
    }

    fn set_of(hles: Vec<HighLevelEvent>, case_sets: Vec<CaseSet>) -> HleSet {
        let instances = vec![Vec::new(); hles.len()];
        HleSet {
            hles,
            case_sets,
            instances,
            ..HleSet::default()
        }
    }

    fn point_bounds(windows: &[WindowId]) -> Vec<SpreadBounds> {
        windows.iter().map(|&w| SpreadBounds::point(w)).collect()
    }

    #[test]
    fn ratio_handles_empty_and_disjoint_sets() {
        assert_eq!(case_overlap_ratio(&cases(&[]), &cases(&[])), 0.0);
        assert_eq!(case_overlap_ratio(&cases(&["a"]), &cases(&["b"])), 0.0);
        assert_eq!(case_overlap_ratio(&cases(&["a", "b"]), &cases(&["b"])), 0.5);
        assert_eq!(case_overlap_ratio(&cases(&["a"]), &cases(&["a"])), 1.0);
    }

    #[test]
    fn bundles_spread_from_entry_to_exit_window() {
        let mut hle = make_hle(0, Aspect::Delay, Entity::segment("a", "b"), 5);
        hle.co_window = Some(2);
        let set = set_of(vec![hle], vec![cases(&["c"])]);
        let windowing = Windowing::default();

        let bounds = spread_bounds(&set, &windowing);
        assert_eq!(
            bounds[0],
            SpreadBounds {
                start_first: 2,
                start_last: 2,
                end_first: 5,
                end_last: 5,
            }
        );
    }

    #[test]
    fn non_segment_events_collapse_to_their_window() {
        let set = set_of(
            vec![make_hle(0, Aspect::Exec, Entity::activity("a"), 3)],
            vec![cases(&["c"])],
        );
        let bounds = spread_bounds(&set, &Windowing::default());
        assert_eq!(bounds[0], SpreadBounds::point(3));
    }

    #[test]
    fn exit_events_reach_back_to_their_steps_start_windows() {
        use stau_core::{Event, EventLog, WindowPolicy};

        // Steps a(0)->b(25) and a(15)->b(28): both exit in window 2.
        let events = vec![
            Event::new("c1", "a", 0.0),
            Event::new("c1", "b", 25.0),
            Event::new("c2", "a", 15.0),
            Event::new("c2", "b", 28.0),
        ];
        let log = EventLog::new(
            events,
            vec![(0, 1), (2, 3)],
            vec![vec![1], vec![], vec![3], vec![]],
            vec![vec![], vec![0], vec![], vec![2]],
        )
        .unwrap();
        let windowing = Windowing::build(&log, &WindowPolicy::Width(10.0)).unwrap();

        let mut set = set_of(
            vec![make_hle(0, Aspect::Exit, Entity::segment("a", "b"), 2)],
            vec![cases(&["c1", "c2"])],
        );
        set.instances[0] = vec![Instance::Step(0, 1), Instance::Step(2, 3)];

        let bounds = spread_bounds(&set, &windowing);
        assert_eq!(
            bounds[0],
            SpreadBounds {
                start_first: 0,
                start_last: 1,
                end_first: 2,
                end_last: 2,
            }
        );
    }

    #[test]
    fn sweeps_only_mark_impossible_pairs() {
        // Event 0 ends in windows 6..9 while event 1 starts at 0, so
        // (0, 1) can never nest. The reverse pair stays unmarked.
        let bounds = vec![
            SpreadBounds { start_first: 2, start_last: 2, end_first: 6, end_last: 9 },
            SpreadBounds { start_first: 0, start_last: 0, end_first: 7, end_last: 7 },
        ];
        let excluded = excluded_pairs(&bounds);
        assert!(excluded.contains(&(0, 1)));
        assert!(!excluded.contains(&(1, 0)));
    }

    #[test]
    fn point_spreads_are_left_to_the_exact_test() {
        // Conservative by construction: same-window bounds block the
        // cursor, and the hull test does the rejecting instead.
        let bounds = point_bounds(&[0, 3]);
        assert!(excluded_pairs(&bounds).is_empty());
    }

    #[test]
    fn chain_continuation_with_shared_cases_connects() {
        let set = set_of(
            vec![
                make_hle(0, Aspect::Cross, Entity::segment("a", "b"), 1),
                make_hle(1, Aspect::Cross, Entity::segment("b", "c"), 1),
                make_hle(2, Aspect::Cross, Entity::segment("x", "y"), 1),
            ],
            vec![
                cases(&["c1", "c2"]),
                cases(&["c1", "c2"]),
                cases(&["c1", "c2"]),
            ],
        );
        let bounds = point_bounds(&[1, 1, 1]);

        let graph = build_overlap_graph(&set, &bounds, 0.5);
        assert_eq!(graph.node_count(), 3);
        let (a, b) = (graph.idx(0).unwrap(), graph.idx(1).unwrap());
        // Only the continuing segment pair connects, and only forward.
        assert!(graph.has_edge(a, b));
        assert!(!graph.has_edge(b, a));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn weak_case_overlap_blocks_the_edge() {
        let set = set_of(
            vec![
                make_hle(0, Aspect::Cross, Entity::segment("a", "b"), 1),
                make_hle(1, Aspect::Cross, Entity::segment("b", "c"), 1),
            ],
            vec![cases(&["c1", "c2", "c3"]), cases(&["c3", "c4"])],
        );
        let bounds = point_bounds(&[1, 1]);

        // Ratio 1/4 stays under 0.5.
        let graph = build_overlap_graph(&set, &bounds, 0.5);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn disjoint_hulls_block_the_edge() {
        let set = set_of(
            vec![
                make_hle(0, Aspect::Cross, Entity::segment("a", "b"), 1),
                make_hle(1, Aspect::Cross, Entity::segment("b", "c"), 4),
            ],
            vec![cases(&["c1"]), cases(&["c1"])],
        );
        let bounds = point_bounds(&[1, 4]);

        let graph = build_overlap_graph(&set, &bounds, 0.5);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn non_segment_events_stay_isolated() {
        let set = set_of(
            vec![
                make_hle(0, Aspect::Exec, Entity::activity("b"), 1),
                make_hle(1, Aspect::Cross, Entity::segment("b", "c"), 1),
            ],
            vec![cases(&["c1"]), cases(&["c1"])],
        );
        let bounds = point_bounds(&[1, 1]);

        let graph = build_overlap_graph(&set, &bounds, 0.0);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
    }
}
