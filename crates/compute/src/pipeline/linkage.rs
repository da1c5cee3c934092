//! Pairwise entity affinity from co-occurrence statistics.
//!
//! Links are computed over the full event population, never the analysis
//! focus, so the denominators reflect the whole process. One matrix is
//! stored per component-type pair; lookups canonicalize the operand order,
//! which makes every link symmetric to callers.

use std::collections::HashMap;

use tracing::debug;

use stau_core::{canonical_relation, Entity, EventLog, RelationKind};

type Matrix = HashMap<(Entity, Entity), f64>;

/// Normalized link values between all observed entity pairs.
#[derive(Debug, Clone, Default)]
pub struct EntityLinkage {
    matrices: HashMap<RelationKind, Matrix>,
}

impl EntityLinkage {
    /// Counts co-occurrences, turns them into ratios, and normalizes each
    /// matrix by its own maximum.
    pub fn compute(log: &EventLog, resource_info: bool) -> Self {
        let counts = OccurrenceCounts::collect(log, resource_info);
        let mut matrices = HashMap::new();

        matrices.insert(
            RelationKind::ActivityActivity,
            directional_matrix(&counts.aa, &counts.activities, |a| Entity::activity(a)),
        );
        matrices.insert(
            RelationKind::SegmentSegment,
            directional_matrix(&counts.ss, &counts.segments, |(a, b)| Entity::segment(a, b)),
        );

        // One directed step count serves both activity-segment ratios.
        let mut activity_segment: Matrix = HashMap::new();
        for (segment, &steps) in &counts.aa {
            let entity = Entity::segment(&segment.0, &segment.1);
            let mut endpoints = vec![segment.0.as_str()];
            if segment.1 != segment.0 {
                endpoints.push(segment.1.as_str());
            }
            for endpoint in endpoints {
                let events = counts.activities.get(endpoint).copied().unwrap_or(0);
                activity_segment.insert(
                    (Entity::activity(endpoint), entity.clone()),
                    ratio(steps as f64, events as f64),
                );
            }
        }
        matrices.insert(RelationKind::ActivitySegment, activity_segment);

        matrices.insert(
            RelationKind::ResourceResource,
            directional_matrix(&counts.rr, &counts.resources, |r| Entity::resource(r)),
        );

        let mut activity_resource: Matrix = HashMap::new();
        for ((activity, resource), &shared) in &counts.ar {
            let a_events = counts.activities.get(activity).copied().unwrap_or(0);
            let r_events = counts.resources.get(resource).copied().unwrap_or(0);
            let value = ratio(shared as f64, r_events as f64)
                .max(ratio(shared as f64, a_events as f64));
            activity_resource.insert(
                (Entity::activity(activity), Entity::resource(resource)),
                value,
            );
        }
        matrices.insert(RelationKind::ActivityResource, activity_resource);

        let mut resource_segment: Matrix = HashMap::new();
        for ((resource, segment), &credit) in &counts.rs {
            let r_events = counts.resources.get(resource).copied().unwrap_or(0);
            let steps = counts.segments.get(segment).copied().unwrap_or(0);
            let value =
                ratio(credit, r_events as f64).max(ratio(credit, steps as f64));
            resource_segment.insert(
                (
                    Entity::resource(resource),
                    Entity::segment(&segment.0, &segment.1),
                ),
                value,
            );
        }
        matrices.insert(RelationKind::ResourceSegment, resource_segment);

        for matrix in matrices.values_mut() {
            normalize(matrix);
        }

        debug!(
            activity_pairs = matrices[&RelationKind::ActivityActivity].len(),
            segment_pairs = matrices[&RelationKind::SegmentSegment].len(),
            resource_pairs = matrices[&RelationKind::ResourceResource].len(),
            "computed entity links"
        );
        Self { matrices }
    }

    /// Replaces each matrix's values by uniform ranks: the k-th smallest
    /// distinct positive value maps to k/K, zero stays zero. Flattens skewed
    /// affinity distributions while preserving strict order.
    pub fn uniform_spread(&mut self) {
        for matrix in self.matrices.values_mut() {
            let mut distinct: Vec<f64> = matrix.values().copied().filter(|v| *v > 0.0).collect();
            distinct.sort_by(f64::total_cmp);
            distinct.dedup();
            if distinct.is_empty() {
                continue;
            }
            let normalizer = distinct.len() as f64;
            for value in matrix.values_mut() {
                if *value > 0.0 {
                    let rank = distinct.partition_point(|d| d < value);
                    *value = (rank + 1) as f64 / normalizer;
                }
            }
        }
    }

    /// The link between two entities, in either operand order. Pairs that
    /// never co-occurred are 0.
    pub fn value(&self, x: &Entity, y: &Entity) -> f64 {
        let (kind, swapped) = canonical_relation(x.component_type(), y.component_type());
        let (first, second) = if swapped { (y, x) } else { (x, y) };
        let key = if first.component_type() == second.component_type() && first > second {
            (second.clone(), first.clone())
        } else {
            (first.clone(), second.clone())
        };
        self.matrices
            .get(&kind)
            .and_then(|matrix| matrix.get(&key))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Raw co-occurrence tallies over the whole log.
#[derive(Debug, Default)]
struct OccurrenceCounts {
    activities: HashMap<String, usize>,
    resources: HashMap<String, usize>,
    /// Steps per observed segment.
    segments: HashMap<(String, String), usize>,
    /// Directed steps per activity pair; equals `segments` on observed keys.
    aa: HashMap<(String, String), usize>,
    /// Consecutive segment pairs through a shared middle event.
    ss: HashMap<((String, String), (String, String)), usize>,
    /// Directed resource pairs per step.
    rr: HashMap<(String, String), usize>,
    /// Events shared by an activity and a resource.
    ar: HashMap<(String, String), usize>,
    /// Half a credit per step endpoint executed by the resource.
    rs: HashMap<(String, (String, String)), f64>,
}

impl OccurrenceCounts {
    fn collect(log: &EventLog, resource_info: bool) -> Self {
        let mut counts = Self::default();

        for (i, event) in log.events.iter().enumerate() {
            *counts.activities.entry(event.activity.clone()).or_default() += 1;

            // Interior events chain their incoming segment to each outgoing one.
            if !log.releases[i].is_empty() && !log.triggers[i].is_empty() {
                for &previous in &log.releases[i] {
                    for &next in &log.triggers[i] {
                        let incoming =
                            (log.events[previous].activity.clone(), event.activity.clone());
                        let outgoing = (event.activity.clone(), log.events[next].activity.clone());
                        *counts.ss.entry((incoming, outgoing)).or_default() += 1;
                    }
                }
            }

            if resource_info {
                if let Some(resource) = &event.resource {
                    *counts.resources.entry(resource.clone()).or_default() += 1;
                    *counts
                        .ar
                        .entry((event.activity.clone(), resource.clone()))
                        .or_default() += 1;
                }
            }
        }

        for &(i, j) in &log.steps {
            let segment = (log.events[i].activity.clone(), log.events[j].activity.clone());
            *counts.aa.entry(segment.clone()).or_default() += 1;
            *counts.segments.entry(segment.clone()).or_default() += 1;

            if resource_info {
                if let (Some(source), Some(target)) =
                    (&log.events[i].resource, &log.events[j].resource)
                {
                    *counts
                        .rr
                        .entry((source.clone(), target.clone()))
                        .or_default() += 1;
                    *counts.rs.entry((source.clone(), segment.clone())).or_default() += 0.5;
                    *counts.rs.entry((target.clone(), segment)).or_default() += 0.5;
                }
            }
        }

        counts
    }
}

/// Same-component-type matrix from directed pair counts: the value of an
/// unordered pair is the larger of its two directed ratios, stored once
/// under the Ord-canonical key.
fn directional_matrix<K>(
    pairs: &HashMap<(K, K), usize>,
    occurrences: &HashMap<K, usize>,
    entity: impl Fn(&K) -> Entity,
) -> Matrix
where
    K: Clone + Eq + std::hash::Hash + Ord,
{
    let mut matrix = Matrix::new();
    for (x, y) in pairs.keys() {
        let forward = pairs.get(&(x.clone(), y.clone())).copied().unwrap_or(0);
        let backward = pairs.get(&(y.clone(), x.clone())).copied().unwrap_or(0);
        let x_total = occurrences.get(x).copied().unwrap_or(0);
        let y_total = occurrences.get(y).copied().unwrap_or(0);
        let value = ratio(forward as f64, x_total as f64)
            .max(ratio(backward as f64, y_total as f64));

        let (first, second) = if x <= y { (x, y) } else { (y, x) };
        matrix.insert((entity(first), entity(second)), value);
    }
    matrix
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Rescales a matrix so its maximum becomes 1. All-zero matrices stay put.
fn normalize(matrix: &mut Matrix) {
    let max = matrix.values().fold(0.0_f64, |acc, v| acc.max(*v));
    if max > 0.0 {
        for value in matrix.values_mut() {
            *value /= max;
        }
    }
}
