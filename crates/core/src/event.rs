use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::EntitySelection;
use crate::error::StauError;

/// Dense index of an event within its [`EventLog`].
pub type EventId = usize;

/// One low-level event as handed over by log ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub case: String,
    pub activity: String,
    /// Seconds since the log epoch, non-negative.
    pub timestamp: f64,
    pub resource: Option<String>,
    /// Case-boundary flags set by ingestion.
    pub is_start: bool,
    pub is_end: bool,
}

impl Event {
    pub fn new(case: impl Into<String>, activity: impl Into<String>, timestamp: f64) -> Self {
        Self {
            case: case.into(),
            activity: activity.into(),
            timestamp,
            resource: None,
            is_start: false,
            is_end: false,
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }
}

/// A materialized batch of events plus the step structure derived by the
/// ingestion collaborator.
///
/// `steps` holds directly-follows pairs (source, target). `triggers[i]` are
/// the step partners event i originates, `releases[j]` the partners event j
/// terminates; both are indexed by event id and empty for events without
/// successors/predecessors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    pub events: Vec<Event>,
    pub steps: Vec<(EventId, EventId)>,
    pub triggers: Vec<Vec<EventId>>,
    pub releases: Vec<Vec<EventId>>,
}

/// The activity, resource, and segment populations of a log.
#[derive(Debug, Clone, Default)]
pub struct ComponentSets {
    pub activities: BTreeSet<String>,
    pub resources: BTreeSet<String>,
    pub segments: BTreeSet<(String, String)>,
}

impl EventLog {
    /// Validates id ranges and adjacency shape.
    pub fn new(
        events: Vec<Event>,
        steps: Vec<(EventId, EventId)>,
        triggers: Vec<Vec<EventId>>,
        releases: Vec<Vec<EventId>>,
    ) -> Result<Self, StauError> {
        let n = events.len();
        if triggers.len() != n || releases.len() != n {
            return Err(StauError::Config(format!(
                "Adjacency shape mismatch: {} events, {} trigger rows, {} release rows",
                n,
                triggers.len(),
                releases.len()
            )));
        }
        for &(i, j) in &steps {
            if i >= n {
                return Err(StauError::EventOutOfRange(i, n));
            }
            if j >= n {
                return Err(StauError::EventOutOfRange(j, n));
            }
        }
        Ok(Self {
            events,
            steps,
            triggers,
            releases,
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Event ids sorted by timestamp, stable for equal timestamps.
    pub fn ids_by_timestamp(&self) -> Vec<EventId> {
        let mut ids: Vec<EventId> = (0..self.events.len()).collect();
        ids.sort_by(|&a, &b| self.events[a].timestamp.total_cmp(&self.events[b].timestamp));
        ids
    }

    pub fn min_timestamp(&self) -> Option<f64> {
        self.events
            .iter()
            .map(|e| e.timestamp)
            .min_by(f64::total_cmp)
    }

    pub fn max_timestamp(&self) -> Option<f64> {
        self.events
            .iter()
            .map(|e| e.timestamp)
            .max_by(f64::total_cmp)
    }

    /// True when the event has no successors under the step relation.
    pub fn is_single(&self, id: EventId) -> bool {
        self.triggers[id].is_empty()
    }

    /// True when at least one event carries a resource label.
    pub fn has_resource_info(&self) -> bool {
        self.events.iter().any(|e| e.resource.is_some())
    }

    /// Activity/resource/segment populations of the whole log.
    pub fn components(&self) -> ComponentSets {
        let mut sets = ComponentSets::default();
        for event in &self.events {
            sets.activities.insert(event.activity.clone());
            if let Some(res) = &event.resource {
                sets.resources.insert(res.clone());
            }
        }
        for &(i, j) in &self.steps {
            sets.segments
                .insert((self.events[i].activity.clone(), self.events[j].activity.clone()));
        }
        sets
    }

    /// Activities under analysis according to the selection.
    ///
    /// Coverage keeps the most frequent activities until their cumulative
    /// event share reaches the fraction.
    pub fn focus_activities(&self, selection: &EntitySelection) -> BTreeSet<String> {
        let observed = self.components().activities;
        match selection {
            EntitySelection::All => observed,
            EntitySelection::Names(names) => names
                .iter()
                .filter(|n| observed.contains(*n))
                .cloned()
                .collect(),
            EntitySelection::Coverage(fraction) => {
                let counts = count_labels(self.events.iter().map(|e| e.activity.as_str()));
                cover_most_frequent(&counts, *fraction)
            }
        }
    }

    /// Resources under analysis according to the selection; coverage share
    /// is relative to the events that carry a resource at all.
    pub fn focus_resources(&self, selection: &EntitySelection) -> BTreeSet<String> {
        let observed = self.components().resources;
        match selection {
            EntitySelection::All => observed,
            EntitySelection::Names(names) => names
                .iter()
                .filter(|n| observed.contains(*n))
                .cloned()
                .collect(),
            EntitySelection::Coverage(fraction) => {
                let counts =
                    count_labels(self.events.iter().filter_map(|e| e.resource.as_deref()));
                cover_most_frequent(&counts, *fraction)
            }
        }
    }
}

fn count_labels<'a>(labels: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label.to_string()).or_default() += 1;
    }
    counts
}

/// Most frequent labels until the cumulative count share reaches `fraction`.
/// Ties are broken by label for determinism.
fn cover_most_frequent(counts: &HashMap<String, usize>, fraction: f64) -> BTreeSet<String> {
    let total: usize = counts.values().sum();
    if total == 0 {
        return BTreeSet::new();
    }

    let mut ranked: Vec<(&String, usize)> = counts.iter().map(|(k, &v)| (k, v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let target = fraction * total as f64;
    let mut kept = BTreeSet::new();
    let mut covered = 0usize;
    for (label, count) in ranked {
        if covered as f64 >= target {
            break;
        }
        kept.insert(label.clone());
        covered += count;
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_case_log() -> EventLog {
        // case c1: a(0) -> b(10); case c2: a(5) -> c(20)
        let events = vec![
            Event::new("c1", "a", 0.0).with_resource("r1"),
            Event::new("c1", "b", 10.0).with_resource("r2"),
            Event::new("c2", "a", 5.0).with_resource("r1"),
            Event::new("c2", "c", 20.0),
        ];
        let steps = vec![(0, 1), (2, 3)];
        let triggers = vec![vec![1], vec![], vec![3], vec![]];
        let releases = vec![vec![], vec![0], vec![], vec![2]];
        EventLog::new(events, steps, triggers, releases).unwrap()
    }

    #[test]
    fn log_components() {
        let log = two_case_log();
        let sets = log.components();
        assert_eq!(sets.activities.len(), 3);
        assert_eq!(sets.resources.len(), 2);
        assert!(sets.segments.contains(&("a".to_string(), "b".to_string())));
        assert!(sets.segments.contains(&("a".to_string(), "c".to_string())));
    }

    #[test]
    fn log_rejects_out_of_range_step() {
        let events = vec![Event::new("c", "a", 0.0)];
        let err = EventLog::new(events, vec![(0, 7)], vec![vec![]], vec![vec![]]).unwrap_err();
        assert!(matches!(err, StauError::EventOutOfRange(7, 1)));
    }

    #[test]
    fn log_rejects_adjacency_shape_mismatch() {
        let events = vec![Event::new("c", "a", 0.0)];
        let err = EventLog::new(events, vec![], vec![], vec![vec![]]).unwrap_err();
        assert!(matches!(err, StauError::Config(_)));
    }

    #[test]
    fn ids_by_timestamp_sorts_stably() {
        let log = two_case_log();
        assert_eq!(log.ids_by_timestamp(), vec![0, 2, 1, 3]);
    }

    #[test]
    fn ingested_records_carry_case_boundaries() {
        let json = r#"{
            "case": "c1", "activity": "a", "timestamp": 4.5,
            "resource": null, "is_start": true, "is_end": false
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert!(event.is_start && !event.is_end);
        assert_eq!(event, {
            let mut e = Event::new("c1", "a", 4.5);
            e.is_start = true;
            e
        });
    }

    #[test]
    fn singles_are_events_without_successors() {
        let log = two_case_log();
        assert!(!log.is_single(0));
        assert!(log.is_single(1));
        assert!(log.is_single(3));
    }

    #[test]
    fn focus_activities_by_coverage() {
        // "a" occurs twice of four events; coverage 0.5 keeps only "a".
        let log = two_case_log();
        let focus = log.focus_activities(&EntitySelection::Coverage(0.5));
        assert_eq!(focus, BTreeSet::from(["a".to_string()]));

        let all = log.focus_activities(&EntitySelection::All);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn focus_names_filter_to_observed() {
        let log = two_case_log();
        let focus = log.focus_activities(&EntitySelection::Names(vec![
            "a".to_string(),
            "ghost".to_string(),
        ]));
        assert_eq!(focus, BTreeSet::from(["a".to_string()]));
    }

    #[test]
    fn focus_resources_relative_to_resourced_events() {
        // r1 covers two of three resourced events.
        let log = two_case_log();
        let focus = log.focus_resources(&EntitySelection::Coverage(0.6));
        assert_eq!(focus, BTreeSet::from(["r1".to_string()]));
    }
}
