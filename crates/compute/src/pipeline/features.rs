//! Instance collection and measurement evaluation.
//!
//! Every aspect is measured per window (or per window pair) by first
//! gathering the raw instances behind it, then reducing each instance list
//! to a number. The instance lists survive past evaluation: case sets and
//! window spreads downstream are derived from them.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use stau_core::{Aspect, CaseSet, ComponentType, Entity, EventId, EventLog, MiningConfig, WindowId};

use crate::pipeline::windowing::Windowing;

/// Measurement key: one aspect of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Feature {
    pub aspect: Aspect,
    pub entity: Entity,
}

impl Feature {
    pub fn new(aspect: Aspect, entity: Entity) -> Self {
        Self { aspect, entity }
    }
}

/// The unit of evidence behind a measurement: a lone event, or an event
/// pair forming one step over a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instance {
    Event(EventId),
    Step(EventId, EventId),
}

impl Instance {
    /// Case of the underlying event; both events of a step share it.
    pub fn case<'a>(&self, log: &'a EventLog) -> &'a str {
        match self {
            Instance::Event(i) => &log.events[*i].case,
            Instance::Step(i, _) => &log.events[*i].case,
        }
    }

    pub fn first(&self) -> EventId {
        match self {
            Instance::Event(i) => *i,
            Instance::Step(i, _) => *i,
        }
    }

    pub fn second(&self) -> EventId {
        match self {
            Instance::Event(i) => *i,
            Instance::Step(_, j) => *j,
        }
    }
}

/// The entities selected for one run.
#[derive(Debug, Clone)]
pub struct Focus {
    pub activities: BTreeSet<String>,
    pub resources: BTreeSet<String>,
    pub segments: BTreeSet<(String, String)>,
}

impl Focus {
    /// Applies the configured selections to the observed components.
    ///
    /// A segment is in focus only when both of its endpoint activities are.
    /// With resource analysis disabled the resource focus stays empty, so
    /// resource-keyed aspects collect nothing.
    pub fn from_config(log: &EventLog, config: &MiningConfig) -> Self {
        let activities = log.focus_activities(&config.activity_focus);
        let resources = if config.resource_info {
            log.focus_resources(&config.resource_focus)
        } else {
            BTreeSet::new()
        };
        let segments = log
            .components()
            .segments
            .into_iter()
            .filter(|(from, to)| activities.contains(from) && activities.contains(to))
            .collect();
        Self {
            activities,
            resources,
            segments,
        }
    }
}

/// Raw instance lists, written once by [`InstanceTable::collect`] and
/// read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct InstanceTable {
    /// Indexed by window id. Every selected window-keyed feature is present
    /// in every window, possibly with an empty list, so idle windows still
    /// evaluate to zero and pass through classification.
    pub by_window: Vec<HashMap<Feature, Vec<Instance>>>,
    /// Sparse over the observed ordered window pairs (w_i < w_j).
    pub by_pair: HashMap<(WindowId, WindowId), HashMap<Feature, Vec<Instance>>>,
}

impl InstanceTable {
    pub fn collect(
        log: &EventLog,
        windowing: &Windowing,
        focus: &Focus,
        aspects: &[Aspect],
    ) -> Self {
        let wants = |aspect: Aspect| aspects.contains(&aspect);

        let mut table = Self {
            by_window: init_windows(windowing.len(), focus, aspects),
            by_pair: HashMap::new(),
        };

        // Events without successors still count as executed work.
        for i in 0..log.len() {
            if !log.is_single(i) {
                continue;
            }
            let w_i = windowing.window_of(i);
            let event = &log.events[i];
            if focus.activities.contains(&event.activity) {
                if wants(Aspect::Exec) {
                    table.push(w_i, Aspect::Exec, Entity::activity(&event.activity), Instance::Event(i));
                }
                if wants(Aspect::ToExec) {
                    table.push(w_i, Aspect::ToExec, Entity::activity(&event.activity), Instance::Event(i));
                }
            }
            if let Some(resource) = &event.resource {
                if focus.resources.contains(resource) {
                    if wants(Aspect::Do) {
                        table.push(w_i, Aspect::Do, Entity::resource(resource), Instance::Event(i));
                    }
                    if wants(Aspect::Busy) {
                        table.push(w_i, Aspect::Busy, Entity::resource(resource), Instance::Event(i));
                    }
                }
            }
        }

        for &(i, j) in &log.steps {
            let (w_i, w_j) = (windowing.window_of(i), windowing.window_of(j));
            let step = Instance::Step(i, j);
            let source = &log.events[i];
            let target = &log.events[j];
            let segment = (source.activity.clone(), target.activity.clone());
            let in_segment_focus = focus.segments.contains(&segment);

            if focus.activities.contains(&source.activity) {
                if wants(Aspect::Exec) {
                    table.push(w_i, Aspect::Exec, Entity::activity(&source.activity), Instance::Event(i));
                }
                if wants(Aspect::ToExec) {
                    table.push(w_i, Aspect::ToExec, Entity::activity(&source.activity), Instance::Event(i));
                }
            }

            if in_segment_focus {
                let entity = Entity::segment(&segment.0, &segment.1);
                if wants(Aspect::Enter) {
                    table.push(w_i, Aspect::Enter, entity.clone(), step);
                }
                if wants(Aspect::Exit) {
                    table.push(w_j, Aspect::Exit, entity.clone(), step);
                }
                if wants(Aspect::Cross) {
                    table.push(w_j, Aspect::Cross, entity.clone(), step);
                }
                if wants(Aspect::Wait) {
                    table.push(w_j, Aspect::Wait, entity.clone(), step);
                }

                if let (Some(source_res), Some(target_res)) = (&source.resource, &target.resource) {
                    if wants(Aspect::Workload)
                        && source_res == target_res
                        && focus.resources.contains(source_res)
                    {
                        table.push(w_j, Aspect::Workload, entity.clone(), step);
                    }
                    if wants(Aspect::Handover)
                        && source_res != target_res
                        && focus.resources.contains(source_res)
                        && focus.resources.contains(target_res)
                    {
                        table.push(w_j, Aspect::Handover, entity.clone(), step);
                    }
                }

                if w_i < w_j {
                    let pair = table.by_pair.entry((w_i, w_j)).or_default();
                    if wants(Aspect::Batch) {
                        pair.entry(Feature::new(Aspect::Batch, entity.clone()))
                            .or_default()
                            .push(step);
                    }
                    if wants(Aspect::Delay) {
                        pair.entry(Feature::new(Aspect::Delay, entity.clone()))
                            .or_default()
                            .push(step);
                    }
                }
            }

            if let Some(resource) = &source.resource {
                if focus.resources.contains(resource) {
                    if wants(Aspect::Do) {
                        table.push(w_i, Aspect::Do, Entity::resource(resource), Instance::Event(i));
                    }
                    if wants(Aspect::Busy) {
                        table.push(w_i, Aspect::Busy, Entity::resource(resource), Instance::Event(i));
                    }
                }
            }

            // Pending work spreads over every window the step is in transit,
            // half-open: the start window included, the end window not.
            for w in w_i..w_j {
                if focus.activities.contains(&target.activity) {
                    if wants(Aspect::ToExec) {
                        table.push(w, Aspect::ToExec, Entity::activity(&target.activity), Instance::Event(j));
                    }
                    if wants(Aspect::Queue) {
                        table.push(w, Aspect::Queue, Entity::activity(&target.activity), step);
                    }
                }
                if in_segment_focus {
                    let entity = Entity::segment(&segment.0, &segment.1);
                    if wants(Aspect::Cross) {
                        table.push(w, Aspect::Cross, entity.clone(), step);
                    }
                    if wants(Aspect::Wait) {
                        table.push(w, Aspect::Wait, entity, step);
                    }
                }
                if let Some(resource) = &target.resource {
                    if focus.resources.contains(resource) {
                        if wants(Aspect::Todo) {
                            table.push(w, Aspect::Todo, Entity::resource(resource), Instance::Event(j));
                        }
                        if wants(Aspect::Busy) {
                            table.push(w, Aspect::Busy, Entity::resource(resource), Instance::Event(j));
                        }
                    }
                }
            }
        }

        debug!(
            windows = table.by_window.len(),
            window_pairs = table.by_pair.len(),
            "collected aspect instances"
        );
        table
    }

    fn push(&mut self, window: WindowId, aspect: Aspect, entity: Entity, instance: Instance) {
        self.by_window[window]
            .entry(Feature::new(aspect, entity))
            .or_default()
            .push(instance);
    }

    /// Cases of the instances behind one window-keyed feature.
    pub fn case_set(&self, window: WindowId, feature: &Feature, log: &EventLog) -> CaseSet {
        match self.by_window[window].get(feature) {
            Some(instances) => instances.iter().map(|i| i.case(log).to_owned()).collect(),
            None => CaseSet::new(),
        }
    }
}

/// Dense init: every selected window-keyed feature starts out with an empty
/// instance list in every window.
fn init_windows(
    window_count: usize,
    focus: &Focus,
    aspects: &[Aspect],
) -> Vec<HashMap<Feature, Vec<Instance>>> {
    let mut templates: Vec<Feature> = Vec::new();
    for &aspect in aspects {
        if aspect.is_window_pair() {
            continue;
        }
        match aspect.component_type() {
            ComponentType::Activity => {
                for activity in &focus.activities {
                    templates.push(Feature::new(aspect, Entity::activity(activity)));
                }
            }
            ComponentType::Resource => {
                for resource in &focus.resources {
                    templates.push(Feature::new(aspect, Entity::resource(resource)));
                }
            }
            ComponentType::Segment => {
                for (from, to) in &focus.segments {
                    templates.push(Feature::new(aspect, Entity::segment(from, to)));
                }
            }
        }
    }

    let mut by_window = Vec::with_capacity(window_count);
    for _ in 0..window_count {
        let mut window = HashMap::with_capacity(templates.len());
        for template in &templates {
            window.insert(template.clone(), Vec::new());
        }
        by_window.push(window);
    }
    by_window
}

/// Measurement of a window-pair feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairMeasure {
    /// Window distance w_j - w_i.
    pub distance: usize,
    /// Number of steps observed on the pair.
    pub count: usize,
}

/// Numeric measurements reduced from the instance lists.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Indexed by window id.
    pub by_window: Vec<HashMap<Feature, f64>>,
    /// Sparse over the observed ordered window pairs.
    pub by_pair: HashMap<(WindowId, WindowId), HashMap<Feature, PairMeasure>>,
}

impl Evaluation {
    pub fn from_instances(table: &InstanceTable, log: &EventLog, windowing: &Windowing) -> Self {
        let mut by_window = Vec::with_capacity(table.by_window.len());
        for (w, features) in table.by_window.iter().enumerate() {
            let mut values = HashMap::with_capacity(features.len());
            for (feature, instances) in features {
                let value = match feature.aspect {
                    Aspect::Wait => average_wait(instances, log, windowing, w),
                    _ => instances.len() as f64,
                };
                values.insert(feature.clone(), value);
            }
            by_window.push(values);
        }

        let mut by_pair = HashMap::new();
        for (&(w_i, w_j), features) in &table.by_pair {
            let mut values = HashMap::with_capacity(features.len());
            for (feature, instances) in features {
                values.insert(
                    feature.clone(),
                    PairMeasure {
                        distance: w_j - w_i,
                        count: instances.len(),
                    },
                );
            }
            by_pair.insert((w_i, w_j), values);
        }

        Self { by_window, by_pair }
    }
}

/// Mean residence time of the steps crossing a segment within one window.
///
/// Interior windows accrue time up to their right border, the terminal
/// window up to the actual completion. The divisor is the crossing count,
/// so windows nothing crossed skip the division and stay at zero.
fn average_wait(
    instances: &[Instance],
    log: &EventLog,
    windowing: &Windowing,
    window: WindowId,
) -> f64 {
    if instances.is_empty() {
        return 0.0;
    }
    let right = windowing.right_border(window);
    let mut total = 0.0;
    for instance in instances {
        if let Instance::Step(i, j) = instance {
            let started = log.events[*i].timestamp;
            if windowing.window_of(*j) == window {
                total += log.events[*j].timestamp - started;
            } else {
                total += right - started;
            }
        }
    }
    total / instances.len() as f64
}
