//! Turns classified measurements into high-level events.
//!
//! Windows are processed in ascending order, then window pairs; ids grow
//! strictly across the whole run. Each window contributes a frequency
//! delta that is folded into the running totals per high-level activity.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::info;

use stau_core::{
    Aspect, CaseSet, EventLog, HighLevelActivity, HighLevelEvent, HleId, MiningConfig,
    TrafficClass, TrafficFilter, WindowId,
};

use crate::pipeline::features::{Evaluation, Feature, Instance, InstanceTable, PairMeasure};
use crate::pipeline::thresholds::{classify, ThresholdTable};

/// Delay events below this many underlying steps are dropped: a handful of
/// straggling steps is noise, not a bundle.
pub const MIN_DELAY_SUPPORT: usize = 10;

/// All high-level events of one run plus the provenance downstream
/// correlation needs.
#[derive(Debug, Clone, Default)]
pub struct HleSet {
    /// Indexed by id.
    pub hles: Vec<HighLevelEvent>,
    /// Anchored event ids per window, every window present in ascending
    /// order. Empty entries mark quiet windows.
    pub by_window: IndexMap<WindowId, Vec<HleId>>,
    /// Occurrence totals per high-level activity.
    pub frequencies: HashMap<HighLevelActivity, usize>,
    /// Per event, the cases of its instances. Indexed by id.
    pub case_sets: Vec<CaseSet>,
    /// Per event, the instances that produced it. Indexed by id.
    pub instances: Vec<Vec<Instance>>,
}

impl HleSet {
    pub fn len(&self) -> usize {
        self.hles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hles.is_empty()
    }
}

/// One classified measurement that passed the traffic filter.
struct Emission {
    feature: Feature,
    class: TrafficClass,
    value: f64,
}

pub fn generate(
    log: &EventLog,
    table: &InstanceTable,
    evaluation: &Evaluation,
    thresholds: &ThresholdTable,
    config: &MiningConfig,
) -> HleSet {
    let mut set = HleSet::default();
    for w in 0..evaluation.by_window.len() {
        set.by_window.insert(w, Vec::new());
    }

    for (w, values) in evaluation.by_window.iter().enumerate() {
        let mut delta: HashMap<HighLevelActivity, usize> = HashMap::new();
        for emission in classify_window(values, thresholds, config.traffic) {
            let instances = table.by_window[w]
                .get(&emission.feature)
                .cloned()
                .unwrap_or_default();
            let id = push_hle(&mut set, emission, w, None, instances, log);
            *delta.entry(set.hles[id].hla()).or_insert(0) += 1;
        }
        merge_delta(&mut set.frequencies, delta);
    }

    // Pairs after windows, in ascending pair order, so ids stay reproducible.
    let mut pairs: Vec<(WindowId, WindowId)> = evaluation.by_pair.keys().copied().collect();
    pairs.sort_unstable();
    for pair in pairs {
        let mut delta: HashMap<HighLevelActivity, usize> = HashMap::new();
        let mut measures: Vec<(&Feature, &PairMeasure)> =
            evaluation.by_pair[&pair].iter().collect();
        measures.sort_by(|a, b| a.0.cmp(b.0));

        for (feature, measure) in measures {
            let value = match feature.aspect {
                Aspect::Delay => measure.distance as f64,
                _ => measure.count as f64,
            };
            let (low, high) = thresholds.lookup(feature);
            let class = classify(value, low, high);
            if !config.traffic.matches(class) {
                continue;
            }
            if feature.aspect == Aspect::Delay && measure.count < MIN_DELAY_SUPPORT {
                continue;
            }
            let instances = table
                .by_pair
                .get(&pair)
                .and_then(|features| features.get(feature))
                .cloned()
                .unwrap_or_default();
            let emission = Emission {
                feature: feature.clone(),
                class,
                value,
            };
            let id = push_hle(&mut set, emission, pair.1, Some(pair.0), instances, log);
            *delta.entry(set.hles[id].hla()).or_insert(0) += 1;
        }
        merge_delta(&mut set.frequencies, delta);
    }

    info!(hles = set.len(), "detected high-level events");
    set
}

fn classify_window(
    values: &HashMap<Feature, f64>,
    thresholds: &ThresholdTable,
    traffic: TrafficFilter,
) -> Vec<Emission> {
    let mut sorted: Vec<(&Feature, &f64)> = values.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut emissions = Vec::new();
    for (feature, value) in sorted {
        let (low, high) = thresholds.lookup(feature);
        let class = classify(*value, low, high);
        if traffic.matches(class) {
            emissions.push(Emission {
                feature: feature.clone(),
                class,
                value: *value,
            });
        }
    }
    emissions
}

fn push_hle(
    set: &mut HleSet,
    emission: Emission,
    window: WindowId,
    co_window: Option<WindowId>,
    instances: Vec<Instance>,
    log: &EventLog,
) -> HleId {
    let id = set.hles.len();
    let component = emission.feature.entity.component_type();
    set.hles.push(HighLevelEvent {
        id,
        aspect: emission.feature.aspect,
        entity: emission.feature.entity,
        component,
        class: emission.class,
        value: emission.value,
        window,
        co_window,
    });
    set.case_sets
        .push(instances.iter().map(|i| i.case(log).to_owned()).collect());
    set.instances.push(instances);
    set.by_window.entry(window).or_default().push(id);
    id
}

fn merge_delta(
    totals: &mut HashMap<HighLevelActivity, usize>,
    delta: HashMap<HighLevelActivity, usize>,
) {
    for (hla, count) in delta {
        *totals.entry(hla).or_insert(0) += count;
    }
}
