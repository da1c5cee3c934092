//! Extremity thresholds over measurement pools and value classification.
//!
//! Zeros are excluded from every pool: inactive windows represent idle
//! time, and counting them as low load would drag both thresholds down.

use std::collections::HashMap;

use stau_core::{Aspect, StauError, ThresholdGranularity, TrafficClass};

use crate::pipeline::features::{Evaluation, Feature};

/// Low/high threshold pair per aspect or per (aspect, entity).
#[derive(Debug, Clone)]
pub struct ThresholdTable {
    granularity: ThresholdGranularity,
    by_aspect: HashMap<Aspect, (f64, f64)>,
    by_feature: HashMap<Feature, (f64, f64)>,
}

impl ThresholdTable {
    pub fn build(
        evaluation: &Evaluation,
        granularity: ThresholdGranularity,
        level: f64,
    ) -> Result<Self, StauError> {
        let mut table = Self {
            granularity,
            by_aspect: HashMap::new(),
            by_feature: HashMap::new(),
        };
        match granularity {
            ThresholdGranularity::PerAspect => {
                for (aspect, pool) in pool_values(evaluation, |feature| feature.aspect) {
                    table.by_aspect.insert(aspect, thresholds(&pool, level)?);
                }
            }
            ThresholdGranularity::PerEntity => {
                for (feature, pool) in pool_values(evaluation, |feature| feature.clone()) {
                    table.by_feature.insert(feature, thresholds(&pool, level)?);
                }
            }
        }
        Ok(table)
    }

    /// Threshold pair for a feature; unknown features get the sentinel pair
    /// so nothing ever fires on them.
    pub fn lookup(&self, feature: &Feature) -> (f64, f64) {
        let found = match self.granularity {
            ThresholdGranularity::PerAspect => self.by_aspect.get(&feature.aspect),
            ThresholdGranularity::PerEntity => self.by_feature.get(feature),
        };
        found.copied().unwrap_or((0.0, f64::INFINITY))
    }
}

/// Gathers one value pool per key across all windows and window pairs.
/// Window-pair measurements pool the classified quantity: the window
/// distance for delay, the step count otherwise.
fn pool_values<K, F>(evaluation: &Evaluation, key: F) -> HashMap<K, Vec<f64>>
where
    K: std::hash::Hash + Eq,
    F: Fn(&Feature) -> K,
{
    let mut pools: HashMap<K, Vec<f64>> = HashMap::new();
    for window in &evaluation.by_window {
        for (feature, value) in window {
            pools.entry(key(feature)).or_default().push(*value);
        }
    }
    for measures in evaluation.by_pair.values() {
        for (feature, measure) in measures {
            let value = match feature.aspect {
                Aspect::Delay => measure.distance as f64,
                _ => measure.count as f64,
            };
            pools.entry(key(feature)).or_default().push(value);
        }
    }
    pools
}

/// Low/high extremity thresholds over the non-zero values of a pool.
///
/// Requires 50 <= level < 100. A pool that is empty after zero removal, or
/// holds a single distinct non-zero value, collapses to (0, +inf): a near
/// constant measurement must not generate events.
pub fn thresholds(values: &[f64], level: f64) -> Result<(f64, f64), StauError> {
    if !(50.0..100.0).contains(&level) {
        return Err(StauError::Percentile(level));
    }

    let mut positive: Vec<f64> = values.iter().copied().filter(|v| *v != 0.0).collect();
    positive.sort_by(f64::total_cmp);
    let mut distinct = positive.clone();
    distinct.dedup();
    if positive.is_empty() || distinct.len() == 1 {
        return Ok((0.0, f64::INFINITY));
    }

    let high = percentile(&positive, level);
    let low = percentile(&positive, 100.0 - level);
    Ok((low, high))
}

/// Percentile with linear interpolation between order statistics.
/// `sorted` must be ascending and non-empty; `level` is on the 0-100 scale.
fn percentile(sorted: &[f64], level: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = level / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Splits a value against a threshold pair; values on either boundary
/// count as normal.
pub fn classify(value: f64, low: f64, high: f64) -> TrafficClass {
    debug_assert!(low <= high);
    if value < low {
        TrafficClass::Low
    } else if value > high {
        TrafficClass::High
    } else {
        TrafficClass::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stau_core::Entity;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let pool: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let (low, high) = thresholds(&pool, 90.0).unwrap();
        assert!(close(high, 9.1));
        assert!(close(low, 1.9));
    }

    #[test]
    fn zeros_are_excluded_from_the_pool() {
        let pool = vec![0.0, 0.0, 0.0, 2.0, 4.0];
        let (low, high) = thresholds(&pool, 75.0).unwrap();
        // Pool reduces to [2, 4].
        assert!(close(high, 3.5));
        assert!(close(low, 2.5));
    }

    #[test]
    fn degenerate_pools_collapse_to_the_sentinel_pair() {
        assert_eq!(thresholds(&[0.0, 0.0], 90.0).unwrap(), (0.0, f64::INFINITY));
        assert_eq!(
            thresholds(&[0.0, 5.0, 5.0, 5.0], 90.0).unwrap(),
            (0.0, f64::INFINITY)
        );
        assert_eq!(thresholds(&[], 90.0).unwrap(), (0.0, f64::INFINITY));
    }

    #[test]
    fn sentinel_pair_never_fires() {
        assert_eq!(classify(1e12, 0.0, f64::INFINITY), TrafficClass::Normal);
        assert_eq!(classify(0.0, 0.0, f64::INFINITY), TrafficClass::Normal);
    }

    #[test]
    fn out_of_range_level_is_rejected() {
        assert!(matches!(
            thresholds(&[1.0, 2.0], 49.9),
            Err(StauError::Percentile(_))
        ));
        assert!(matches!(
            thresholds(&[1.0, 2.0], 100.0),
            Err(StauError::Percentile(_))
        ));
    }

    #[test]
    fn boundary_values_classify_as_normal() {
        assert_eq!(classify(2.0, 2.0, 8.0), TrafficClass::Normal);
        assert_eq!(classify(8.0, 2.0, 8.0), TrafficClass::Normal);
        assert_eq!(classify(1.9, 2.0, 8.0), TrafficClass::Low);
        assert_eq!(classify(8.1, 2.0, 8.0), TrafficClass::High);
    }

    fn two_window_evaluation() -> Evaluation {
        let exec_a = Feature::new(Aspect::Exec, Entity::activity("a"));
        let exec_b = Feature::new(Aspect::Exec, Entity::activity("b"));
        let mut w0 = HashMap::new();
        w0.insert(exec_a.clone(), 1.0);
        w0.insert(exec_b.clone(), 2.0);
        let mut w1 = HashMap::new();
        w1.insert(exec_a, 5.0);
        w1.insert(exec_b, 10.0);
        Evaluation {
            by_window: vec![w0, w1],
            by_pair: HashMap::new(),
        }
    }

    #[test]
    fn granularity_changes_the_pool_and_the_verdict() {
        let evaluation = two_window_evaluation();
        let exec_a = Feature::new(Aspect::Exec, Entity::activity("a"));

        // Per entity: exec-a pools [1, 5], so 5 is extreme.
        let per_entity =
            ThresholdTable::build(&evaluation, ThresholdGranularity::PerEntity, 80.0).unwrap();
        let (low, high) = per_entity.lookup(&exec_a);
        assert_eq!(classify(5.0, low, high), TrafficClass::High);

        // Per aspect: exec pools [1, 2, 5, 10], and 5 sits inside the bulk.
        let per_aspect =
            ThresholdTable::build(&evaluation, ThresholdGranularity::PerAspect, 80.0).unwrap();
        let (low, high) = per_aspect.lookup(&exec_a);
        assert_eq!(classify(5.0, low, high), TrafficClass::Normal);
    }

    #[test]
    fn unknown_features_get_the_sentinel_pair() {
        let evaluation = two_window_evaluation();
        let table =
            ThresholdTable::build(&evaluation, ThresholdGranularity::PerEntity, 80.0).unwrap();
        let unseen = Feature::new(Aspect::Busy, Entity::resource("nobody"));
        assert_eq!(table.lookup(&unseen), (0.0, f64::INFINITY));
    }
}
