//! Frequency filtering of high-level activities and activity paths.

use std::collections::HashMap;

use stau_core::FrequencyThreshold;

/// Applies a frequency cut to any keyed frequency map.
///
/// Keys come back ranked by descending frequency, ties in key order, so the
/// result is deterministic regardless of map iteration order.
pub fn filter_by_frequency<K>(
    frequencies: &HashMap<K, usize>,
    threshold: FrequencyThreshold,
) -> Vec<K>
where
    K: Clone + Ord,
{
    let mut ranked: Vec<(&K, usize)> = frequencies.iter().map(|(k, &v)| (k, v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    match threshold {
        FrequencyThreshold::All => ranked.into_iter().map(|(k, _)| k.clone()).collect(),
        FrequencyThreshold::Coverage(fraction) => {
            let total: usize = frequencies.values().sum();
            let target = fraction * total as f64;
            let mut kept = Vec::new();
            let mut cumulative = 0usize;
            for (key, count) in ranked {
                cumulative += count;
                kept.push(key.clone());
                if cumulative as f64 >= target {
                    break;
                }
            }
            kept
        }
        FrequencyThreshold::TopN(n) => {
            let mut distinct: Vec<usize> = ranked.iter().map(|(_, v)| *v).collect();
            distinct.sort_unstable();
            distinct.dedup();
            let n = n.min(distinct.len());
            if n == 0 {
                return Vec::new();
            }

            let nth_value = ranked[n - 1].1;
            let mut kept: Vec<K> = ranked[..n].iter().map(|(k, _)| (*k).clone()).collect();
            for (key, count) in &ranked[n..] {
                if *count == nth_value {
                    kept.push((*key).clone());
                } else {
                    break;
                }
            }
            kept
        }
    }
}
