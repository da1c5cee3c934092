use serde::{Deserialize, Serialize};

use crate::aspect::Aspect;
use crate::error::StauError;
use crate::hle::TrafficFilter;
use crate::window::{TimeUnit, WindowPolicy};

// ── Selection knobs ───────────────────────────────────────────

/// Which entities of one component type are under analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntitySelection {
    /// Every entity observed in the log.
    All,
    /// An explicit allow-list, intersected with the observed entities.
    Names(Vec<String>),
    /// The most frequent entities covering this share of all events.
    Coverage(f64),
}

/// Threshold pooling granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdGranularity {
    /// One threshold pair per aspect, pooled over all its entities.
    PerAspect,
    /// One threshold pair per (aspect, entity).
    PerEntity,
}

/// Frequency cut applied to high-level activities or paths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FrequencyThreshold {
    /// Keep everything.
    All,
    /// Keep the most frequent items covering this share of total frequency.
    Coverage(f64),
    /// Keep the n most frequent items, ties with the n-th value included.
    TopN(usize),
}

// ── Mining configuration ──────────────────────────────────────

/// Full configuration of one mining run. Validation is eager: a config
/// that passes [`MiningConfig::validate`] cannot fail on parameters later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningConfig {
    pub window: WindowPolicy,
    pub traffic: TrafficFilter,
    /// Aspects to evaluate.
    pub aspects: Vec<Aspect>,
    /// Extremity percentile as a fraction, e.g. 0.9 for the 90th percentile.
    pub percentile: f64,
    pub granularity: ThresholdGranularity,
    /// Whether resource fields are trustworthy enough to analyze.
    pub resource_info: bool,
    pub activity_focus: EntitySelection,
    pub resource_focus: EntitySelection,
    /// Minimum link value for a cascade-graph edge.
    pub link_threshold: f64,
    /// Flatten link matrices to uniform ranks before use.
    pub uniform_spread: bool,
    /// Minimum case-overlap ratio for a path-graph edge.
    pub overlap_threshold: f64,
    /// Minimum running case-overlap ratio while extending a path.
    pub path_threshold: f64,
    /// Keep only DFS-terminal paths instead of every prefix.
    pub only_maximal: bool,
    /// Frequency cut for high-level activities and activity paths.
    pub frequency: FrequencyThreshold,
    /// Drop HLA paths observed fewer than this many times (0 keeps all).
    pub min_path_frequency: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            window: WindowPolicy::Unit(TimeUnit::Days),
            traffic: TrafficFilter::High,
            aspects: vec![
                Aspect::Enter,
                Aspect::Exit,
                Aspect::Handover,
                Aspect::Workload,
                Aspect::Batch,
                Aspect::Delay,
            ],
            percentile: 0.9,
            granularity: ThresholdGranularity::PerEntity,
            resource_info: true,
            activity_focus: EntitySelection::All,
            resource_focus: EntitySelection::All,
            link_threshold: 0.5,
            uniform_spread: false,
            overlap_threshold: 0.5,
            path_threshold: 0.5,
            only_maximal: true,
            frequency: FrequencyThreshold::Coverage(0.8),
            min_path_frequency: 0,
        }
    }
}

impl MiningConfig {
    /// Validates every parameter before any computation runs.
    pub fn validate(&self) -> Result<(), StauError> {
        self.window.validate()?;

        if !(self.percentile > 0.0 && self.percentile < 1.0) {
            return Err(StauError::Config(format!(
                "Extremity percentile must lie in (0, 1), got {}",
                self.percentile
            )));
        }
        if !(self.link_threshold > 0.0 && self.link_threshold < 1.0) {
            return Err(StauError::Config(format!(
                "Link threshold must lie in (0, 1), got {}",
                self.link_threshold
            )));
        }
        for (name, value) in [
            ("Overlap threshold", self.overlap_threshold),
            ("Path threshold", self.path_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(StauError::Config(format!(
                    "{} must lie in [0, 1], got {}",
                    name, value
                )));
            }
        }

        match self.frequency {
            FrequencyThreshold::Coverage(f) if !(f > 0.0 && f < 1.0) => {
                return Err(StauError::Config(format!(
                    "Frequency coverage must lie in (0, 1), got {}",
                    f
                )));
            }
            FrequencyThreshold::TopN(0) => {
                return Err(StauError::Config(
                    "Frequency top-n must be positive".to_string(),
                ));
            }
            _ => {}
        }

        for selection in [&self.activity_focus, &self.resource_focus] {
            if let EntitySelection::Coverage(f) = selection {
                if !(*f > 0.0 && *f <= 1.0) {
                    return Err(StauError::Config(format!(
                        "Entity coverage must lie in (0, 1], got {}",
                        f
                    )));
                }
            }
        }

        // Resource-based aspects cannot be computed without resource data.
        let resource_aspects: Vec<&Aspect> = self
            .aspects
            .iter()
            .filter(|a| a.needs_resources())
            .collect();
        if !resource_aspects.is_empty() {
            if !self.resource_info {
                return Err(StauError::Config(format!(
                    "Aspect '{}' needs resource information, but resource_info is off",
                    resource_aspects[0]
                )));
            }
            if self.resource_focus == EntitySelection::Names(Vec::new()) {
                return Err(StauError::Config(
                    "Resource aspects selected but the resource focus is empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// The percentile on the 0-100 scale used by the threshold stage.
    pub fn percentile_level(&self) -> f64 {
        self.percentile * 100.0
    }

    /// True when any selected aspect is keyed by a window pair.
    pub fn wants_window_pairs(&self) -> bool {
        self.aspects.iter().any(|a| a.is_window_pair())
    }
}
