use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::aspect::Aspect;
use crate::entity::{ComponentType, Entity};
use crate::window::WindowId;

/// Dense id of a high-level event, unique within one run.
pub type HleId = usize;

/// The case ids backing one high-level event.
pub type CaseSet = HashSet<String>;

/// Extremity class of a measured value relative to its thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrafficClass {
    Low,
    Normal,
    High,
}

impl std::fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrafficClass::Low => write!(f, "low"),
            TrafficClass::Normal => write!(f, "normal"),
            TrafficClass::High => write!(f, "high"),
        }
    }
}

/// Which extremity classes produce high-level events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrafficFilter {
    Low,
    High,
    LowAndHigh,
}

impl TrafficFilter {
    pub fn matches(&self, class: TrafficClass) -> bool {
        match self {
            TrafficFilter::Low => class == TrafficClass::Low,
            TrafficFilter::High => class == TrafficClass::High,
            TrafficFilter::LowAndHigh => class != TrafficClass::Normal,
        }
    }
}

/// One detected congestion event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighLevelEvent {
    pub id: HleId,
    pub aspect: Aspect,
    pub entity: Entity,
    pub component: ComponentType,
    pub class: TrafficClass,
    pub value: f64,
    /// Anchor window. Batch/delay events anchor at the later window of
    /// their pair and carry the earlier one in `co_window`.
    pub window: WindowId,
    pub co_window: Option<WindowId>,
}

impl HighLevelEvent {
    /// The window-free identity used for frequency grouping.
    pub fn hla(&self) -> HighLevelActivity {
        HighLevelActivity {
            aspect: self.aspect,
            entity: self.entity.clone(),
            class: self.class,
        }
    }
}

/// The (aspect, entity, class) identity shared by HLEs across windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HighLevelActivity {
    pub aspect: Aspect,
    pub entity: Entity,
    pub class: TrafficClass,
}

impl std::fmt::Display for HighLevelActivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.class, self.aspect, self.entity)
    }
}
