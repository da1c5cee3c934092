pub mod aspect;
pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod hle;
pub mod window;

pub use aspect::{Aspect, ALL_ASPECTS};
pub use config::{EntitySelection, FrequencyThreshold, MiningConfig, ThresholdGranularity};
pub use entity::{canonical_relation, ComponentType, Entity, RelationKind};
pub use error::StauError;
pub use event::{ComponentSets, Event, EventId, EventLog};
pub use hle::{CaseSet, HighLevelActivity, HighLevelEvent, HleId, TrafficClass, TrafficFilter};
pub use window::{TimeUnit, Window, WindowId, WindowPolicy};
