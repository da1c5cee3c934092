use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::ComponentType;
use crate::error::StauError;

/// A congestion measure evaluated per entity per time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Aspect {
    /// Executions of an activity.
    Exec,
    /// Started but not yet executed work targeting an activity.
    ToExec,
    /// Steps queued towards an activity.
    Queue,
    /// Steps entering a segment.
    Enter,
    /// Steps leaving a segment.
    Exit,
    /// Steps traversing a segment.
    Cross,
    /// Average residence time on a segment.
    Wait,
    /// Steps of a segment bundled into the same window pair.
    Batch,
    /// Window distance bridged by the steps of a segment.
    Delay,
    /// Executions by a resource.
    Do,
    /// Outstanding work assigned to a resource.
    Todo,
    /// Resource activity, pending work included.
    Busy,
    /// Steps passed between two distinct resources.
    Handover,
    /// Steps kept by a single resource.
    Workload,
}

/// Every aspect, in declaration order.
pub const ALL_ASPECTS: [Aspect; 14] = [
    Aspect::Exec,
    Aspect::ToExec,
    Aspect::Queue,
    Aspect::Enter,
    Aspect::Exit,
    Aspect::Cross,
    Aspect::Wait,
    Aspect::Batch,
    Aspect::Delay,
    Aspect::Do,
    Aspect::Todo,
    Aspect::Busy,
    Aspect::Handover,
    Aspect::Workload,
];

impl Aspect {
    /// The component type this aspect is measured on.
    pub fn component_type(&self) -> ComponentType {
        match self {
            Aspect::Exec | Aspect::ToExec | Aspect::Queue => ComponentType::Activity,
            Aspect::Enter
            | Aspect::Exit
            | Aspect::Cross
            | Aspect::Wait
            | Aspect::Batch
            | Aspect::Delay
            | Aspect::Handover
            | Aspect::Workload => ComponentType::Segment,
            Aspect::Do | Aspect::Todo | Aspect::Busy => ComponentType::Resource,
        }
    }

    /// True for aspects that can only be evaluated with resource data.
    pub fn needs_resources(&self) -> bool {
        matches!(self, Aspect::Do | Aspect::Todo | Aspect::Busy)
    }

    /// True for aspects keyed by an ordered window pair instead of one window.
    pub fn is_window_pair(&self) -> bool {
        matches!(self, Aspect::Batch | Aspect::Delay)
    }
}

impl std::fmt::Display for Aspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Aspect::Exec => write!(f, "exec"),
            Aspect::ToExec => write!(f, "to-exec"),
            Aspect::Queue => write!(f, "queue"),
            Aspect::Enter => write!(f, "enter"),
            Aspect::Exit => write!(f, "exit"),
            Aspect::Cross => write!(f, "cross"),
            Aspect::Wait => write!(f, "wait"),
            Aspect::Batch => write!(f, "batch"),
            Aspect::Delay => write!(f, "delay"),
            Aspect::Do => write!(f, "do"),
            Aspect::Todo => write!(f, "todo"),
            Aspect::Busy => write!(f, "busy"),
            Aspect::Handover => write!(f, "handover"),
            Aspect::Workload => write!(f, "workload"),
        }
    }
}

impl FromStr for Aspect {
    type Err = StauError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exec" => Ok(Aspect::Exec),
            "to-exec" | "toexec" => Ok(Aspect::ToExec),
            "queue" => Ok(Aspect::Queue),
            "enter" => Ok(Aspect::Enter),
            "exit" => Ok(Aspect::Exit),
            "cross" => Ok(Aspect::Cross),
            "wait" | "wt" => Ok(Aspect::Wait),
            "batch" => Ok(Aspect::Batch),
            "delay" => Ok(Aspect::Delay),
            "do" => Ok(Aspect::Do),
            "todo" => Ok(Aspect::Todo),
            "busy" => Ok(Aspect::Busy),
            "handover" => Ok(Aspect::Handover),
            "workload" => Ok(Aspect::Workload),
            other => Err(StauError::UnknownAspect(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_roundtrip_through_display() {
        for aspect in ALL_ASPECTS {
            let parsed: Aspect = aspect.to_string().parse().unwrap();
            assert_eq!(parsed, aspect);
        }
    }

    #[test]
    fn aspect_unknown_name_is_config_error() {
        let err = "throughput".parse::<Aspect>().unwrap_err();
        assert!(matches!(err, StauError::UnknownAspect(_)));
    }

    #[test]
    fn aspect_component_types() {
        assert_eq!(Aspect::Exec.component_type(), ComponentType::Activity);
        assert_eq!(Aspect::Wait.component_type(), ComponentType::Segment);
        assert_eq!(Aspect::Busy.component_type(), ComponentType::Resource);
    }

    #[test]
    fn aspect_resource_requirements() {
        assert!(Aspect::Todo.needs_resources());
        assert!(!Aspect::Handover.needs_resources());
        assert!(Aspect::Delay.is_window_pair());
        assert!(!Aspect::Wait.is_window_pair());
    }
}
