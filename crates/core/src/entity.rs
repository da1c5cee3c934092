use serde::{Deserialize, Serialize};

/// The kind of process component an entity belongs to.
///
/// Discriminant order defines the canonical operand order for relation
/// lookups (activity before resource before segment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentType {
    Activity,
    Resource,
    Segment,
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentType::Activity => write!(f, "activity"),
            ComponentType::Resource => write!(f, "resource"),
            ComponentType::Segment => write!(f, "segment"),
        }
    }
}

/// A process entity under observation: an activity label, a resource label,
/// or a segment (ordered activity pair standing for a directly-follows
/// transition).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Entity {
    Activity(String),
    Resource(String),
    Segment(String, String),
}

impl Entity {
    pub fn activity(label: impl Into<String>) -> Self {
        Entity::Activity(label.into())
    }

    pub fn resource(label: impl Into<String>) -> Self {
        Entity::Resource(label.into())
    }

    pub fn segment(from: impl Into<String>, to: impl Into<String>) -> Self {
        Entity::Segment(from.into(), to.into())
    }

    pub fn component_type(&self) -> ComponentType {
        match self {
            Entity::Activity(_) => ComponentType::Activity,
            Entity::Resource(_) => ComponentType::Resource,
            Entity::Segment(_, _) => ComponentType::Segment,
        }
    }

    /// Source activity for segments, the label itself for activities.
    pub fn first_activity(&self) -> Option<&str> {
        match self {
            Entity::Activity(a) => Some(a),
            Entity::Segment(a, _) => Some(a),
            Entity::Resource(_) => None,
        }
    }

    /// Target activity for segments, the label itself for activities.
    pub fn second_activity(&self) -> Option<&str> {
        match self {
            Entity::Activity(a) => Some(a),
            Entity::Segment(_, b) => Some(b),
            Entity::Resource(_) => None,
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Activity(a) => write!(f, "{}", a),
            Entity::Resource(r) => write!(f, "{}", r),
            Entity::Segment(a, b) => write!(f, "({} -> {})", a, b),
        }
    }
}

/// One stored link matrix per unordered component-type pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    ActivityActivity,
    ResourceResource,
    SegmentSegment,
    ActivityResource,
    ActivitySegment,
    ResourceSegment,
}

/// Canonical link-matrix lookup for two component types.
///
/// Returns the matrix kind plus whether the operands must be swapped to
/// match the stored orientation.
pub fn canonical_relation(a: ComponentType, b: ComponentType) -> (RelationKind, bool) {
    use ComponentType::*;
    match (a, b) {
        (Activity, Activity) => (RelationKind::ActivityActivity, false),
        (Resource, Resource) => (RelationKind::ResourceResource, false),
        (Segment, Segment) => (RelationKind::SegmentSegment, false),
        (Activity, Resource) => (RelationKind::ActivityResource, false),
        (Resource, Activity) => (RelationKind::ActivityResource, true),
        (Activity, Segment) => (RelationKind::ActivitySegment, false),
        (Segment, Activity) => (RelationKind::ActivitySegment, true),
        (Resource, Segment) => (RelationKind::ResourceSegment, false),
        (Segment, Resource) => (RelationKind::ResourceSegment, true),
    }
}
