//! Data models for ontology entities and edges.
//!
//! Entities are identified by `(kind, id)` pairs; the entity rows themselves
//! live in an external store. This module owns the edge shape, the caller
//! input shapes (parent and connection references), and the plan shapes
//! produced by resolution (see [`plan`]).

pub mod plan;
pub mod props;

pub use plan::{
    ApplySummary, ChildContainment, ContainmentMode, ContainmentSpec, Diagnostic, EdgeUpdate,
    GraphReorgPlan, ProjectEdgeDirective, ProjectEdgeMode, RelationshipPlan, ResolvedSemanticEdge,
    SemanticApplyMode, SemanticMode,
};
pub use props::{PropValue, Props, is_primary, primary_props, set_is_primary};

use crate::vocab::RelationshipType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of an ontology entity. Closed enumeration: adding a variant forces
/// every consuming match to be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Plan,
    Task,
    Goal,
    Milestone,
    Document,
    Risk,
    Requirement,
    Metric,
    Source,
    Output,
    Decision,
}

impl EntityKind {
    /// Get all entity kinds.
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Project,
            EntityKind::Plan,
            EntityKind::Task,
            EntityKind::Goal,
            EntityKind::Milestone,
            EntityKind::Document,
            EntityKind::Risk,
            EntityKind::Requirement,
            EntityKind::Metric,
            EntityKind::Source,
            EntityKind::Output,
            EntityKind::Decision,
        ]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Project => "project",
            EntityKind::Plan => "plan",
            EntityKind::Task => "task",
            EntityKind::Goal => "goal",
            EntityKind::Milestone => "milestone",
            EntityKind::Document => "document",
            EntityKind::Risk => "risk",
            EntityKind::Requirement => "requirement",
            EntityKind::Metric => "metric",
            EntityKind::Source => "source",
            EntityKind::Output => "output",
            EntityKind::Decision => "decision",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "project" => Ok(EntityKind::Project),
            "plan" => Ok(EntityKind::Plan),
            "task" => Ok(EntityKind::Task),
            "goal" => Ok(EntityKind::Goal),
            "milestone" => Ok(EntityKind::Milestone),
            "document" => Ok(EntityKind::Document),
            "risk" => Ok(EntityKind::Risk),
            "requirement" => Ok(EntityKind::Requirement),
            "metric" => Ok(EntityKind::Metric),
            "source" => Ok(EntityKind::Source),
            "output" => Ok(EntityKind::Output),
            "decision" => Ok(EntityKind::Decision),
            _ => Err(format!("Unknown entity kind: {}", s)),
        }
    }
}

/// A typed reference to an entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A candidate or confirmed parent in a containment relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub kind: EntityKind,
    pub id: String,

    /// Whether this parent is the authoritative one. `None` means
    /// "unspecified"; resolution normalizes it to `Some`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
}

impl ParentRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            is_primary: None,
        }
    }

    pub fn primary(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            is_primary: Some(true),
        }
    }

    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.kind, self.id.clone())
    }
}

/// Caller intent for a connection, when stated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionIntent {
    Containment,
    Semantic,
}

/// A loosely-typed connection request: "link me to this entity". Absent
/// `rel`/`intent` means "infer".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRef {
    pub kind: EntityKind,
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<ConnectionIntent>,

    /// Free-text relation token, possibly agent-invented.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
}

impl ConnectionRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            intent: None,
            rel: None,
        }
    }

    pub fn with_rel(kind: EntityKind, id: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            intent: None,
            rel: Some(rel.into()),
        }
    }

    pub fn with_intent(kind: EntityKind, id: impl Into<String>, intent: ConnectionIntent) -> Self {
        Self {
            kind,
            id: id.into(),
            intent: Some(intent),
            rel: None,
        }
    }

    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.kind, self.id.clone())
    }

    /// True if this entry carries explicit guidance (preferred on dedup).
    pub fn is_explicit(&self) -> bool {
        self.rel.is_some() || self.intent.is_some()
    }
}

/// Identity key of an edge: at most one edge may exist per key. Re-submitting
/// the same desired edge never creates a duplicate; same key with different
/// props is the same edge needing an update.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub rel: RelationshipType,
    pub src_kind: EntityKind,
    pub src_id: String,
    pub dst_kind: EntityKind,
    pub dst_id: String,
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} --[{}]--> {}:{}",
            self.src_kind, self.src_id, self.rel, self.dst_kind, self.dst_id
        )
    }
}

/// A directed, typed edge between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub src_kind: EntityKind,
    pub src_id: String,
    pub dst_kind: EntityKind,
    pub dst_id: String,
    pub rel: RelationshipType,

    /// Open metadata map. Containment edges always carry `is_primary`;
    /// semantic edges may carry caller-supplied extras.
    #[serde(default)]
    pub props: Props,
}

impl Edge {
    pub fn new(src: EntityRef, dst: EntityRef, rel: RelationshipType) -> Self {
        Self {
            src_kind: src.kind,
            src_id: src.id,
            dst_kind: dst.kind,
            dst_id: dst.id,
            rel,
            props: Props::new(),
        }
    }

    pub fn with_props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            rel: self.rel,
            src_kind: self.src_kind,
            src_id: self.src_id.clone(),
            dst_kind: self.dst_kind,
            dst_id: self.dst_id.clone(),
        }
    }

    pub fn src(&self) -> EntityRef {
        EntityRef::new(self.src_kind, self.src_id.clone())
    }

    pub fn dst(&self) -> EntityRef {
        EntityRef::new(self.dst_kind, self.dst_id.clone())
    }

    /// Swap source and destination in place.
    pub fn flip(self) -> Edge {
        Edge {
            src_kind: self.dst_kind,
            src_id: self.dst_id,
            dst_kind: self.src_kind,
            dst_id: self.src_id,
            rel: self.rel,
            props: self.props,
        }
    }
}

/// A stored edge: the edge plus store-assigned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Unique identifier (e.g. "oge-a1b2c3d4").
    pub id: String,

    /// When the edge was created.
    pub created_at: DateTime<Utc>,

    #[serde(flatten)]
    pub edge: Edge,
}

/// Direction of an edge relative to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDirection {
    /// The node is the source.
    Outbound,
    /// The node is the target.
    Inbound,
}
