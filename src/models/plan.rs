//! Plan shapes produced by resolution and batch planning.
//!
//! Plans are inert data: computing one performs no writes. The organize
//! layer turns plans into store batches.

use super::{Edge, EdgeDirection, EdgeKey, EntityRef, ParentRef, Props};
use crate::vocab::RelationshipType;
use serde::{Deserialize, Serialize};

/// How resolved containment parents combine with stored parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentMode {
    /// Merge resolved candidates with existing parents, then re-select.
    Merge,
    /// Use resolved candidates outright; stored parents outside the desired
    /// set are deleted.
    Replace,
}

/// How resolved semantic edges combine with stored semantic edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticMode {
    /// Only add missing edges; never delete.
    Merge,
    /// Every resolved (rel, direction) scope is replaced wholesale.
    Replace,
    /// Auto-managed relation scopes are replaced wholesale - including
    /// "replace with empty set" when a scope resolved zero targets - and
    /// everything else is merged.
    ReplaceAuto,
    /// Leave semantic edges untouched.
    Preserve,
}

/// Apply mode carried by each semantic edge group in the single-entity
/// auto-organizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticApplyMode {
    Merge,
    Replace,
}

/// Desired containment for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainmentSpec {
    /// Selected parent candidates, primary flag normalized.
    pub parents: Vec<ParentRef>,

    /// Whether a project-fallback parent may be synthesized when no
    /// candidate survives.
    pub allow_project_fallback: bool,

    /// Whether multiple surviving parents at the same precedence are kept.
    pub allow_multi_parent: bool,

    pub mode: ContainmentMode,
}

/// A group of semantic edges sharing relation and direction, with
/// deduplicated targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSemanticEdge {
    pub rel: RelationshipType,

    /// Direction relative to the resolved entity.
    pub direction: EdgeDirection,

    pub targets: Vec<EntityRef>,

    /// Caller-supplied extra metadata carried onto each edge.
    #[serde(default)]
    pub props: Props,

    /// The original free-text token, recorded when the relation was
    /// inferred as a fallback (agent-invented vocabulary audit trail).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_rel: Option<String>,
}

/// Ensure/remove directive for the dedicated entity-to-project edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectEdgeMode {
    Ensure,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEdgeDirective {
    pub rel: RelationshipType,
    pub mode: ProjectEdgeMode,
}

/// A connection that turned out to be the resolved entity's child, not its
/// parent. Always merge mode so it never clobbers the child's other parents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildContainment {
    pub child: EntityRef,
    pub parent: ParentRef,
    pub mode: ContainmentMode,
}

/// A connection the resolver dropped, with the reason. The resolver never
/// fails; callers log or surface these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub connection: EntityRef,
    pub reason: String,
}

/// Structured output of connection resolution for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipPlan {
    pub entity: EntityRef,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub containment: Option<ContainmentSpec>,

    pub semantic: Vec<ResolvedSemanticEdge>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_edge: Option<ProjectEdgeDirective>,

    pub child_containment: Vec<ChildContainment>,

    pub diagnostics: Vec<Diagnostic>,
}

/// An edge update scheduled by a diff, carrying the props observed at
/// planning time for the optimistic-concurrency check at apply time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeUpdate {
    pub key: EdgeKey,
    pub new_props: Props,
    pub expected_props: Props,
}

/// Batch reconciliation plan: the minimal create/update/delete set moving
/// the stored graph to the desired state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphReorgPlan {
    pub inserts: Vec<Edge>,
    pub updates: Vec<EdgeUpdate>,
    pub deletes: Vec<EdgeKey>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GraphReorgPlan {
    /// True when applying would perform no writes.
    pub fn is_noop(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Counts of operations performed by an apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplySummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityKind;

    #[test]
    fn test_empty_plan_is_noop() {
        assert!(GraphReorgPlan::default().is_noop());
    }

    #[test]
    fn test_plan_with_insert_is_not_noop() {
        let plan = GraphReorgPlan {
            inserts: vec![Edge::new(
                EntityRef::new(EntityKind::Plan, "p1"),
                EntityRef::new(EntityKind::Task, "t1"),
                RelationshipType::HasTask,
            )],
            ..Default::default()
        };
        assert!(!plan.is_noop());
    }

    #[test]
    fn test_relationship_plan_serde() {
        let plan = RelationshipPlan {
            entity: EntityRef::new(EntityKind::Task, "t1"),
            containment: Some(ContainmentSpec {
                parents: vec![ParentRef::primary(EntityKind::Plan, "p1")],
                allow_project_fallback: false,
                allow_multi_parent: false,
                mode: ContainmentMode::Merge,
            }),
            semantic: vec![],
            project_edge: None,
            child_containment: vec![],
            diagnostics: vec![],
        };
        let json = serde_json::to_string(&plan).unwrap();
        let back: RelationshipPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(plan, back);
    }
}
