//! Connection resolution: classify one entity's loose connections into a
//! structured [`RelationshipPlan`].
//!
//! The resolver never fails. Connections it cannot place are dropped and
//! reported through the plan's diagnostics list, so a single bad relation
//! string from an agent never aborts the whole edit.

use crate::models::{
    ChildContainment, ConnectionIntent, ConnectionRef, ContainmentMode, ContainmentSpec,
    Diagnostic, EdgeDirection, EntityKind, EntityRef, ParentRef, ProjectEdgeDirective,
    ProjectEdgeMode, Props, RelationshipPlan, ResolvedSemanticEdge,
};
use crate::resolve::{direction, policy, token};
use crate::vocab::{self, RelationshipType};
use tracing::debug;

/// Options for connection resolution.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Project scope; used for fallback-parent synthesis downstream.
    pub project_id: String,

    /// How the resolved containment combines with stored parents.
    pub mode: ContainmentMode,

    pub allow_multi_parent: bool,

    /// Override for project-fallback eligibility. `None` lets policy
    /// decide (tasks lose eligibility when structurally connected).
    pub allow_project_fallback: Option<bool>,
}

impl ResolveOptions {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            mode: ContainmentMode::Merge,
            allow_multi_parent: false,
            allow_project_fallback: None,
        }
    }
}

/// Resolve one entity's connections into a relationship plan.
///
/// Deterministic for a given input order after deduplication, and pure: the
/// plan is a function of (entity, connections, options) only.
pub fn resolve_connections(
    entity: &EntityRef,
    connections: &[ConnectionRef],
    opts: &ResolveOptions,
) -> RelationshipPlan {
    let connections = dedup_connections(connections);

    let mut candidates: Vec<ParentRef> = Vec::new();
    let mut semantic = SemanticAccumulator::default();
    let mut project_edge: Option<ProjectEdgeDirective> = None;
    let mut child_containment: Vec<ChildContainment> = Vec::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    for conn in &connections {
        if conn.kind == entity.kind && conn.id == entity.id {
            diagnostics.push(diag(conn, "self-loop connection dropped"));
            continue;
        }

        // Explicit relation token.
        if let Some(raw) = &conn.rel {
            let resolved = token::resolve_token(raw, entity.kind, conn.kind);
            let canonical = canonical_relation(&resolved.token);
            match canonical {
                Some(rel) if !rel.is_containment() => {
                    match direction::normalize_edge(
                        entity.clone(),
                        conn.entity(),
                        &resolved.token,
                        Props::new(),
                    ) {
                        Some(edge) => {
                            let dir = if edge.src_id == entity.id && edge.src_kind == entity.kind {
                                EdgeDirection::Outbound
                            } else {
                                EdgeDirection::Inbound
                            };
                            semantic.add(edge.rel, dir, conn.entity(), resolved.original);
                        }
                        None => diagnostics.push(diag(
                            conn,
                            &format!("relation '{}' has ambiguous direction for these kinds", raw),
                        )),
                    }
                    continue;
                }
                Some(rel) => {
                    // Containment relation stated explicitly: orientation
                    // decides whether the connection is parent or child.
                    if let Some(edge) = direction::normalize_edge(
                        entity.clone(),
                        conn.entity(),
                        &resolved.token,
                        Props::new(),
                    ) {
                        if edge.dst_kind == entity.kind && edge.dst_id == entity.id {
                            candidates.push(ParentRef::new(conn.kind, conn.id.clone()));
                        } else {
                            child_containment.push(ChildContainment {
                                child: conn.entity(),
                                parent: ParentRef::new(entity.kind, entity.id.clone()),
                                mode: ContainmentMode::Merge,
                            });
                        }
                        continue;
                    }
                    diagnostics.push(diag(
                        conn,
                        &format!("containment relation '{}' not applicable to these kinds", rel),
                    ));
                    continue;
                }
                None => {
                    // Alias tokens always canonicalize; unreachable unless
                    // the vocabulary and token resolver disagree.
                    diagnostics.push(diag(conn, "unresolvable relation token"));
                    continue;
                }
            }
        }

        classify_implicit(
            entity,
            conn,
            &mut candidates,
            &mut semantic,
            &mut project_edge,
            &mut child_containment,
            &mut diagnostics,
        );
    }

    // Precedence selection at resolve scope; losers of kind goal/milestone
    // convert to semantic edges instead of vanishing.
    let selection = policy::select_parents(entity.kind, &candidates, None, opts.allow_multi_parent);
    for lost in &selection.rejected {
        if lost.kind == EntityKind::Goal && policy::supports_goals(entity.kind) {
            semantic.add(
                RelationshipType::SupportsGoal,
                EdgeDirection::Outbound,
                lost.entity(),
                None,
            );
        } else if lost.kind == EntityKind::Milestone && policy::targets_milestones(entity.kind) {
            semantic.add(
                RelationshipType::TargetsMilestone,
                EdgeDirection::Outbound,
                lost.entity(),
                None,
            );
        } else {
            diagnostics.push(Diagnostic {
                connection: lost.entity(),
                reason: "containment candidate lost precedence selection".to_string(),
            });
        }
    }

    let containment = if vocab::allowed_parent_kinds(entity.kind).is_empty() {
        None
    } else {
        Some(ContainmentSpec {
            parents: selection.selected,
            allow_project_fallback: opts
                .allow_project_fallback
                .unwrap_or_else(|| fallback_eligible(entity.kind, &connections)),
            allow_multi_parent: opts.allow_multi_parent,
            mode: opts.mode,
        })
    };

    let plan = RelationshipPlan {
        entity: entity.clone(),
        containment,
        semantic: semantic.into_groups(),
        project_edge,
        child_containment,
        diagnostics,
    };
    debug!(
        entity = %plan.entity,
        semantic_groups = plan.semantic.len(),
        children = plan.child_containment.len(),
        dropped = plan.diagnostics.len(),
        "resolved connections"
    );
    plan
}

/// Deduplicate connections by (kind, id), preferring an entry carrying
/// explicit rel/intent over an implicit one. First occurrence keeps its
/// position.
fn dedup_connections(connections: &[ConnectionRef]) -> Vec<ConnectionRef> {
    let mut out: Vec<ConnectionRef> = Vec::new();
    for conn in connections {
        match out
            .iter_mut()
            .find(|c| c.kind == conn.kind && c.id == conn.id)
        {
            Some(existing) => {
                if !existing.is_explicit() && conn.is_explicit() {
                    *existing = conn.clone();
                }
            }
            None => out.push(conn.clone()),
        }
    }
    out
}

/// Classification for connections without an explicit relation.
fn classify_implicit(
    entity: &EntityRef,
    conn: &ConnectionRef,
    candidates: &mut Vec<ParentRef>,
    semantic: &mut SemanticAccumulator,
    project_edge: &mut Option<ProjectEdgeDirective>,
    child_containment: &mut Vec<ChildContainment>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let semantic_only = conn.intent == Some(ConnectionIntent::Semantic);

    // Project association for documents and sources is a dedicated edge,
    // never containment competition or a generic reference.
    if !matches!(conn.intent, Some(ConnectionIntent::Containment)) {
        if policy::is_reference_target(entity.kind) && conn.kind == EntityKind::Project {
            let rel = if entity.kind == EntityKind::Document {
                RelationshipType::HasDocument
            } else {
                RelationshipType::HasSource
            };
            *project_edge = Some(ProjectEdgeDirective {
                rel,
                mode: ProjectEdgeMode::Ensure,
            });
            return;
        }
        if entity.kind == EntityKind::Project && policy::is_reference_target(conn.kind) {
            child_containment.push(ChildContainment {
                child: conn.entity(),
                parent: ParentRef::new(entity.kind, entity.id.clone()),
                mode: ContainmentMode::Merge,
            });
            return;
        }
    }

    if !semantic_only {
        if vocab::is_allowed_parent(entity.kind, conn.kind) {
            candidates.push(ParentRef::new(conn.kind, conn.id.clone()));
            return;
        }
        if vocab::is_allowed_parent(conn.kind, entity.kind) {
            child_containment.push(ChildContainment {
                child: conn.entity(),
                parent: ParentRef::new(entity.kind, entity.id.clone()),
                mode: ContainmentMode::Merge,
            });
            return;
        }
    }

    // Policy-driven inference.
    if entity.kind == EntityKind::Task && conn.kind == EntityKind::Task {
        semantic.add(
            RelationshipType::DependsOn,
            EdgeDirection::Outbound,
            conn.entity(),
            None,
        );
        return;
    }
    if conn.kind == EntityKind::Goal && policy::supports_goals(entity.kind) {
        semantic.add(
            RelationshipType::SupportsGoal,
            EdgeDirection::Outbound,
            conn.entity(),
            None,
        );
        return;
    }
    if entity.kind == EntityKind::Goal && policy::supports_goals(conn.kind) {
        semantic.add(
            RelationshipType::SupportsGoal,
            EdgeDirection::Inbound,
            conn.entity(),
            None,
        );
        return;
    }
    if conn.kind == EntityKind::Milestone && policy::targets_milestones(entity.kind) {
        semantic.add(
            RelationshipType::TargetsMilestone,
            EdgeDirection::Outbound,
            conn.entity(),
            None,
        );
        return;
    }
    if entity.kind == EntityKind::Milestone && policy::targets_milestones(conn.kind) {
        semantic.add(
            RelationshipType::TargetsMilestone,
            EdgeDirection::Inbound,
            conn.entity(),
            None,
        );
        return;
    }

    let entity_is_target = policy::is_reference_target(entity.kind);
    let conn_is_target = policy::is_reference_target(conn.kind);
    if entity_is_target != conn_is_target
        && entity.kind != EntityKind::Project
        && conn.kind != EntityKind::Project
    {
        // Reference-target kinds are always the edge destination.
        let dir = if conn_is_target {
            EdgeDirection::Outbound
        } else {
            EdgeDirection::Inbound
        };
        semantic.add(RelationshipType::References, dir, conn.entity(), None);
        return;
    }

    diagnostics.push(diag(conn, "no applicable relation for this kind pair"));
}

/// Resolve a known token (canonical or deprecated alias) to its canonical
/// relation. `None` only for tokens unknown to the vocabulary.
fn canonical_relation(token: &str) -> Option<RelationshipType> {
    if let Some(alias) = vocab::deprecated_alias(token) {
        return Some(alias.canonical);
    }
    token.parse::<RelationshipType>().ok()
}

/// Project fallback is suppressed for tasks with a structural connection:
/// a task tied to a plan/goal/milestone/task must attach to that structure.
fn fallback_eligible(kind: EntityKind, connections: &[ConnectionRef]) -> bool {
    if kind != EntityKind::Task {
        return true;
    }
    !connections
        .iter()
        .any(|c| policy::is_structural_for_task(c.kind))
}

fn diag(conn: &ConnectionRef, reason: &str) -> Diagnostic {
    Diagnostic {
        connection: conn.entity(),
        reason: reason.to_string(),
    }
}

/// Accumulates semantic edges grouped by (relation, direction) with
/// deduplicated targets, preserving insertion order for determinism.
#[derive(Default)]
struct SemanticAccumulator {
    groups: Vec<ResolvedSemanticEdge>,
}

impl SemanticAccumulator {
    fn add(
        &mut self,
        rel: RelationshipType,
        direction: EdgeDirection,
        target: EntityRef,
        original: Option<String>,
    ) {
        if let Some(group) = self
            .groups
            .iter_mut()
            .find(|g| g.rel == rel && g.direction == direction)
        {
            if !group.targets.contains(&target) {
                group.targets.push(target);
            }
            if group.original_rel.is_none() {
                group.original_rel = original;
            }
            return;
        }
        self.groups.push(ResolvedSemanticEdge {
            rel,
            direction,
            targets: vec![target],
            props: Props::new(),
            original_rel: original,
        });
    }

    fn into_groups(self) -> Vec<ResolvedSemanticEdge> {
        self.groups
    }
}
