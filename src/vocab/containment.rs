//! Containment policy: which kinds may parent which, in precedence order,
//! and the deterministic containment relation for each (child, parent) pair.

use super::RelationshipType;
use crate::models::EntityKind;

/// The closed set of containment relations. Only these may carry
/// `is_primary`, and containment diffs are scoped to exactly this set.
pub const CONTAINMENT_RELATIONS: &[RelationshipType] = &[
    RelationshipType::HasPlan,
    RelationshipType::HasTask,
    RelationshipType::HasGoal,
    RelationshipType::HasMilestone,
    RelationshipType::HasDocument,
    RelationshipType::HasPart,
    RelationshipType::HasRisk,
    RelationshipType::HasRequirement,
    RelationshipType::HasMetric,
    RelationshipType::HasSource,
    RelationshipType::HasOutput,
    RelationshipType::HasDecision,
];

/// Allowed parent kinds for a child kind, ordered by precedence (most
/// specific first). Projects are roots and have no parents.
pub fn allowed_parent_kinds(child: EntityKind) -> &'static [EntityKind] {
    use EntityKind::*;
    match child {
        Project => &[],
        Plan => &[Project],
        // Task-to-task nesting is deliberately absent: a task-task
        // connection means depends_on, not containment.
        Task => &[Plan, Goal, Milestone, Project],
        Goal => &[Goal, Project],
        Milestone => &[Plan, Project],
        // Documents and sources attach to the graph through references and
        // the dedicated project edge; containment is only nesting under a
        // document or hanging off the project.
        Document => &[Document, Project],
        Risk => &[Project],
        Requirement => &[Plan, Project],
        Metric => &[Goal, Project],
        Source => &[Document, Project],
        Output => &[Task, Project],
        Decision => &[Plan, Project],
    }
}

/// Returns true if `parent` may contain `child`.
pub fn is_allowed_parent(child: EntityKind, parent: EntityKind) -> bool {
    allowed_parent_kinds(child).contains(&parent)
}

/// Deterministic containment relation for a (child, parent) pair. `None`
/// when the pair is not a permitted containment.
pub fn containment_relation(
    child: EntityKind,
    parent: EntityKind,
) -> Option<RelationshipType> {
    use EntityKind::*;
    if !is_allowed_parent(child, parent) {
        return None;
    }
    let rel = match child {
        Project => return None,
        Plan => RelationshipType::HasPlan,
        Task => RelationshipType::HasTask,
        Goal => RelationshipType::HasGoal,
        Milestone => RelationshipType::HasMilestone,
        Document => {
            if parent == Document {
                RelationshipType::HasPart
            } else {
                RelationshipType::HasDocument
            }
        }
        Risk => RelationshipType::HasRisk,
        Requirement => RelationshipType::HasRequirement,
        Metric => RelationshipType::HasMetric,
        Source => {
            if parent == Document {
                RelationshipType::HasPart
            } else {
                RelationshipType::HasSource
            }
        }
        Output => RelationshipType::HasOutput,
        Decision => RelationshipType::HasDecision,
    };
    Some(rel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_has_no_parents() {
        assert!(allowed_parent_kinds(EntityKind::Project).is_empty());
        assert_eq!(
            containment_relation(EntityKind::Project, EntityKind::Project),
            None
        );
    }

    #[test]
    fn test_task_precedence_order() {
        // Plan is the most specific parent for a task; project is last.
        let parents = allowed_parent_kinds(EntityKind::Task);
        assert_eq!(parents.first(), Some(&EntityKind::Plan));
        assert_eq!(parents.last(), Some(&EntityKind::Project));
        let plan_idx = parents.iter().position(|k| *k == EntityKind::Plan).unwrap();
        let goal_idx = parents.iter().position(|k| *k == EntityKind::Goal).unwrap();
        assert!(plan_idx < goal_idx);
    }

    #[test]
    fn test_every_allowed_pair_has_a_relation() {
        for child in EntityKind::all() {
            for parent in allowed_parent_kinds(*child) {
                let rel = containment_relation(*child, *parent);
                assert!(
                    rel.is_some(),
                    "no containment relation for {} under {}",
                    child,
                    parent
                );
                assert!(rel.unwrap().is_containment());
            }
        }
    }

    #[test]
    fn test_disallowed_pair_has_no_relation() {
        assert_eq!(
            containment_relation(EntityKind::Task, EntityKind::Document),
            None
        );
        assert_eq!(
            containment_relation(EntityKind::Risk, EntityKind::Task),
            None
        );
    }

    #[test]
    fn test_document_nesting_uses_has_part() {
        assert_eq!(
            containment_relation(EntityKind::Document, EntityKind::Document),
            Some(RelationshipType::HasPart)
        );
        assert_eq!(
            containment_relation(EntityKind::Document, EntityKind::Project),
            Some(RelationshipType::HasDocument)
        );
        assert_eq!(
            containment_relation(EntityKind::Source, EntityKind::Document),
            Some(RelationshipType::HasPart)
        );
        // Documents never nest under tasks; that link is a reference.
        assert_eq!(
            containment_relation(EntityKind::Document, EntityKind::Task),
            None
        );
    }

    #[test]
    fn test_containment_relation_source_kinds_include_parent() {
        // The vocabulary's direction table must agree with the containment
        // table: every permitted parent kind is a legal source.
        for child in EntityKind::all() {
            for parent in allowed_parent_kinds(*child) {
                let rel = containment_relation(*child, *parent).unwrap();
                assert!(
                    rel.allowed_source_kinds().contains(parent),
                    "{} not an allowed source of {}",
                    parent,
                    rel
                );
            }
        }
    }
}
