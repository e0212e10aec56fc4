//! Canonical edge-direction normalization.
//!
//! Direction is a function of entity kind, not of caller-supplied order:
//! for every relation with a non-empty allowed-source set, the edge is
//! oriented so that the source kind is one the relation declares legal.

use crate::models::{Edge, EntityRef, Props};
use crate::vocab::{self, RelationshipType};

/// Normalize a raw (src, dst, rel-token) triple into a canonical edge.
///
/// Returns `None` when the relation token is unknown, or when the relation
/// declares allowed source kinds and neither endpoint matches (ambiguous
/// direction fails closed). Pure; never touches the store.
pub fn normalize_edge(
    src: EntityRef,
    dst: EntityRef,
    rel_token: &str,
    props: Props,
) -> Option<Edge> {
    let (rel, mut src, mut dst) = match vocab::deprecated_alias(rel_token) {
        Some(alias) => {
            if alias.swap_direction {
                (alias.canonical, dst, src)
            } else {
                (alias.canonical, src, dst)
            }
        }
        None => match rel_token.parse::<RelationshipType>() {
            Ok(rel) => (rel, src, dst),
            Err(_) => return None,
        },
    };

    let allowed = rel.allowed_source_kinds();
    if !allowed.is_empty() && !allowed.contains(&src.kind) {
        if allowed.contains(&dst.kind) {
            std::mem::swap(&mut src, &mut dst);
        } else {
            return None;
        }
    }

    Some(Edge::new(src, dst, rel).with_props(props))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityKind;

    fn task(id: &str) -> EntityRef {
        EntityRef::new(EntityKind::Task, id)
    }

    #[test]
    fn test_correct_orientation_passes_through() {
        let e = normalize_edge(
            task("t1"),
            EntityRef::new(EntityKind::Goal, "g1"),
            "supports_goal",
            Props::new(),
        )
        .unwrap();
        assert_eq!(e.src_id, "t1");
        assert_eq!(e.dst_id, "g1");
        assert_eq!(e.rel, RelationshipType::SupportsGoal);
    }

    #[test]
    fn test_wrong_orientation_is_swapped() {
        // Goal given as source, but goals cannot source supports_goal.
        let e = normalize_edge(
            EntityRef::new(EntityKind::Goal, "g1"),
            task("t1"),
            "supports_goal",
            Props::new(),
        )
        .unwrap();
        assert_eq!(e.src_id, "t1");
        assert_eq!(e.dst_id, "g1");
    }

    #[test]
    fn test_direction_is_function_of_kind() {
        // Normalizing either caller order yields the same canonical edge.
        let a = normalize_edge(
            EntityRef::new(EntityKind::Risk, "r1"),
            task("t1"),
            "threatens",
            Props::new(),
        )
        .unwrap();
        let b = normalize_edge(
            task("t1"),
            EntityRef::new(EntityKind::Risk, "r1"),
            "threatens",
            Props::new(),
        )
        .unwrap();
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_unknown_relation_returns_none() {
        assert!(normalize_edge(task("t1"), task("t2"), "linked_with", Props::new()).is_none());
    }

    #[test]
    fn test_ambiguous_direction_fails_closed() {
        // Neither document nor source may source threatens.
        assert!(
            normalize_edge(
                EntityRef::new(EntityKind::Document, "d1"),
                EntityRef::new(EntityKind::Source, "s1"),
                "threatens",
                Props::new(),
            )
            .is_none()
        );
    }

    #[test]
    fn test_empty_source_set_accepts_any_direction() {
        let e = normalize_edge(
            EntityRef::new(EntityKind::Document, "d1"),
            EntityRef::new(EntityKind::Source, "s1"),
            "references",
            Props::new(),
        )
        .unwrap();
        // Accepted as-is: references declares no source restriction.
        assert_eq!(e.src_id, "d1");
        assert_eq!(e.dst_id, "s1");
    }

    #[test]
    fn test_deprecated_alias_with_swap() {
        // "t1 blocks t2" means t2 depends on t1.
        let e = normalize_edge(task("t1"), task("t2"), "blocks", Props::new()).unwrap();
        assert_eq!(e.rel, RelationshipType::DependsOn);
        assert_eq!(e.src_id, "t2");
        assert_eq!(e.dst_id, "t1");
    }

    #[test]
    fn test_deprecated_alias_blocked_by_keeps_orientation() {
        let e = normalize_edge(task("t1"), task("t2"), "blocked_by", Props::new()).unwrap();
        assert_eq!(e.rel, RelationshipType::DependsOn);
        assert_eq!(e.src_id, "t1");
        assert_eq!(e.dst_id, "t2");
    }

    #[test]
    fn test_deprecated_alias_without_swap() {
        let e = normalize_edge(
            EntityRef::new(EntityKind::Document, "d1"),
            EntityRef::new(EntityKind::Document, "d2"),
            "contains",
            Props::new(),
        )
        .unwrap();
        assert_eq!(e.rel, RelationshipType::HasPart);
        assert_eq!(e.src_id, "d1");
    }

    #[test]
    fn test_alias_result_is_recanonicalized() {
        // part_of swaps, then the has_part source check still holds.
        let e = normalize_edge(
            EntityRef::new(EntityKind::Document, "child"),
            EntityRef::new(EntityKind::Document, "parent"),
            "part_of",
            Props::new(),
        )
        .unwrap();
        assert_eq!(e.rel, RelationshipType::HasPart);
        assert_eq!(e.src_id, "parent");
        assert_eq!(e.dst_id, "child");
    }

    #[test]
    fn test_props_are_preserved() {
        let mut props = Props::new();
        props.insert("note".to_string(), "agent".into());
        let e = normalize_edge(task("t1"), task("t2"), "depends_on", props.clone()).unwrap();
        assert_eq!(e.props, props);
    }
}
