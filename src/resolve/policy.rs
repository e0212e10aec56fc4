//! Shared relationship policy: kind predicates and precedence-based parent
//! selection. Used by the connection resolver, the containment organizer,
//! and the batch reorganizer so all three agree on what "the parent" means.

use crate::models::{EntityKind, ParentRef};
use crate::vocab::{self, RelationshipType};

/// Returns true if the kind may source `supports_goal` edges.
pub fn supports_goals(kind: EntityKind) -> bool {
    RelationshipType::SupportsGoal
        .allowed_source_kinds()
        .contains(&kind)
}

/// Returns true if the kind may source `targets_milestone` edges.
pub fn targets_milestones(kind: EntityKind) -> bool {
    RelationshipType::TargetsMilestone
        .allowed_source_kinds()
        .contains(&kind)
}

/// Kinds that sit on the receiving end of `references` edges.
pub fn is_reference_target(kind: EntityKind) -> bool {
    matches!(kind, EntityKind::Document | EntityKind::Source)
}

/// Kinds whose presence as a connection anchors a task structurally. A task
/// connected to one of these loses project-fallback eligibility: it must
/// attach to the real structural parent.
pub fn is_structural_for_task(kind: EntityKind) -> bool {
    matches!(
        kind,
        EntityKind::Plan | EntityKind::Goal | EntityKind::Milestone | EntityKind::Task
    )
}

/// Result of precedence-based parent selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentSelection {
    /// Survivors, with exactly one marked primary (when non-empty).
    pub selected: Vec<ParentRef>,

    /// Candidates that were structurally permitted but lost precedence or
    /// multi-parent selection. (Kind-disallowed candidates are dropped
    /// before this point; see the filtered variant below.)
    pub rejected: Vec<ParentRef>,

    /// True when the selection is the synthesized project fallback.
    pub used_fallback: bool,
}

/// Select containment parents for `child` from `candidates`.
///
/// Candidates whose kind is not a permitted parent are silently filtered
/// (callers wanting a hard error validate first). Precedence keeps only
/// candidates at the most specific allowed-parent index; without
/// multi-parent, only the first survivor is kept. Exactly one survivor ends
/// up primary: the first one already marked, else the first overall.
///
/// When nothing survives, `fallback_project_id` is `Some`, and project is a
/// permitted parent kind, a single project parent is synthesized.
pub fn select_parents(
    child: EntityKind,
    candidates: &[ParentRef],
    fallback_project_id: Option<&str>,
    allow_multi_parent: bool,
) -> ParentSelection {
    let order = vocab::allowed_parent_kinds(child);

    // Deduplicate by (kind, id), keeping the first occurrence but letting a
    // later explicit primary mark win over an unspecified one.
    let mut deduped: Vec<ParentRef> = Vec::new();
    for cand in candidates {
        if let Some(existing) = deduped
            .iter_mut()
            .find(|p| p.kind == cand.kind && p.id == cand.id)
        {
            if existing.is_primary.is_none() {
                existing.is_primary = cand.is_primary;
            }
        } else {
            deduped.push(cand.clone());
        }
    }

    let mut rejected: Vec<ParentRef> = Vec::new();
    let mut permitted: Vec<(usize, ParentRef)> = Vec::new();
    for cand in deduped {
        match order.iter().position(|k| *k == cand.kind) {
            Some(idx) => permitted.push((idx, cand)),
            None => rejected.push(cand),
        }
    }

    if permitted.is_empty() {
        if let Some(project_id) = fallback_project_id {
            if order.contains(&EntityKind::Project) {
                return ParentSelection {
                    selected: vec![ParentRef::primary(EntityKind::Project, project_id)],
                    rejected,
                    used_fallback: true,
                };
            }
        }
        return ParentSelection {
            selected: vec![],
            rejected,
            used_fallback: false,
        };
    }

    let best = permitted.iter().map(|(idx, _)| *idx).min().unwrap_or(0);
    let (survivors, losers): (Vec<_>, Vec<_>) =
        permitted.into_iter().partition(|(idx, _)| *idx == best);
    rejected.extend(losers.into_iter().map(|(_, p)| p));

    let mut selected: Vec<ParentRef> = survivors.into_iter().map(|(_, p)| p).collect();
    if !allow_multi_parent && selected.len() > 1 {
        rejected.extend(selected.split_off(1));
    }

    // Primary normalization: first explicit mark wins, extras are cleared;
    // with no explicit mark the first survivor becomes primary.
    let first_marked = selected
        .iter()
        .position(|p| p.is_primary == Some(true))
        .unwrap_or(0);
    for (i, parent) in selected.iter_mut().enumerate() {
        parent.is_primary = Some(i == first_marked);
    }

    ParentSelection {
        selected,
        rejected,
        used_fallback: false,
    }
}
