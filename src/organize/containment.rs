//! Containment reconciliation for a single child entity.
//!
//! Computes the desired containment edge set for a child against candidate
//! parents, diffs it against stored containment edges, and applies the
//! minimal batch. Deletes are issued before inserts so replacing a parent
//! never trips the edge-uniqueness key.

use crate::models::{
    ApplySummary, Edge, EdgeUpdate, EntityRef, ParentRef, is_primary, primary_props,
};
use crate::resolve::policy;
use crate::storage::{EdgeBatch, EdgeFilter, EdgeStore};
use crate::vocab::{self, CONTAINMENT_RELATIONS};
use crate::{Error, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Options for a containment reconciliation call.
#[derive(Debug, Clone)]
pub struct ContainmentOptions {
    /// Project used when synthesizing a fallback parent.
    pub project_id: String,
    pub allow_project_fallback: bool,
    pub allow_multi_parent: bool,
}

impl ContainmentOptions {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            allow_project_fallback: false,
            allow_multi_parent: false,
        }
    }
}

/// Reconcile `child`'s containment edges against `candidates`.
///
/// Unlike the resolver, this path is strict: a candidate whose kind is not
/// a permitted parent is a validation error naming the allowed kinds, since
/// it indicates a caller defect rather than untrusted free text.
pub fn apply_containment_edges<S: EdgeStore>(
    store: &mut S,
    child: &EntityRef,
    candidates: &[ParentRef],
    opts: &ContainmentOptions,
) -> Result<ApplySummary> {
    for candidate in candidates {
        if !vocab::is_allowed_parent(child.kind, candidate.kind) {
            let allowed: Vec<String> = vocab::allowed_parent_kinds(child.kind)
                .iter()
                .map(|k| k.to_string())
                .collect();
            return Err(Error::Validation(format!(
                "kind '{}' cannot contain '{}'; allowed parent kinds: [{}]",
                candidate.kind,
                child.kind,
                allowed.join(", ")
            )));
        }
    }

    let fallback = opts
        .allow_project_fallback
        .then_some(opts.project_id.as_str());
    let selection = policy::select_parents(child.kind, candidates, fallback, opts.allow_multi_parent);

    let desired = desired_containment_edges(child, &selection.selected);
    let existing = store.scan_edges(
        &EdgeFilter::dst(child.kind, child.id.clone()).with_rels(CONTAINMENT_RELATIONS),
    )?;

    let mut batch = EdgeBatch::default();
    let mut seen = BTreeMap::new();
    for record in &existing {
        seen.insert(record.edge.key(), record.edge.props.clone());
    }
    for edge in desired {
        match seen.remove(&edge.key()) {
            None => batch.inserts.push(edge),
            Some(current) if current != edge.props => batch.updates.push(EdgeUpdate {
                key: edge.key(),
                new_props: edge.props,
                expected_props: current,
            }),
            Some(_) => {} // already as desired
        }
    }
    // Whatever remains in the existing set is no longer wanted.
    batch.deletes.extend(seen.into_keys());

    let summary = ApplySummary {
        created: batch.inserts.len(),
        updated: batch.updates.len(),
        deleted: batch.deletes.len(),
    };
    if !batch.is_empty() {
        store.apply_edge_batch(&batch)?;
    }
    debug!(
        child = %child,
        created = summary.created,
        updated = summary.updated,
        deleted = summary.deleted,
        "containment reconciled"
    );
    Ok(summary)
}

/// Current containment parents of `child`, primary first, then by
/// precedence and id.
pub fn fetch_containment_parents<S: EdgeStore>(
    store: &S,
    child: &EntityRef,
) -> Result<Vec<ParentRef>> {
    let existing = store.scan_edges(
        &EdgeFilter::dst(child.kind, child.id.clone()).with_rels(CONTAINMENT_RELATIONS),
    )?;
    let order = vocab::allowed_parent_kinds(child.kind);
    let mut parents: Vec<ParentRef> = existing
        .into_iter()
        .map(|record| ParentRef {
            kind: record.edge.src_kind,
            id: record.edge.src_id,
            is_primary: Some(is_primary(&record.edge.props)),
        })
        .collect();
    parents.sort_by_key(|p| {
        (
            p.is_primary != Some(true),
            order.iter().position(|k| *k == p.kind).unwrap_or(usize::MAX),
            p.id.clone(),
        )
    });
    Ok(parents)
}

/// Build the desired containment edges for selected parents. Pairs without
/// a containment relation are skipped silently; selection already filtered
/// them, so hitting one here means the policy tables disagree.
pub(crate) fn desired_containment_edges(child: &EntityRef, selected: &[ParentRef]) -> Vec<Edge> {
    selected
        .iter()
        .filter_map(|parent| {
            let rel = vocab::containment_relation(child.kind, parent.kind)?;
            Some(
                Edge::new(parent.entity(), child.clone(), rel)
                    .with_props(primary_props(parent.is_primary.unwrap_or(false))),
            )
        })
        .collect()
}
