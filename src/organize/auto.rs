//! Single-entity auto-organization façade.
//!
//! Sequences: reference validation, containment, the project-edge
//! directive, then each semantic group. Groups are applied in separate
//! batches without expected-props capture; the batch reorganizer in
//! [`super::reorg`] is the stronger-consistency path.

use super::containment::{ContainmentOptions, apply_containment_edges};
use crate::models::{
    ApplySummary, Edge, EdgeDirection, EntityKind, EntityRef, ParentRef, ProjectEdgeDirective,
    ProjectEdgeMode, Props, SemanticApplyMode,
};
use crate::storage::{EdgeBatch, EdgeFilter, EdgeStore};
use crate::vocab::RelationshipType;
use crate::{Error, Result};
use tracing::debug;

/// One semantic edge group to apply: all targets share relation, direction,
/// and props.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticEdgeSpec {
    pub rel: RelationshipType,
    pub direction: EdgeDirection,
    pub targets: Vec<EntityRef>,
    pub mode: SemanticApplyMode,
    pub props: Props,
}

/// Request for a single-entity auto-organization.
#[derive(Debug, Clone)]
pub struct AutoOrganizeRequest {
    pub entity: EntityRef,
    pub project_id: String,
    pub parents: Vec<ParentRef>,
    pub project_edge: Option<ProjectEdgeDirective>,
    pub semantic: Vec<SemanticEdgeSpec>,
    pub allow_project_fallback: bool,
    pub allow_multi_parent: bool,
}

impl AutoOrganizeRequest {
    pub fn new(entity: EntityRef, project_id: impl Into<String>) -> Self {
        Self {
            entity,
            project_id: project_id.into(),
            parents: Vec::new(),
            project_edge: None,
            semantic: Vec::new(),
            allow_project_fallback: false,
            allow_multi_parent: false,
        }
    }
}

/// Validate and apply a single-entity organization request.
///
/// Every referenced entity must belong to the stated project and be active;
/// the first missing reference fails the whole call before any write.
pub fn auto_organize<S: EdgeStore>(
    store: &mut S,
    req: &AutoOrganizeRequest,
) -> Result<ApplySummary> {
    require_entity(store, &req.entity, &req.project_id)?;
    for parent in &req.parents {
        require_entity(store, &parent.entity(), &req.project_id)?;
    }
    for spec in &req.semantic {
        for target in &spec.targets {
            require_entity(store, target, &req.project_id)?;
        }
    }
    if req.project_edge.is_some() {
        require_entity(
            store,
            &EntityRef::new(EntityKind::Project, req.project_id.clone()),
            &req.project_id,
        )?;
    }

    let mut total = ApplySummary::default();

    if !req.parents.is_empty() {
        let opts = ContainmentOptions {
            project_id: req.project_id.clone(),
            allow_project_fallback: req.allow_project_fallback,
            allow_multi_parent: req.allow_multi_parent,
        };
        let summary = apply_containment_edges(store, &req.entity, &req.parents, &opts)?;
        total = add(total, summary);
    }

    if let Some(directive) = &req.project_edge {
        total = add(total, apply_project_edge(store, req, directive)?);
    }

    for spec in &req.semantic {
        total = add(total, apply_semantic_spec(store, &req.entity, spec)?);
    }

    debug!(
        entity = %req.entity,
        created = total.created,
        updated = total.updated,
        deleted = total.deleted,
        "auto-organized"
    );
    Ok(total)
}

fn require_entity<S: EdgeStore>(store: &S, entity: &EntityRef, project_id: &str) -> Result<()> {
    if store.entity_exists(entity.kind, &entity.id, project_id)? {
        return Ok(());
    }
    Err(Error::NotFound(format!(
        "{} in project {}",
        entity, project_id
    )))
}

fn apply_project_edge<S: EdgeStore>(
    store: &mut S,
    req: &AutoOrganizeRequest,
    directive: &ProjectEdgeDirective,
) -> Result<ApplySummary> {
    let edge = Edge::new(
        EntityRef::new(EntityKind::Project, req.project_id.clone()),
        req.entity.clone(),
        directive.rel,
    );
    let existing = store.scan_edges(&EdgeFilter {
        src_kind: Some(EntityKind::Project),
        src_id: Some(req.project_id.clone()),
        dst_kind: Some(req.entity.kind),
        dst_id: Some(req.entity.id.clone()),
        rel_in: Some(vec![directive.rel]),
        ..Default::default()
    })?;

    let mut batch = EdgeBatch::default();
    match directive.mode {
        ProjectEdgeMode::Ensure if existing.is_empty() => batch.inserts.push(edge),
        ProjectEdgeMode::Remove if !existing.is_empty() => batch.deletes.push(edge.key()),
        _ => {}
    }
    let summary = ApplySummary {
        created: batch.inserts.len(),
        updated: 0,
        deleted: batch.deletes.len(),
    };
    if !batch.is_empty() {
        store.apply_edge_batch(&batch)?;
    }
    Ok(summary)
}

fn apply_semantic_spec<S: EdgeStore>(
    store: &mut S,
    entity: &EntityRef,
    spec: &SemanticEdgeSpec,
) -> Result<ApplySummary> {
    let scope_filter = match spec.direction {
        EdgeDirection::Outbound => {
            EdgeFilter::src(entity.kind, entity.id.clone()).with_rels(&[spec.rel])
        }
        EdgeDirection::Inbound => {
            EdgeFilter::dst(entity.kind, entity.id.clone()).with_rels(&[spec.rel])
        }
    };
    let existing = store.scan_edges(&scope_filter)?;

    let desired: Vec<Edge> = spec
        .targets
        .iter()
        .map(|target| {
            let (src, dst) = match spec.direction {
                EdgeDirection::Outbound => (entity.clone(), target.clone()),
                EdgeDirection::Inbound => (target.clone(), entity.clone()),
            };
            Edge::new(src, dst, spec.rel).with_props(spec.props.clone())
        })
        .collect();

    let mut batch = EdgeBatch::default();
    match spec.mode {
        SemanticApplyMode::Replace => {
            // Delete the whole (rel, direction) scope, then insert anew.
            // An empty target list skips the insert but still clears.
            batch.deletes = existing.iter().map(|r| r.edge.key()).collect();
            batch.inserts = desired;
        }
        SemanticApplyMode::Merge => {
            let existing_keys: Vec<_> = existing.iter().map(|r| r.edge.key()).collect();
            batch.inserts = desired
                .into_iter()
                .filter(|e| !existing_keys.contains(&e.key()))
                .collect();
        }
    }

    let summary = ApplySummary {
        created: batch.inserts.len(),
        updated: 0,
        deleted: batch.deletes.len(),
    };
    if !batch.is_empty() {
        store.apply_edge_batch(&batch)?;
    }
    Ok(summary)
}

fn add(a: ApplySummary, b: ApplySummary) -> ApplySummary {
    ApplySummary {
        created: a.created + b.created,
        updated: a.updated + b.updated,
        deleted: a.deleted + b.deleted,
    }
}
