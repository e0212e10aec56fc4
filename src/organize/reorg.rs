//! Batch graph reorganization: plan a minimal diff across many entities,
//! then apply it in one atomic store batch.
//!
//! Planning performs no writes. Every update scheduled by the diff carries
//! the props observed during planning; apply fails with
//! [`crate::Error::Conflict`] when a touched row changed in between, so a
//! stale plan is discarded rather than silently half-applied.

use super::containment::desired_containment_edges;
use crate::models::{
    Diagnostic, Edge, EdgeDirection, EdgeKey, EdgeUpdate, EntityKind, EntityRef, GraphReorgPlan,
    ApplySummary, ConnectionRef, ContainmentMode, ParentRef, ProjectEdgeMode, Props,
    RelationshipPlan, SemanticMode, primary_props,
};
use crate::resolve::{ResolveOptions, policy, resolve_connections};
use crate::storage::{EdgeBatch, EdgeFilter, EdgeStore};
use crate::vocab::{self, AUTO_MANAGED_RELATIONS, CONTAINMENT_RELATIONS, RelationshipType};
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// One entity in a reorganization batch with its desired connections.
/// Per-node overrides take precedence over the call-level defaults in
/// [`ReorgOptions`]; `None` means "use the default".
#[derive(Debug, Clone, PartialEq)]
pub struct ReorgNode {
    pub entity: EntityRef,
    pub connections: Vec<ConnectionRef>,
    pub containment_mode: Option<ContainmentMode>,
    pub semantic_mode: Option<SemanticMode>,
    pub allow_multi_parent: Option<bool>,
    pub allow_project_fallback: Option<bool>,
}

impl ReorgNode {
    pub fn new(entity: EntityRef, connections: Vec<ConnectionRef>) -> Self {
        Self {
            entity,
            connections,
            containment_mode: None,
            semantic_mode: None,
            allow_multi_parent: None,
            allow_project_fallback: None,
        }
    }
}

/// Options governing a batch reorganization.
#[derive(Debug, Clone)]
pub struct ReorgOptions {
    pub project_id: String,
    pub containment_mode: ContainmentMode,
    pub semantic_mode: SemanticMode,
    pub allow_multi_parent: bool,

    /// Override for project-fallback eligibility; `None` lets policy decide
    /// per entity.
    pub allow_project_fallback: Option<bool>,
}

impl ReorgOptions {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            containment_mode: ContainmentMode::Merge,
            semantic_mode: SemanticMode::Merge,
            allow_multi_parent: false,
            allow_project_fallback: None,
        }
    }
}

/// A desired edge with its props and whether a props mismatch against the
/// stored row schedules an update. Merge-mode edges only fill gaps; they
/// never rewrite props someone else put there.
struct DesiredEdge {
    props: Props,
    update_eligible: bool,
}

/// Working state for one planning run: the desired edge set, the snapshot of
/// stored rows the plan consulted, and the keys eligible for deletion.
#[derive(Default)]
struct PlanState {
    desired: BTreeMap<EdgeKey, DesiredEdge>,
    existing: BTreeMap<EdgeKey, Props>,
    delete_scope: BTreeSet<EdgeKey>,
}

impl PlanState {
    fn record_existing(&mut self, records: &[crate::models::EdgeRecord], scoped: bool) {
        for record in records {
            self.existing
                .insert(record.edge.key(), record.edge.props.clone());
            if scoped {
                self.delete_scope.insert(record.edge.key());
            }
        }
    }

    fn want(&mut self, edge: Edge, update_eligible: bool) {
        self.desired.insert(
            edge.key(),
            DesiredEdge {
                props: edge.props,
                update_eligible,
            },
        );
    }

    /// Like [`want`](Self::want) but never displaces an already-desired
    /// entry, so reconciled containment wins over plain ensures.
    fn want_if_absent(&mut self, edge: Edge, update_eligible: bool) {
        self.desired.entry(edge.key()).or_insert(DesiredEdge {
            props: edge.props,
            update_eligible,
        });
    }
}

/// Plan a batch reorganization. Read-only: the returned plan is the minimal
/// create/update/delete set moving the stored graph to the desired state,
/// and an empty diff yields a no-op plan.
///
/// Node entities must exist in the project; a missing connection target is
/// dropped with a diagnostic instead of failing the batch.
pub fn plan_graph_reorg<S: EdgeStore>(
    store: &S,
    nodes: &[ReorgNode],
    opts: &ReorgOptions,
) -> Result<GraphReorgPlan> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    let mut plans: Vec<(RelationshipPlan, SemanticMode)> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if !store.entity_exists(node.entity.kind, &node.entity.id, &opts.project_id)? {
            return Err(Error::NotFound(format!(
                "{} in project {}",
                node.entity, opts.project_id
            )));
        }
        let mut connections = Vec::with_capacity(node.connections.len());
        for conn in &node.connections {
            if store.entity_exists(conn.kind, &conn.id, &opts.project_id)? {
                connections.push(conn.clone());
            } else {
                warn!(entity = %node.entity, target = %conn.entity(), "connection target not found");
                diagnostics.push(Diagnostic {
                    connection: conn.entity(),
                    reason: format!("target not found in project {}", opts.project_id),
                });
            }
        }
        let resolve_opts = ResolveOptions {
            project_id: opts.project_id.clone(),
            mode: node.containment_mode.unwrap_or(opts.containment_mode),
            allow_multi_parent: node.allow_multi_parent.unwrap_or(opts.allow_multi_parent),
            allow_project_fallback: node.allow_project_fallback.or(opts.allow_project_fallback),
        };
        plans.push((
            resolve_connections(&node.entity, &connections, &resolve_opts),
            node.semantic_mode.unwrap_or(opts.semantic_mode),
        ));
    }

    // Connections that resolved as another in-batch entity's parent feed
    // that entity's own selection; out-of-batch children get a plain
    // ensure edge with no delete scope.
    let mut extra_parents: BTreeMap<EntityRef, Vec<ParentRef>> = BTreeMap::new();
    let mut out_of_batch: Vec<(EntityRef, ParentRef)> = Vec::new();
    for (plan, _) in &plans {
        for cc in &plan.child_containment {
            if plans.iter().any(|(p, _)| p.entity == cc.child) {
                extra_parents
                    .entry(cc.child.clone())
                    .or_default()
                    .push(cc.parent.clone());
            } else {
                out_of_batch.push((cc.child.clone(), cc.parent.clone()));
            }
        }
    }

    let mut state = PlanState::default();
    for (plan, semantic_mode) in &plans {
        diagnostics.extend(plan.diagnostics.iter().cloned());
        plan_containment(store, plan, &extra_parents, opts, &mut state, &mut diagnostics)?;
        plan_semantic(store, plan, *semantic_mode, &mut state)?;
        plan_project_edge(store, plan, opts, &mut state)?;
    }

    for (child, parent) in out_of_batch {
        let Some(rel) = vocab::containment_relation(child.kind, parent.kind) else {
            continue;
        };
        let edge = Edge::new(parent.entity(), child, rel).with_props(primary_props(false));
        let records = store.scan_edges(&exact_filter(&edge.key()))?;
        state.record_existing(&records, false);
        state.want_if_absent(edge, false);
    }

    let plan = diff(state, diagnostics);
    debug!(
        inserts = plan.inserts.len(),
        updates = plan.updates.len(),
        deletes = plan.deletes.len(),
        dropped = plan.diagnostics.len(),
        "reorganization planned"
    );
    Ok(plan)
}

/// Apply a previously computed plan as one atomic batch.
pub fn apply_graph_reorg_plan<S: EdgeStore>(
    store: &mut S,
    plan: &GraphReorgPlan,
) -> Result<ApplySummary> {
    if plan.is_noop() {
        return Ok(ApplySummary::default());
    }
    let batch = EdgeBatch {
        deletes: plan.deletes.clone(),
        updates: plan.updates.clone(),
        inserts: plan.inserts.clone(),
    };
    store.apply_edge_batch(&batch)?;
    Ok(ApplySummary {
        created: plan.inserts.len(),
        updated: plan.updates.len(),
        deleted: plan.deletes.len(),
    })
}

fn plan_containment<S: EdgeStore>(
    store: &S,
    plan: &RelationshipPlan,
    extra_parents: &BTreeMap<EntityRef, Vec<ParentRef>>,
    opts: &ReorgOptions,
    state: &mut PlanState,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<()> {
    let Some(spec) = &plan.containment else {
        return Ok(());
    };

    let records = store.scan_edges(
        &EdgeFilter::dst(plan.entity.kind, plan.entity.id.clone()).with_rels(CONTAINMENT_RELATIONS),
    )?;
    // The whole containment scope is reconcilable in both modes; merge only
    // differs by letting stored parents compete as candidates.
    state.record_existing(&records, true);

    let mut candidates = spec.parents.clone();
    if let Some(extra) = extra_parents.get(&plan.entity) {
        candidates.extend(extra.iter().cloned());
    }
    if spec.mode == ContainmentMode::Merge {
        for record in &records {
            candidates.push(ParentRef {
                kind: record.edge.src_kind,
                id: record.edge.src_id.clone(),
                is_primary: Some(crate::models::is_primary(&record.edge.props)),
            });
        }
    }

    let fallback = spec
        .allow_project_fallback
        .then_some(opts.project_id.as_str());
    let selection = policy::select_parents(
        plan.entity.kind,
        &candidates,
        fallback,
        spec.allow_multi_parent,
    );

    for edge in desired_containment_edges(&plan.entity, &selection.selected) {
        state.want(edge, true);
    }

    // A goal or milestone losing re-selection keeps its link semantically,
    // mirroring what resolution does for same-call candidates.
    for lost in &selection.rejected {
        let rel = match lost.kind {
            EntityKind::Goal if policy::supports_goals(plan.entity.kind) => {
                RelationshipType::SupportsGoal
            }
            EntityKind::Milestone if policy::targets_milestones(plan.entity.kind) => {
                RelationshipType::TargetsMilestone
            }
            _ => {
                diagnostics.push(Diagnostic {
                    connection: lost.entity(),
                    reason: "containment candidate lost precedence selection".to_string(),
                });
                continue;
            }
        };
        let edge = Edge::new(plan.entity.clone(), lost.entity(), rel);
        let found = store.scan_edges(&exact_filter(&edge.key()))?;
        state.record_existing(&found, false);
        state.want_if_absent(edge, false);
    }
    Ok(())
}

fn plan_semantic<S: EdgeStore>(
    store: &S,
    plan: &RelationshipPlan,
    semantic_mode: SemanticMode,
    state: &mut PlanState,
) -> Result<()> {
    if semantic_mode == SemanticMode::Preserve {
        return Ok(());
    }

    // Under replace-auto every applicable auto-managed outbound scope is
    // authoritative, including scopes the resolution produced no targets
    // for: absence means "remove what is there".
    if semantic_mode == SemanticMode::ReplaceAuto {
        for rel in AUTO_MANAGED_RELATIONS {
            if !auto_applicable(plan.entity.kind, *rel) {
                continue;
            }
            let records = store.scan_edges(
                &EdgeFilter::src(plan.entity.kind, plan.entity.id.clone()).with_rels(&[*rel]),
            )?;
            state.record_existing(&records, true);
        }
    }

    for group in &plan.semantic {
        let replace = match semantic_mode {
            SemanticMode::Preserve | SemanticMode::Merge => false,
            SemanticMode::Replace => true,
            SemanticMode::ReplaceAuto => vocab::is_auto_managed(group.rel),
        };

        let filter = match group.direction {
            EdgeDirection::Outbound => {
                EdgeFilter::src(plan.entity.kind, plan.entity.id.clone()).with_rels(&[group.rel])
            }
            EdgeDirection::Inbound => {
                EdgeFilter::dst(plan.entity.kind, plan.entity.id.clone()).with_rels(&[group.rel])
            }
        };
        let records = store.scan_edges(&filter)?;
        state.record_existing(&records, replace);

        for target in &group.targets {
            let (src, dst) = match group.direction {
                EdgeDirection::Outbound => (plan.entity.clone(), target.clone()),
                EdgeDirection::Inbound => (target.clone(), plan.entity.clone()),
            };
            let edge = Edge::new(src, dst, group.rel).with_props(group.props.clone());
            state.want(edge, replace);
        }
    }
    Ok(())
}

fn plan_project_edge<S: EdgeStore>(
    store: &S,
    plan: &RelationshipPlan,
    opts: &ReorgOptions,
    state: &mut PlanState,
) -> Result<()> {
    let Some(directive) = &plan.project_edge else {
        return Ok(());
    };
    let edge = Edge::new(
        EntityRef::new(EntityKind::Project, opts.project_id.clone()),
        plan.entity.clone(),
        directive.rel,
    );
    let records = store.scan_edges(&exact_filter(&edge.key()))?;
    match directive.mode {
        ProjectEdgeMode::Ensure => {
            state.record_existing(&records, false);
            state.want_if_absent(edge, false);
        }
        ProjectEdgeMode::Remove => {
            state.record_existing(&records, true);
        }
    }
    Ok(())
}

/// References is any-direction in the vocabulary, so applicability is by
/// exclusion: anything that is not itself a project or a reference target
/// can hold auto-managed outbound references.
fn auto_applicable(kind: EntityKind, rel: RelationshipType) -> bool {
    if rel == RelationshipType::References {
        return kind != EntityKind::Project && !policy::is_reference_target(kind);
    }
    rel.allowed_source_kinds().contains(&kind)
}

fn exact_filter(key: &EdgeKey) -> EdgeFilter {
    EdgeFilter {
        src_kind: Some(key.src_kind),
        src_id: Some(key.src_id.clone()),
        dst_kind: Some(key.dst_kind),
        dst_id: Some(key.dst_id.clone()),
        rel_in: Some(vec![key.rel]),
        ..Default::default()
    }
}

fn edge_for(key: &EdgeKey, props: Props) -> Edge {
    Edge {
        src_kind: key.src_kind,
        src_id: key.src_id.clone(),
        dst_kind: key.dst_kind,
        dst_id: key.dst_id.clone(),
        rel: key.rel,
        props,
    }
}

fn diff(state: PlanState, diagnostics: Vec<Diagnostic>) -> GraphReorgPlan {
    let mut plan = GraphReorgPlan {
        diagnostics,
        ..Default::default()
    };
    for (key, want) in &state.desired {
        match state.existing.get(key) {
            None => plan.inserts.push(edge_for(key, want.props.clone())),
            Some(current) if *current != want.props && want.update_eligible => {
                plan.updates.push(EdgeUpdate {
                    key: key.clone(),
                    new_props: want.props.clone(),
                    expected_props: current.clone(),
                });
            }
            Some(_) => {}
        }
    }
    for key in &state.delete_scope {
        if state.existing.contains_key(key) && !state.desired.contains_key(key) {
            plan.deletes.push(key.clone());
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    fn fixture() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_entity(EntityKind::Project, "proj-1", "proj-1")
            .unwrap();
        for (kind, id) in [
            (EntityKind::Plan, "p1"),
            (EntityKind::Plan, "p2"),
            (EntityKind::Task, "t1"),
            (EntityKind::Task, "t2"),
            (EntityKind::Task, "t3"),
            (EntityKind::Goal, "g1"),
            (EntityKind::Milestone, "m1"),
            (EntityKind::Document, "d1"),
            (EntityKind::Risk, "r1"),
        ] {
            store.insert_entity(kind, id, "proj-1").unwrap();
        }
        store
    }

    fn seed(store: &mut SqliteStore, edges: Vec<Edge>) {
        store
            .apply_edge_batch(&EdgeBatch {
                inserts: edges,
                ..Default::default()
            })
            .unwrap();
    }

    fn task(id: &str) -> EntityRef {
        EntityRef::new(EntityKind::Task, id)
    }

    fn node(entity: EntityRef, connections: Vec<ConnectionRef>) -> ReorgNode {
        ReorgNode::new(entity, connections)
    }

    fn opts() -> ReorgOptions {
        ReorgOptions::new("proj-1")
    }

    #[test]
    fn test_plan_is_read_only() {
        let mut store = fixture();
        let nodes = vec![node(
            task("t1"),
            vec![ConnectionRef::new(EntityKind::Plan, "p1")],
        )];
        let plan = plan_graph_reorg(&store, &nodes, &opts()).unwrap();
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(store.edge_count().unwrap(), 0);

        let summary = apply_graph_reorg_plan(&mut store, &plan).unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(store.edge_count().unwrap(), 1);
    }

    #[test]
    fn test_replan_after_apply_is_noop() {
        let mut store = fixture();
        let nodes = vec![
            node(
                task("t1"),
                vec![
                    ConnectionRef::new(EntityKind::Plan, "p1"),
                    ConnectionRef::new(EntityKind::Task, "t2"),
                ],
            ),
            node(task("t2"), vec![ConnectionRef::new(EntityKind::Goal, "g1")]),
        ];
        let plan = plan_graph_reorg(&store, &nodes, &opts()).unwrap();
        apply_graph_reorg_plan(&mut store, &plan).unwrap();

        let second = plan_graph_reorg(&store, &nodes, &opts()).unwrap();
        assert!(second.is_noop());
        assert_eq!(
            apply_graph_reorg_plan(&mut store, &second).unwrap(),
            ApplySummary::default()
        );
    }

    #[test]
    fn test_in_batch_child_gets_parent_from_sibling_node() {
        let mut store = fixture();
        // The plan node declares the task as its child; the task node has
        // no connections of its own.
        let nodes = vec![
            node(
                EntityRef::new(EntityKind::Plan, "p1"),
                vec![ConnectionRef::new(EntityKind::Task, "t1")],
            ),
            node(task("t1"), vec![]),
        ];
        let plan = plan_graph_reorg(&store, &nodes, &opts()).unwrap();
        apply_graph_reorg_plan(&mut store, &plan).unwrap();

        let parents =
            crate::organize::fetch_containment_parents(&store, &task("t1")).unwrap();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].id, "p1");
        // Cross-node candidate beat the project fallback.
        assert_eq!(parents[0].kind, EntityKind::Plan);
    }

    #[test]
    fn test_out_of_batch_child_gets_plain_ensure() {
        let mut store = fixture();
        // t2 already has a parent; linking it as p1's child must not
        // disturb that edge.
        seed(
            &mut store,
            vec![
                Edge::new(
                    EntityRef::new(EntityKind::Plan, "p2"),
                    task("t2"),
                    RelationshipType::HasTask,
                )
                .with_props(primary_props(true)),
            ],
        );
        let mut o = opts();
        o.allow_project_fallback = Some(false);
        let nodes = vec![node(
            EntityRef::new(EntityKind::Plan, "p1"),
            vec![ConnectionRef::new(EntityKind::Task, "t2")],
        )];
        let plan = plan_graph_reorg(&store, &nodes, &o).unwrap();
        assert_eq!(plan.deletes.len(), 0);
        assert_eq!(plan.inserts.len(), 1);
        assert!(!crate::models::is_primary(&plan.inserts[0].props));
        apply_graph_reorg_plan(&mut store, &plan).unwrap();

        let parents =
            crate::organize::fetch_containment_parents(&store, &task("t2")).unwrap();
        assert_eq!(parents.len(), 2);
        // The stored primary is untouched.
        assert_eq!(parents[0].id, "p2");
        assert_eq!(parents[0].is_primary, Some(true));
    }

    #[test]
    fn test_merge_keeps_unrelated_semantic_edges() {
        let mut store = fixture();
        seed(
            &mut store,
            vec![Edge::new(task("t1"), task("t2"), RelationshipType::DependsOn)],
        );
        let nodes = vec![node(
            task("t1"),
            vec![ConnectionRef::new(EntityKind::Task, "t3")],
        )];
        let plan = plan_graph_reorg(&store, &nodes, &opts()).unwrap();
        assert_eq!(plan.inserts.len(), 1);
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn test_replace_clears_unlisted_edges_in_scope() {
        let mut store = fixture();
        seed(
            &mut store,
            vec![Edge::new(task("t1"), task("t2"), RelationshipType::DependsOn)],
        );
        let mut o = opts();
        o.semantic_mode = SemanticMode::Replace;
        let nodes = vec![node(
            task("t1"),
            vec![ConnectionRef::new(EntityKind::Task, "t3")],
        )];
        let plan = plan_graph_reorg(&store, &nodes, &o).unwrap();
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.deletes.len(), 1);
        assert_eq!(plan.deletes[0].dst_id, "t2");
    }

    #[test]
    fn test_replace_auto_clears_empty_auto_scope_but_keeps_manual_edges() {
        let mut store = fixture();
        seed(
            &mut store,
            vec![
                Edge::new(task("t1"), task("t2"), RelationshipType::DependsOn),
                Edge::new(
                    task("t1"),
                    EntityRef::new(EntityKind::Risk, "r1"),
                    RelationshipType::Mitigates,
                ),
            ],
        );
        let mut o = opts();
        o.semantic_mode = SemanticMode::ReplaceAuto;
        o.allow_project_fallback = Some(false);
        // No task connections resolved: the depends_on scope empties out,
        // while the non-auto mitigates edge survives.
        let nodes = vec![node(task("t1"), vec![])];
        let plan = plan_graph_reorg(&store, &nodes, &o).unwrap();
        assert_eq!(plan.deletes.len(), 1);
        assert_eq!(plan.deletes[0].rel, RelationshipType::DependsOn);
        assert!(plan.inserts.is_empty());
    }

    #[test]
    fn test_containment_merge_reselects_against_stored_parent() {
        let mut store = fixture();
        seed(
            &mut store,
            vec![
                Edge::new(
                    EntityRef::new(EntityKind::Goal, "g1"),
                    task("t1"),
                    RelationshipType::HasTask,
                )
                .with_props(primary_props(true)),
            ],
        );
        // A plan connection outranks the stored goal parent; the goal link
        // survives as supports_goal.
        let nodes = vec![node(
            task("t1"),
            vec![ConnectionRef::new(EntityKind::Plan, "p1")],
        )];
        let plan = plan_graph_reorg(&store, &nodes, &opts()).unwrap();
        apply_graph_reorg_plan(&mut store, &plan).unwrap();

        let parents =
            crate::organize::fetch_containment_parents(&store, &task("t1")).unwrap();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].kind, EntityKind::Plan);

        let semantic = store
            .scan_edges(
                &EdgeFilter::src(EntityKind::Task, "t1")
                    .with_rels(&[RelationshipType::SupportsGoal]),
            )
            .unwrap();
        assert_eq!(semantic.len(), 1);
        assert_eq!(semantic[0].edge.dst_id, "g1");
    }

    #[test]
    fn test_containment_replace_ignores_stored_parent() {
        let mut store = fixture();
        seed(
            &mut store,
            vec![
                Edge::new(
                    EntityRef::new(EntityKind::Plan, "p2"),
                    task("t1"),
                    RelationshipType::HasTask,
                )
                .with_props(primary_props(true)),
            ],
        );
        let mut o = opts();
        o.containment_mode = ContainmentMode::Replace;
        let nodes = vec![node(
            task("t1"),
            vec![ConnectionRef::new(EntityKind::Plan, "p1")],
        )];
        let plan = plan_graph_reorg(&store, &nodes, &o).unwrap();
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.deletes.len(), 1);
        assert_eq!(plan.deletes[0].src_id, "p2");
    }

    #[test]
    fn test_stale_plan_conflicts_and_rolls_back() {
        let mut store = fixture();
        seed(
            &mut store,
            vec![
                Edge::new(
                    EntityRef::new(EntityKind::Plan, "p1"),
                    task("t1"),
                    RelationshipType::HasTask,
                )
                .with_props(primary_props(false)),
            ],
        );
        // The plan schedules a primary-flag update plus one insert.
        let nodes = vec![node(
            task("t1"),
            vec![
                ConnectionRef::new(EntityKind::Plan, "p1"),
                ConnectionRef::new(EntityKind::Task, "t2"),
            ],
        )];
        let plan = plan_graph_reorg(&store, &nodes, &opts()).unwrap();
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.inserts.len(), 1);

        // Another writer flips the flag before the plan is applied.
        store
            .apply_edge_batch(&EdgeBatch {
                updates: vec![EdgeUpdate {
                    key: plan.updates[0].key.clone(),
                    new_props: primary_props(true),
                    expected_props: primary_props(false),
                }],
                ..Default::default()
            })
            .unwrap();

        assert!(matches!(
            apply_graph_reorg_plan(&mut store, &plan),
            Err(Error::Conflict)
        ));
        // The insert rolled back with the failed update.
        assert_eq!(store.edge_count().unwrap(), 1);
    }

    #[test]
    fn test_project_edge_directive_planned() {
        let mut store = fixture();
        let nodes = vec![node(
            EntityRef::new(EntityKind::Document, "d1"),
            vec![ConnectionRef::new(EntityKind::Project, "proj-1")],
        )];
        let plan = plan_graph_reorg(&store, &nodes, &opts()).unwrap();
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].rel, RelationshipType::HasDocument);
        apply_graph_reorg_plan(&mut store, &plan).unwrap();

        let second = plan_graph_reorg(&store, &nodes, &opts()).unwrap();
        assert!(second.is_noop());
    }

    #[test]
    fn test_missing_node_entity_fails() {
        let store = fixture();
        let nodes = vec![node(task("ghost"), vec![])];
        assert!(matches!(
            plan_graph_reorg(&store, &nodes, &opts()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_connection_target_becomes_diagnostic() {
        let store = fixture();
        let nodes = vec![node(
            task("t1"),
            vec![
                ConnectionRef::new(EntityKind::Task, "ghost"),
                ConnectionRef::new(EntityKind::Plan, "p1"),
            ],
        )];
        let plan = plan_graph_reorg(&store, &nodes, &opts()).unwrap();
        assert_eq!(plan.diagnostics.len(), 1);
        assert!(plan.diagnostics[0].reason.contains("not found"));
        // The healthy connection still planned.
        assert_eq!(plan.inserts.len(), 1);
    }

    #[test]
    fn test_preserve_mode_leaves_semantic_edges_alone() {
        let mut store = fixture();
        seed(
            &mut store,
            vec![Edge::new(task("t1"), task("t2"), RelationshipType::DependsOn)],
        );
        let mut o = opts();
        o.semantic_mode = SemanticMode::Preserve;
        let nodes = vec![node(
            task("t1"),
            vec![ConnectionRef::new(EntityKind::Task, "t3")],
        )];
        let plan = plan_graph_reorg(&store, &nodes, &o).unwrap();
        // The inferred depends_on edge is not materialized, and nothing
        // existing is touched.
        assert!(plan.inserts.is_empty());
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn test_per_node_semantic_mode_override() {
        let mut store = fixture();
        seed(
            &mut store,
            vec![
                Edge::new(task("t1"), task("t3"), RelationshipType::DependsOn),
                Edge::new(task("t2"), task("t3"), RelationshipType::DependsOn),
            ],
        );
        // Call-level merge, but t1 opts into replace: its stale edge goes,
        // t2's stays.
        let mut replace_node = node(
            task("t1"),
            vec![ConnectionRef::new(EntityKind::Task, "t2")],
        );
        replace_node.semantic_mode = Some(SemanticMode::Replace);
        let nodes = vec![
            replace_node,
            node(task("t2"), vec![ConnectionRef::new(EntityKind::Task, "t3")]),
        ];
        let plan = plan_graph_reorg(&store, &nodes, &opts()).unwrap();
        assert_eq!(plan.deletes.len(), 1);
        assert_eq!(plan.deletes[0].src_id, "t1");
        assert_eq!(plan.deletes[0].dst_id, "t3");
        // t1 -> t2 is new; t2 -> t3 already exists and is merged.
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].dst_id, "t2");
    }
}
