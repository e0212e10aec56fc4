//! Ontograph - a reconciliation engine for typed project ontology graphs.
//!
//! The graph is a set of project-management entities (projects, plans,
//! tasks, goals, ...) connected by directed, semantically-typed edges in a
//! single edge table. Callers supply loose connection requests ("link this
//! task to that goal"); this library turns them into a consistent desired
//! edge set, diffs it against stored state, and applies the minimal
//! create/update/delete batch with optimistic-concurrency conflict
//! detection.
//!
//! Entry points:
//! - [`resolve::resolve_connections`] - classify one entity's connections
//!   into a [`models::RelationshipPlan`].
//! - [`organize::apply_containment_edges`] - reconcile one child's
//!   containment parents.
//! - [`organize::auto_organize`] - single-entity sequencing façade.
//! - [`organize::plan_graph_reorg`] / [`organize::apply_graph_reorg_plan`] -
//!   batch diff-and-apply across many nodes.

pub mod models;
pub mod organize;
pub mod resolve;
pub mod storage;
pub mod vocab;

/// Library-level error type for ontograph operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller defect: unsupported kind, disallowed parent, malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced entity missing, soft-deleted, or outside the stated
    /// project (collapsed to not-found for isolation).
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Optimistic-concurrency failure during batch apply. The graph changed
    /// since planning; re-plan from fresh state instead of retrying.
    #[error("Concurrent modification detected; re-plan and retry")]
    Conflict,

    /// Any other store failure, surfaced verbatim.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for ontograph operations.
pub type Result<T> = std::result::Result<T, Error>;
