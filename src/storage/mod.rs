//! Store interface consumed by the reconciliation core.
//!
//! The entity and edge tables are an external transactional store; the core
//! needs point reads, filtered scans, and one atomic multi-row apply with
//! per-row optimistic-concurrency comparison. [`sqlite`] provides the
//! reference implementation.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::Result;
use crate::models::{Edge, EdgeKey, EdgeRecord, EdgeUpdate, EntityKind};
use crate::vocab::RelationshipType;

/// Filter for edge scans. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeFilter {
    pub src_kind: Option<EntityKind>,
    pub src_id: Option<String>,
    pub dst_kind: Option<EntityKind>,
    pub dst_id: Option<String>,
    pub rel_in: Option<Vec<RelationshipType>>,
    pub src_id_in: Option<Vec<String>>,
    pub dst_id_in: Option<Vec<String>>,
}

impl EdgeFilter {
    pub fn src(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            src_kind: Some(kind),
            src_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn dst(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            dst_kind: Some(kind),
            dst_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_rels(mut self, rels: &[RelationshipType]) -> Self {
        self.rel_in = Some(rels.to_vec());
        self
    }
}

/// One atomic batch of edge mutations. Applied deletes-first, then inserts,
/// then updates; each update's `expected_props` must still match the stored
/// row or the whole batch fails with [`crate::Error::Conflict`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeBatch {
    pub deletes: Vec<EdgeKey>,
    pub updates: Vec<EdgeUpdate>,
    pub inserts: Vec<Edge>,
}

impl EdgeBatch {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.updates.is_empty() && self.inserts.is_empty()
    }
}

/// Contract the reconciliation core requires from an edge store. Entity
/// CRUD beyond the existence check is the host application's concern.
pub trait EdgeStore {
    /// Scan edges matching a filter.
    fn scan_edges(&self, filter: &EdgeFilter) -> Result<Vec<EdgeRecord>>;

    /// True when the entity exists, belongs to the project, and is not
    /// soft-deleted.
    fn entity_exists(&self, kind: EntityKind, id: &str, project_id: &str) -> Result<bool>;

    /// Apply a batch atomically (all-or-nothing). Must fail with
    /// [`crate::Error::Conflict`] when any update's expected props no
    /// longer match the current row.
    fn apply_edge_batch(&mut self, batch: &EdgeBatch) -> Result<()>;
}
