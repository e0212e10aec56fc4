//! Application of resolved graph intent to the store.
//!
//! - [`containment`]: reconcile one child's containment parents.
//! - [`auto`]: single-entity sequencing façade.
//! - [`reorg`]: multi-entity batch planning and atomic apply.

pub mod auto;
pub mod containment;
pub mod reorg;

pub use auto::{AutoOrganizeRequest, SemanticEdgeSpec, auto_organize};
pub use containment::{ContainmentOptions, apply_containment_edges, fetch_containment_parents};
pub use reorg::{ReorgNode, ReorgOptions, apply_graph_reorg_plan, plan_graph_reorg};
