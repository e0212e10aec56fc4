//! Resolution of permissive caller input into canonical graph intent.
//!
//! - [`direction`]: canonical edge-direction normalization.
//! - [`token`]: free-text relation token resolution (never fails).
//! - [`policy`]: shared kind predicates and precedence parent selection.
//! - [`connections`]: classification of loose connections into a
//!   [`crate::models::RelationshipPlan`].

pub mod connections;
pub mod direction;
pub mod policy;
pub mod token;

pub use connections::{ResolveOptions, resolve_connections};
pub use direction::normalize_edge;
pub use policy::{ParentSelection, select_parents};
pub use token::{ResolvedToken, normalize_token, resolve_token};
