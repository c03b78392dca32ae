//! Observable collections backing bound lists.
//!
//! # Responsibility
//! - Reconcile complete incoming snapshots without discarding element
//!   identity or firing full resets.
//! - Maintain keyed groups incrementally.
//! - Expose drag reordering through an element-agnostic contract.
//!
//! # Invariants
//! - Collections only grow through `update_range`/`update_items`; elements
//!   and groups absent from a later snapshot are kept.
//! - All operations run to completion on the calling thread.

pub mod change;
pub mod error;
pub mod grouped;
pub mod orderable;
pub mod policy;
pub mod reconciling;
