//! Element-type-agnostic reorder contract for drag handlers.
//!
//! A gesture layer translates one drag from row A to row B into exactly one
//! `change_ordinal(A, B)` call. It only needs `&dyn Orderable`.

use crate::collection::change::{CollectionChange, Subscription};
use crate::collection::error::CollectionResult;
use crate::collection::reconciling::ReconcilingCollection;

/// Collection that supports positional reordering.
pub trait Orderable {
    /// Moves the element at `old_index` so it ends up at `new_index`.
    fn change_ordinal(&self, old_index: usize, new_index: usize) -> CollectionResult<()>;

    /// Number of reorderable positions.
    fn ordinal_count(&self) -> usize;

    /// Registers a callback fired after every successful reorder.
    fn on_order_changed(&self, callback: Box<dyn Fn()>) -> Subscription;
}

impl<T: Clone + 'static> Orderable for ReconcilingCollection<T> {
    fn change_ordinal(&self, old_index: usize, new_index: usize) -> CollectionResult<()> {
        ReconcilingCollection::change_ordinal(self, old_index, new_index)
    }

    fn ordinal_count(&self) -> usize {
        self.len()
    }

    fn on_order_changed(&self, callback: Box<dyn Fn()>) -> Subscription {
        self.subscribe(move |change| {
            if matches!(change, CollectionChange::OrderChanged) {
                callback();
            }
        })
    }
}
