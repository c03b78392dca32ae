//! Identity and merge policy for reconciliation.
//!
//! # Responsibility
//! - Decide whether an incoming element is the same logical entity as an
//!   element already held by a collection.
//! - Copy mutable fields from an incoming element onto the matched one.
//!
//! # Invariants
//! - The comparer is always called as `(existing, incoming)`.
//! - The merge function mutates the existing element in place; it never
//!   hands back a replacement.

use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Shared predicate: `(existing, incoming) -> same logical entity`.
pub type IdentityComparer<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Shared field merge: `(existing, incoming) -> anything changed`.
pub type MergeFn<T> = Rc<dyn Fn(&mut T, &T) -> bool>;

/// Entity with a stable identity that survives across snapshots.
///
/// Typical ids are database row numbers or GUID strings.
pub trait Identified {
    type Id: PartialEq;

    fn identity(&self) -> &Self::Id;
}

impl<U: Identified> Identified for Rc<U> {
    type Id = U::Id;

    fn identity(&self) -> &Self::Id {
        (**self).identity()
    }
}

/// Comparer plus optional merge function used by a collection.
pub struct ReconcilePolicy<T> {
    comparer: IdentityComparer<T>,
    merge: Option<MergeFn<T>>,
}

impl<T> Clone for ReconcilePolicy<T> {
    fn clone(&self) -> Self {
        Self {
            comparer: Rc::clone(&self.comparer),
            merge: self.merge.clone(),
        }
    }
}

impl<T> Debug for ReconcilePolicy<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcilePolicy")
            .field("merge", &self.merge.is_some())
            .finish()
    }
}

impl<T: PartialEq + 'static> Default for ReconcilePolicy<T> {
    fn default() -> Self {
        Self::by_value()
    }
}

impl<T: 'static> ReconcilePolicy<T> {
    /// Creates a policy from an arbitrary `(existing, incoming)` predicate.
    ///
    /// # Panics
    /// The comparer runs while the owning collection's elements are mutably
    /// borrowed. A comparer that reads or updates that same collection
    /// panics with a `RefCell` borrow error.
    pub fn new(comparer: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            comparer: Rc::new(comparer),
            merge: None,
        }
    }

    /// Matches elements by plain value equality.
    pub fn by_value() -> Self
    where
        T: PartialEq,
    {
        Self::new(|existing: &T, incoming: &T| existing == incoming)
    }

    /// Matches elements whose derived keys are equal.
    pub fn by_key<K: PartialEq>(key: impl Fn(&T) -> K + 'static) -> Self {
        Self::new(move |existing: &T, incoming: &T| key(existing) == key(incoming))
    }

    /// Matches elements by their stable entity id.
    pub fn by_identity() -> Self
    where
        T: Identified,
    {
        Self::new(|existing: &T, incoming: &T| existing.identity() == incoming.identity())
    }

    /// Attaches a merge function applied to matched elements.
    ///
    /// # Panics
    /// Like the comparer, the merge function must not access the collection
    /// it is merging into; doing so panics with a `RefCell` borrow error.
    pub fn with_merge(mut self, merge: impl Fn(&mut T, &T) -> bool + 'static) -> Self {
        self.merge = Some(Rc::new(merge));
        self
    }
}

impl<T> ReconcilePolicy<T> {
    pub fn matches(&self, existing: &T, incoming: &T) -> bool {
        (self.comparer)(existing, incoming)
    }

    /// Applies the merge function, if any. Returns whether a field changed.
    pub fn merge(&self, existing: &mut T, incoming: &T) -> bool {
        match &self.merge {
            Some(merge) => merge(existing, incoming),
            None => false,
        }
    }

    pub fn has_merge(&self) -> bool {
        self.merge.is_some()
    }
}
