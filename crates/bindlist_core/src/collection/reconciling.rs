//! Identity-preserving, incrementally updatable ordered collection.
//!
//! # Responsibility
//! - Merge complete incoming snapshots into existing state.
//! - Reposition single elements for drag reordering.
//! - Emit structured change notifications instead of resets.
//!
//! # Invariants
//! - No two held elements match under the configured comparer.
//! - A matched element is merged in place and never replaced.
//! - `update_range` never removes or reorders existing elements, so the
//!   length never decreases.
//! - Mutation during mutation or dispatch fails with `ReentrancyViolation`.

use crate::collection::change::{CollectionChange, Phase, PhaseGuard, Subscribers, Subscription};
use crate::collection::error::{CollectionError, CollectionResult};
use crate::collection::policy::ReconcilePolicy;
use log::{debug, warn};
use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

const DEFAULT_LABEL: &str = "collection";

/// Summary of one `update_range` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Index where the appended batch starts (old length).
    pub start_index: usize,
    /// Number of appended elements.
    pub added: usize,
    /// Number of pre-existing elements changed by the merge function.
    pub merged: usize,
}

impl ReconcileReport {
    /// Whether the call changed anything observable.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.merged == 0
    }
}

struct Inner<T> {
    label: String,
    policy: ReconcilePolicy<T>,
    items: RefCell<Vec<T>>,
    phase: Cell<Phase>,
    subscribers: Subscribers<CollectionChange<T>>,
}

/// Shared handle to an ordered, reconciling collection.
///
/// Cloning the handle shares the same underlying state. Handles are
/// single-threaded.
pub struct ReconcilingCollection<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for ReconcilingCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug> Debug for ReconcilingCollection<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcilingCollection")
            .field("label", &self.inner.label)
            .field("items", &self.inner.items.borrow())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Default for ReconcilingCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> ReconcilingCollection<T> {
    /// Creates an empty collection matching elements by value.
    pub fn new() -> Self
    where
        T: PartialEq,
    {
        Self::with_policy(ReconcilePolicy::by_value())
    }

    pub fn with_policy(policy: ReconcilePolicy<T>) -> Self {
        Self::named(DEFAULT_LABEL, policy)
    }

    /// Creates an empty collection whose log lines carry `label`.
    pub fn named(label: impl Into<String>, policy: ReconcilePolicy<T>) -> Self {
        Self {
            inner: Rc::new(Inner {
                label: label.into(),
                policy,
                items: RefCell::new(Vec::new()),
                phase: Cell::new(Phase::Idle),
                subscribers: Subscribers::new(),
            }),
        }
    }

    /// Creates a collection seeded with `initial`.
    ///
    /// Seeding uses the same matching rules as `update_range`, so duplicate
    /// initial elements collapse. No notification is emitted.
    pub fn from_items(initial: impl IntoIterator<Item = T>, policy: ReconcilePolicy<T>) -> Self {
        let collection = Self::with_policy(policy);
        collection.seed(initial);
        collection
    }

    pub(crate) fn seed(&self, initial: impl IntoIterator<Item = T>) {
        let mut items = self.inner.items.borrow_mut();
        reconcile_into(&mut items, initial, &self.inner.policy);
    }

    /// Merges a complete incoming snapshot into the collection.
    ///
    /// Matched elements are merged in place; unmatched ones are appended as a
    /// single batch in incoming order. Elements absent from `incoming` are
    /// kept.
    ///
    /// # Errors
    /// - `ReentrancyViolation` when called while this collection is applying
    ///   or dispatching another change. Nothing is modified in that case.
    ///
    /// # Panics
    /// When the policy's comparer or merge function accesses this collection.
    pub fn update_range(
        &self,
        incoming: impl IntoIterator<Item = T>,
    ) -> CollectionResult<ReconcileReport> {
        let guard = self.begin("update_range")?;
        let (report, changes) = self.reconcile(incoming);
        debug!(
            "event=update_range module=collection status=ok label={} added={} merged={} len={}",
            self.inner.label,
            report.added,
            report.merged,
            report.start_index + report.added
        );
        self.dispatch(guard, changes);
        Ok(report)
    }

    /// Moves the element at `old_index` so that it ends up at `new_index`.
    ///
    /// Elements between the two positions shift by one. Fires
    /// [`CollectionChange::OrderChanged`].
    ///
    /// # Errors
    /// - `IndexOutOfRange` when either index is `>= len`.
    /// - `ReentrancyViolation` as for `update_range`.
    pub fn change_ordinal(&self, old_index: usize, new_index: usize) -> CollectionResult<()> {
        let guard = self.begin("change_ordinal")?;
        {
            let mut items = self.inner.items.borrow_mut();
            let len = items.len();
            for index in [old_index, new_index] {
                if index >= len {
                    return Err(CollectionError::IndexOutOfRange { index, len });
                }
            }
            let moved = items.remove(old_index);
            items.insert(new_index, moved);
        }
        debug!(
            "event=change_ordinal module=collection status=ok label={} old_index={} new_index={}",
            self.inner.label, old_index, new_index
        );
        self.dispatch(guard, vec![CollectionChange::OrderChanged]);
        Ok(())
    }

    /// Registers a change callback. Keep the returned handle alive to stay
    /// subscribed.
    pub fn subscribe(&self, callback: impl Fn(&CollectionChange<T>) + 'static) -> Subscription {
        self.inner.subscribers.subscribe(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    /// Returns a clone of the element at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.items.borrow().get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.inner.items.borrow().clone()
    }

    /// Runs `f` against the current items without cloning them.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(self.inner.items.borrow().as_slice())
    }

    pub fn position(&self, predicate: impl Fn(&T) -> bool) -> Option<usize> {
        self.inner.items.borrow().iter().position(predicate)
    }

    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.inner
            .items
            .borrow()
            .iter()
            .find(|item| predicate(item))
            .cloned()
    }

    /// Whether no change is currently being applied or dispatched.
    pub fn is_idle(&self) -> bool {
        self.inner.phase.get() == Phase::Idle
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn policy(&self) -> &ReconcilePolicy<T> {
        &self.inner.policy
    }

    /// Whether both handles share the same collection.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Enters the mutating phase or rejects a reentrant call.
    pub(crate) fn begin(&self, operation: &'static str) -> CollectionResult<PhaseGuard<'_>> {
        PhaseGuard::enter(&self.inner.phase, Phase::Mutating).ok_or_else(|| {
            warn!(
                "event=reentrancy_rejected module=collection status=rejected label={} operation={} phase={}",
                self.inner.label,
                operation,
                self.inner.phase.get().as_str()
            );
            CollectionError::ReentrancyViolation
        })
    }

    /// Applies `incoming` and returns the changes to publish.
    ///
    /// Callers must hold the guard returned by `begin`.
    pub(crate) fn reconcile(
        &self,
        incoming: impl IntoIterator<Item = T>,
    ) -> (ReconcileReport, Vec<CollectionChange<T>>) {
        let mut items = self.inner.items.borrow_mut();
        let reconciled = reconcile_into(&mut items, incoming, &self.inner.policy);

        let report = ReconcileReport {
            start_index: reconciled.start_index,
            added: reconciled.added,
            merged: reconciled.merged.len(),
        };
        let mut changes = Vec::new();
        if !reconciled.merged.is_empty() {
            changes.push(CollectionChange::Merged {
                indices: reconciled.merged,
            });
        }
        if reconciled.added > 0 {
            changes.push(CollectionChange::Added {
                items: items[reconciled.start_index..].to_vec(),
                start_index: reconciled.start_index,
            });
        }
        (report, changes)
    }

    /// Delivers `changes` to subscribers, then releases the guard.
    pub(crate) fn dispatch(&self, guard: PhaseGuard<'_>, changes: Vec<CollectionChange<T>>) {
        if changes.is_empty() {
            return;
        }
        guard.switch(Phase::Dispatching);
        for change in &changes {
            self.inner.subscribers.emit(change);
        }
    }
}

struct Reconciled {
    start_index: usize,
    added: usize,
    merged: Vec<usize>,
}

/// Linear-scan merge-or-append of `incoming` into `items`.
///
/// Later duplicates inside `incoming` match the copy appended earlier in the
/// same batch and are merged into it.
fn reconcile_into<T>(
    items: &mut Vec<T>,
    incoming: impl IntoIterator<Item = T>,
    policy: &ReconcilePolicy<T>,
) -> Reconciled {
    let start_index = items.len();
    let mut merged = Vec::new();

    for candidate in incoming {
        match items
            .iter()
            .position(|existing| policy.matches(existing, &candidate))
        {
            Some(index) => {
                if policy.merge(&mut items[index], &candidate) && index < start_index {
                    merged.push(index);
                }
            }
            None => items.push(candidate),
        }
    }

    merged.sort_unstable();
    merged.dedup();
    Reconciled {
        start_index,
        added: items.len() - start_index,
        merged,
    }
}
