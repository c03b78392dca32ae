//! Change notifications and subscriber dispatch.
//!
//! # Responsibility
//! - Describe collection changes as a tagged union instead of a full reset.
//! - Deliver changes synchronously, in registration order.
//! - Track the mutation phase so reentrant writes can be rejected.
//!
//! # Invariants
//! - Dropping a [`Subscription`] removes the callback before the next
//!   dispatch cycle.
//! - A collection is `Idle` again after dispatch, even if a callback panics.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// One structured change emitted by a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionChange<T> {
    /// A contiguous batch appended at `start_index`.
    Added { items: Vec<T>, start_index: usize },
    /// Existing elements whose fields were updated in place.
    ///
    /// Indices are ascending and refer to elements that existed before the
    /// update began.
    Merged { indices: Vec<usize> },
    /// Element order changed; re-read the collection for positions.
    OrderChanged,
}

impl<T> CollectionChange<T> {
    /// Stable short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Added { .. } => "added",
            Self::Merged { .. } => "merged",
            Self::OrderChanged => "order_changed",
        }
    }
}

struct Slot<E> {
    callback: Box<dyn Fn(&E)>,
}

/// RAII guard for a registered callback.
///
/// The callback stays registered for as long as this value is alive.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _slot: Rc<dyn Any>,
}

impl Subscription {
    /// Unsubscribes now. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Ordered list of weakly-held callbacks.
pub(crate) struct Subscribers<E> {
    slots: RefCell<Vec<Weak<Slot<E>>>>,
}

impl<E: 'static> Subscribers<E> {
    pub(crate) fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
        }
    }

    /// Registers `callback`; slots of dropped subscriptions are pruned first.
    pub(crate) fn subscribe(&self, callback: impl Fn(&E) + 'static) -> Subscription {
        let slot = Rc::new(Slot {
            callback: Box::new(callback),
        });
        let mut slots = self.slots.borrow_mut();
        slots.retain(|slot| slot.strong_count() > 0);
        slots.push(Rc::downgrade(&slot));
        Subscription { _slot: slot }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots
            .borrow()
            .iter()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }

    /// Calls every live callback with `event`.
    ///
    /// Live callbacks are collected up front so callbacks may subscribe or
    /// unsubscribe while the event is being delivered.
    pub(crate) fn emit(&self, event: &E) {
        let live: Vec<Rc<Slot<E>>> = {
            let mut slots = self.slots.borrow_mut();
            slots.retain(|slot| slot.strong_count() > 0);
            slots.iter().filter_map(Weak::upgrade).collect()
        };
        for slot in live {
            (slot.callback)(event);
        }
    }
}

/// Mutation phase of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Idle,
    Mutating,
    Dispatching,
}

impl Phase {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Mutating => "mutating",
            Self::Dispatching => "dispatching",
        }
    }
}

/// Restores the owning collection to `Idle` on drop.
pub(crate) struct PhaseGuard<'a> {
    phase: &'a Cell<Phase>,
}

impl<'a> PhaseGuard<'a> {
    /// Enters `next` when currently idle. Returns `None` otherwise.
    pub(crate) fn enter(phase: &'a Cell<Phase>, next: Phase) -> Option<Self> {
        if phase.get() != Phase::Idle {
            return None;
        }
        phase.set(next);
        Some(Self { phase })
    }

    /// Switches an already-held guard to another non-idle phase.
    pub(crate) fn switch(&self, next: Phase) {
        self.phase.set(next);
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.phase.set(Phase::Idle);
    }
}
