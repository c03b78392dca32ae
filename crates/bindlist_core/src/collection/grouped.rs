//! Keyed grouping on top of reconciling collections.
//!
//! # Responsibility
//! - Route incoming elements to the group of their key.
//! - Create groups on first sight of a key, in first-seen order.
//! - Report only newly created groups on the grouped channel.
//!
//! # Invariants
//! - At most one group per distinct key.
//! - Existing groups are never removed or reordered by `update_items`.
//! - Elements never move between groups. An element whose key changed is a
//!   new element of its new group; the stale copy stays in the old group.

use crate::collection::change::{CollectionChange, Subscription};
use crate::collection::error::{CollectionError, CollectionResult};
use crate::collection::orderable::Orderable;
use crate::collection::policy::ReconcilePolicy;
use crate::collection::reconciling::ReconcilingCollection;
use log::{debug, warn};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

const DEFAULT_LABEL: &str = "groups";

/// One keyed section. Cloning shares the member collection.
pub struct ListGroup<K, T> {
    key: K,
    members: ReconcilingCollection<T>,
}

impl<K: Clone, T> Clone for ListGroup<K, T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            members: self.members.clone(),
        }
    }
}

impl<K: Debug, T: Debug> Debug for ListGroup<K, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListGroup")
            .field("key", &self.key)
            .field("members", &self.members)
            .finish()
    }
}

impl<K, T: Clone + 'static> ListGroup<K, T> {
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Member collection; subscribe here for member-level changes.
    pub fn members(&self) -> &ReconcilingCollection<T> {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Summary of one `update_items` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupedReport {
    pub created_groups: usize,
    pub updated_groups: usize,
    pub added_members: usize,
    pub merged_members: usize,
}

/// Reconciling collection of keyed groups.
pub struct GroupedCollection<K, T> {
    groups: ReconcilingCollection<ListGroup<K, T>>,
    key_selector: Rc<dyn Fn(&T) -> K>,
    member_policy: ReconcilePolicy<T>,
}

impl<K, T> Clone for GroupedCollection<K, T> {
    fn clone(&self) -> Self {
        Self {
            groups: self.groups.clone(),
            key_selector: Rc::clone(&self.key_selector),
            member_policy: self.member_policy.clone(),
        }
    }
}

impl<K: Debug, T: Debug> Debug for GroupedCollection<K, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupedCollection")
            .field("groups", &self.groups)
            .finish()
    }
}

impl<K, T> GroupedCollection<K, T>
where
    K: PartialEq + Clone + Debug + 'static,
    T: Clone + 'static,
{
    /// Creates a grouped collection seeded with `initial`.
    ///
    /// `member_policy` is handed to every group created now or later.
    pub fn new(
        initial: impl IntoIterator<Item = T>,
        key_selector: impl Fn(&T) -> K + 'static,
        member_policy: ReconcilePolicy<T>,
    ) -> Self {
        Self::named(DEFAULT_LABEL, initial, key_selector, member_policy)
    }

    pub fn named(
        label: impl Into<String>,
        initial: impl IntoIterator<Item = T>,
        key_selector: impl Fn(&T) -> K + 'static,
        member_policy: ReconcilePolicy<T>,
    ) -> Self {
        let groups = ReconcilingCollection::named(
            label,
            ReconcilePolicy::new(|existing: &ListGroup<K, T>, incoming: &ListGroup<K, T>| {
                existing.key == incoming.key
            }),
        );
        let grouped = Self {
            groups,
            key_selector: Rc::new(key_selector),
            member_policy,
        };

        let seeded = grouped
            .partition(initial)
            .into_iter()
            .map(|(key, members)| grouped.new_group(key, members))
            .collect::<Vec<_>>();
        grouped.groups.seed(seeded);
        grouped
    }

    /// Merges a complete incoming snapshot into the groups.
    ///
    /// Partitions for existing keys are forwarded to that group's
    /// `update_range`; new keys create groups appended in first-seen order.
    /// One `Added` change carrying only the new groups is emitted.
    ///
    /// # Errors
    /// - `ReentrancyViolation` when this collection, or any group the
    ///   snapshot routes to, is busy. Nothing is modified in that case.
    pub fn update_items(
        &self,
        incoming: impl IntoIterator<Item = T>,
    ) -> CollectionResult<GroupedReport> {
        let guard = self.groups.begin("update_items")?;

        let routed = self
            .partition(incoming)
            .into_iter()
            .map(|(key, members)| {
                let existing = self.group(&key);
                (key, members, existing)
            })
            .collect::<Vec<_>>();

        if let Some(busy) = routed
            .iter()
            .filter_map(|(_, _, existing)| existing.as_ref())
            .find(|group| !group.members.is_idle())
        {
            warn!(
                "event=reentrancy_rejected module=grouped status=rejected label={} group={}",
                self.groups.label(),
                busy.members.label()
            );
            return Err(CollectionError::ReentrancyViolation);
        }

        let mut report = GroupedReport::default();
        let mut created = Vec::new();
        for (key, members, existing) in routed {
            match existing {
                Some(group) => {
                    let member_report = group.members.update_range(members)?;
                    report.updated_groups += 1;
                    report.added_members += member_report.added;
                    report.merged_members += member_report.merged;
                }
                None => {
                    let group = self.new_group(key, members);
                    report.added_members += group.len();
                    created.push(group);
                }
            }
        }
        report.created_groups = created.len();

        let (_, changes) = self.groups.reconcile(created);
        debug!(
            "event=update_items module=grouped status=ok label={} created_groups={} updated_groups={} added_members={} merged_members={}",
            self.groups.label(),
            report.created_groups,
            report.updated_groups,
            report.added_members,
            report.merged_members
        );
        self.groups.dispatch(guard, changes);
        Ok(report)
    }

    /// Moves a whole group to a new position.
    pub fn change_ordinal(&self, old_index: usize, new_index: usize) -> CollectionResult<()> {
        self.groups.change_ordinal(old_index, new_index)
    }

    /// Registers a callback for group-level changes.
    pub fn subscribe(
        &self,
        callback: impl Fn(&CollectionChange<ListGroup<K, T>>) + 'static,
    ) -> Subscription {
        self.groups.subscribe(callback)
    }

    /// Returns the group for `key`, if one was created.
    pub fn group(&self, key: &K) -> Option<ListGroup<K, T>> {
        self.groups.find(|group| group.key == *key)
    }

    pub fn groups(&self) -> Vec<ListGroup<K, T>> {
        self.groups.to_vec()
    }

    pub fn keys(&self) -> Vec<K> {
        self.groups
            .with_items(|groups| groups.iter().map(|group| group.key.clone()).collect())
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of members across all groups.
    pub fn member_count(&self) -> usize {
        self.groups
            .with_items(|groups| groups.iter().map(ListGroup::len).sum())
    }

    /// Underlying collection of groups.
    pub fn as_collection(&self) -> &ReconcilingCollection<ListGroup<K, T>> {
        &self.groups
    }

    /// Splits `incoming` by key, keys in first-seen order.
    fn partition(&self, incoming: impl IntoIterator<Item = T>) -> Vec<(K, Vec<T>)> {
        let mut partitions: Vec<(K, Vec<T>)> = Vec::new();
        for item in incoming {
            let key = (self.key_selector)(&item);
            match partitions
                .iter_mut()
                .find(|(partition_key, _)| *partition_key == key)
            {
                Some((_, members)) => members.push(item),
                None => partitions.push((key, vec![item])),
            }
        }
        partitions
    }

    fn new_group(&self, key: K, members: Vec<T>) -> ListGroup<K, T> {
        let label = format!("{}/{:?}", self.groups.label(), key);
        let collection = ReconcilingCollection::named(label, self.member_policy.clone());
        collection.seed(members);
        ListGroup {
            key,
            members: collection,
        }
    }
}

impl<K, T> Orderable for GroupedCollection<K, T>
where
    K: PartialEq + Clone + Debug + 'static,
    T: Clone + 'static,
{
    fn change_ordinal(&self, old_index: usize, new_index: usize) -> CollectionResult<()> {
        GroupedCollection::change_ordinal(self, old_index, new_index)
    }

    fn ordinal_count(&self) -> usize {
        self.len()
    }

    fn on_order_changed(&self, callback: Box<dyn Fn()>) -> Subscription {
        self.groups.on_order_changed(callback)
    }
}
