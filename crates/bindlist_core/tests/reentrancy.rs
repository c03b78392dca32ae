use bindlist_core::{
    CollectionError, GroupedCollection, ReconcilePolicy, ReconcilingCollection,
};
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

#[test]
fn handler_updating_same_collection_is_rejected() {
    let collection = ReconcilingCollection::<u32>::new();
    let outcomes = Rc::new(RefCell::new(Vec::new()));

    let handle = collection.clone();
    let sink = Rc::clone(&outcomes);
    let _subscription = collection.subscribe(move |_| {
        sink.borrow_mut().push(handle.update_range([99]));
    });

    collection.update_range([1, 2]).expect("outer update should succeed");

    assert_eq!(
        *outcomes.borrow(),
        vec![Err(CollectionError::ReentrancyViolation)]
    );
    assert_eq!(collection.to_vec(), vec![1, 2]);
    assert!(collection.is_idle());
}

#[test]
fn handler_reordering_during_dispatch_is_rejected() {
    let collection = ReconcilingCollection::from_items([1, 2, 3], ReconcilePolicy::by_value());
    let outcomes = Rc::new(RefCell::new(Vec::new()));

    let handle = collection.clone();
    let sink = Rc::clone(&outcomes);
    let _subscription = collection.subscribe(move |_| {
        sink.borrow_mut().push(handle.change_ordinal(0, 1));
    });

    collection.change_ordinal(2, 0).expect("outer move should succeed");

    assert_eq!(
        *outcomes.borrow(),
        vec![Err(CollectionError::ReentrancyViolation)]
    );
    assert_eq!(collection.to_vec(), vec![3, 1, 2]);
}

#[test]
fn collection_accepts_updates_again_after_dispatch() {
    let collection = ReconcilingCollection::<u32>::new();
    let handle = collection.clone();
    let _subscription = collection.subscribe(move |_| {
        let _ = handle.update_range([100]);
    });

    collection.update_range([1]).expect("first update should succeed");
    collection.update_range([2]).expect("second update should succeed");

    assert_eq!(collection.to_vec(), vec![1, 2]);
}

#[test]
fn handler_may_read_collection_during_dispatch() {
    let collection = ReconcilingCollection::<u32>::new();
    let lengths = Rc::new(RefCell::new(Vec::new()));

    let handle = collection.clone();
    let sink = Rc::clone(&lengths);
    let _subscription = collection.subscribe(move |_| sink.borrow_mut().push(handle.len()));

    collection.update_range([1, 2, 3]).expect("update should succeed");

    assert_eq!(*lengths.borrow(), vec![3]);
}

#[test]
fn other_collection_may_be_updated_from_handler() {
    let source = ReconcilingCollection::<u32>::new();
    let mirror = ReconcilingCollection::<u32>::new();

    let target = mirror.clone();
    let _subscription = source.subscribe(move |change| {
        if let bindlist_core::CollectionChange::Added { items, .. } = change {
            target
                .update_range(items.iter().copied())
                .expect("mirror update should succeed");
        }
    });

    source.update_range([5, 6]).expect("update should succeed");

    assert_eq!(mirror.to_vec(), vec![5, 6]);
}

#[test]
fn member_handler_updating_grouped_collection_is_rejected() {
    let grouped = GroupedCollection::new(
        [(1u8, 'a')],
        |item: &(u8, char)| item.0,
        ReconcilePolicy::by_value(),
    );
    let outcomes = Rc::new(RefCell::new(Vec::new()));

    let group = grouped.group(&1).expect("group 1 should exist");
    let handle = grouped.clone();
    let sink = Rc::clone(&outcomes);
    let _subscription = group.members().subscribe(move |_| {
        sink.borrow_mut().push(handle.update_items([(2u8, 'x')]).err());
    });

    grouped
        .update_items([(1, 'b')])
        .expect("outer update should succeed");

    assert_eq!(
        *outcomes.borrow(),
        vec![Some(CollectionError::ReentrancyViolation)]
    );
    assert_eq!(grouped.keys(), vec![1]);
    assert!(grouped.as_collection().is_idle());
}

#[test]
fn grouped_update_routing_to_busy_group_changes_nothing() {
    let grouped = GroupedCollection::new(
        [(1u8, 'a'), (2u8, 'b')],
        |item: &(u8, char)| item.0,
        ReconcilePolicy::by_value(),
    );
    let outcomes = Rc::new(RefCell::new(Vec::new()));

    let group = grouped.group(&1).expect("group 1 should exist");
    let handle = grouped.clone();
    let sink = Rc::clone(&outcomes);
    let _subscription = group.members().subscribe(move |_| {
        sink.borrow_mut().push(handle.update_items([(2u8, 'z'), (1u8, 'y')]).err());
    });

    group
        .members()
        .update_range([(1, 'c')])
        .expect("direct member update should succeed");

    assert_eq!(
        *outcomes.borrow(),
        vec![Some(CollectionError::ReentrancyViolation)]
    );
    let second = grouped.group(&2).expect("group 2 should exist");
    assert_eq!(second.members().to_vec(), vec![(2, 'b')]);
}

#[test]
fn panicking_handler_leaves_collection_idle() {
    let collection = ReconcilingCollection::<u32>::new();
    let subscription = collection.subscribe(|_| panic!("handler failed"));

    let outcome = catch_unwind(AssertUnwindSafe(|| collection.update_range([1])));

    assert!(outcome.is_err());
    assert!(collection.is_idle());
    drop(subscription);
    collection
        .update_range([2])
        .expect("update after a panicking handler should succeed");
    assert_eq!(collection.to_vec(), vec![1, 2]);
}

#[test]
fn grouped_handler_updating_grouped_collection_is_rejected() {
    let grouped = GroupedCollection::new(
        [(1u8, 'a')],
        |item: &(u8, char)| item.0,
        ReconcilePolicy::by_value(),
    );
    let outcomes = Rc::new(RefCell::new(Vec::new()));

    let handle = grouped.clone();
    let sink = Rc::clone(&outcomes);
    let _subscription = grouped.subscribe(move |_| {
        sink.borrow_mut().push(handle.update_items([(9u8, 'z')]).err());
    });

    grouped
        .update_items([(2, 'b')])
        .expect("outer update should succeed");

    assert_eq!(
        *outcomes.borrow(),
        vec![Some(CollectionError::ReentrancyViolation)]
    );
    assert_eq!(grouped.keys(), vec![1, 2]);
    assert!(grouped.as_collection().is_idle());
}

#[test]
#[should_panic(expected = "already mutably borrowed")]
fn merge_function_reading_its_own_collection_panics() {
    let owner: Rc<RefCell<Option<ReconcilingCollection<u32>>>> = Rc::new(RefCell::new(None));
    let lookup = Rc::clone(&owner);
    let policy = ReconcilePolicy::by_value().with_merge(move |_, _| {
        lookup
            .borrow()
            .as_ref()
            .is_some_and(|collection| !collection.is_empty())
    });
    let collection = ReconcilingCollection::from_items([1], policy);
    *owner.borrow_mut() = Some(collection.clone());

    let _ = collection.update_range([1]);
}
