use bindlist_core::{
    decode_snapshot, CollectionError, GroupedCollection, Identified, ReconcilePolicy,
    ReconcilingCollection,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Item {
    guid: Uuid,
    section: String,
    title: String,
}

impl Identified for Item {
    type Id = Uuid;

    fn identity(&self) -> &Uuid {
        &self.guid
    }
}

fn item_policy() -> ReconcilePolicy<Item> {
    ReconcilePolicy::by_identity().with_merge(|existing: &mut Item, incoming: &Item| {
        if existing.title == incoming.title {
            return false;
        }
        existing.title = incoming.title.clone();
        true
    })
}

fn snapshot_json(rows: &[(Uuid, &str, &str)]) -> String {
    let rows = rows
        .iter()
        .map(|(guid, section, title)| {
            serde_json::json!({ "guid": guid, "section": section, "title": title })
        })
        .collect::<Vec<_>>();
    serde_json::Value::Array(rows).to_string()
}

#[test]
fn json_snapshot_merges_into_collection() {
    let guid = Uuid::new_v4();
    let collection = ReconcilingCollection::with_policy(item_policy());

    collection
        .update_from_json(&snapshot_json(&[(guid, "inbox", "first")]))
        .expect("first snapshot should apply");
    let report = collection
        .update_from_json(&snapshot_json(&[
            (guid, "inbox", "renamed"),
            (Uuid::new_v4(), "inbox", "second"),
        ]))
        .expect("second snapshot should apply");

    assert_eq!(report.merged, 1);
    assert_eq!(report.added, 1);
    let titles = collection.with_items(|items| {
        items
            .iter()
            .map(|item| item.title.clone())
            .collect::<Vec<_>>()
    });
    assert_eq!(titles, vec!["renamed", "second"]);
}

#[test]
fn null_snapshot_is_rejected_without_mutation() {
    let collection = ReconcilingCollection::with_policy(item_policy());
    collection
        .update_from_json(&snapshot_json(&[(Uuid::new_v4(), "inbox", "kept")]))
        .expect("seed snapshot should apply");

    let err = collection
        .update_from_json("null")
        .expect_err("null snapshot must fail");

    assert!(matches!(err, CollectionError::InvalidArgument(_)));
    assert_eq!(collection.len(), 1);
}

#[test]
fn malformed_element_rejects_whole_snapshot() {
    let collection = ReconcilingCollection::with_policy(item_policy());
    let json = format!(
        r#"[{{"guid":"{}","section":"inbox","title":"ok"}},{{"guid":"not-a-uuid","section":"inbox","title":"bad"}}]"#,
        Uuid::new_v4()
    );

    let err = collection
        .update_from_json(&json)
        .expect_err("malformed element must fail");

    assert!(matches!(err, CollectionError::InvalidArgument(_)));
    assert!(collection.is_empty());
}

#[test]
fn grouped_json_snapshot_routes_by_section() {
    let grouped = GroupedCollection::new(
        Vec::new(),
        |item: &Item| item.section.clone(),
        item_policy(),
    );

    let report = grouped
        .update_items_from_json(&snapshot_json(&[
            (Uuid::new_v4(), "work", "a"),
            (Uuid::new_v4(), "home", "b"),
            (Uuid::new_v4(), "work", "c"),
        ]))
        .expect("snapshot should apply");

    assert_eq!(report.created_groups, 2);
    assert_eq!(grouped.keys(), vec!["work".to_string(), "home".to_string()]);
    assert_eq!(grouped.group(&"work".to_string()).expect("work group").len(), 2);

    let err = grouped
        .update_items_from_json(r#"{"guid":"x"}"#)
        .expect_err("object snapshot must fail");
    assert!(matches!(err, CollectionError::InvalidArgument(_)));
    assert_eq!(grouped.len(), 2);
}

#[test]
fn decode_snapshot_reads_typed_items() {
    let guid = Uuid::new_v4();
    let items: Vec<Item> =
        decode_snapshot(&snapshot_json(&[(guid, "inbox", "typed")])).expect("should decode");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].guid, guid);
    assert_eq!(items[0].title, "typed");
}
