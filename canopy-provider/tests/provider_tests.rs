mod common;

use canopy_codec::CodecError;
use canopy_provider::{DataProvider, ProviderError, TreeDataProvider};
use canopy_store::{ChildChange, MemoryTree, OrderBy, StoreError, TreeStore};
use canopy_types::ObservationType::{ChildAdded, ChildChanged, ChildRemoved};
use common::{Message, ScriptedStore, Upload, ids, map, recorder, seeded};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn messages(tree: &Arc<MemoryTree>) -> TreeDataProvider<Message> {
    TreeDataProvider::new(tree.clone(), "messages")
}

// ── Create ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_without_id_generates_distinct_keys() {
    let tree = Arc::new(MemoryTree::new());
    let provider = messages(&tree);

    let mut first = Message::new("", "ada", "hello");
    let mut second = Message::new("", "ada", "hello");
    let a = provider.create(&mut first).unwrap();
    let b = provider.create(&mut second).unwrap();

    assert!(!a.is_empty());
    assert_ne!(a, b);
    assert!(a < b, "push keys sort by creation time");
    assert_eq!(first.id, a);
    assert_eq!(second.id, b);
    assert_eq!(provider.read_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn create_with_id_upserts() {
    let tree = Arc::new(MemoryTree::new());
    let provider = messages(&tree);

    let mut message = Message::new("", "ada", "draft");
    let id = provider.create(&mut message).unwrap();
    message.text = "final".to_string();
    assert_eq!(provider.create(&mut message).unwrap(), id);

    let all = provider.read_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].text, "final");
}

#[tokio::test]
async fn create_leaves_absent_fields_untouched() {
    let tree = Arc::new(MemoryTree::new());
    let provider = messages(&tree);

    let mut message = Message::new("m1", "ada", "hi");
    message.title = Some("greeting".to_string());
    provider.create(&mut message).unwrap();

    let mut sparse = Message::new("m1", "ada", "hi again");
    provider.create(&mut sparse).unwrap();

    let stored = provider.read("m1").await.unwrap().unwrap();
    assert_eq!(stored.title.as_deref(), Some("greeting"));
    assert_eq!(stored.text, "hi again");
}

#[tokio::test]
async fn create_writes_the_id_field() {
    let tree = Arc::new(MemoryTree::new());
    let provider = messages(&tree);

    provider.create(&mut Message::new("m1", "ada", "hi")).unwrap();

    let stored = tree.value_at("messages/m1").unwrap();
    assert_eq!(stored["id"], json!("m1"));
    assert_eq!(stored["likes"], json!(0));
    assert_eq!(stored["date"], json!("2024-05-01T12:00:00.000000000Z"));
}

#[tokio::test]
async fn encode_failure_writes_nothing_and_restores_the_id() {
    let tree = Arc::new(MemoryTree::new());
    let provider: TreeDataProvider<Upload> = TreeDataProvider::new(tree.clone(), "uploads");

    let mut upload = Upload::default();
    let err = provider.create(&mut upload).unwrap_err();

    assert!(matches!(err, ProviderError::Codec(CodecError::Unsupported { .. })));
    assert_eq!(upload.id, "");
    assert_eq!(tree.value_at("uploads").unwrap(), json!(null));
}

#[tokio::test]
async fn encode_failure_keeps_a_caller_id() {
    let tree = Arc::new(MemoryTree::new());
    let provider: TreeDataProvider<Upload> = TreeDataProvider::new(tree.clone(), "uploads");

    let mut upload = Upload {
        id: "u1".to_string(),
        ..Default::default()
    };
    assert!(provider.create(&mut upload).is_err());
    assert_eq!(upload.id, "u1");
}

#[tokio::test]
async fn create_rejects_nested_ids() {
    let tree = Arc::new(MemoryTree::new());
    let provider = messages(&tree);

    let err = provider.create(&mut Message::new("a/b", "ada", "hi")).unwrap_err();
    assert!(matches!(err, ProviderError::Store(StoreError::InvalidPath(_))));
}

#[tokio::test]
async fn create_with_ack_confirms() {
    let tree = Arc::new(MemoryTree::new());
    let provider = messages(&tree);

    let pending = provider.create_with_ack(&mut Message::new("m1", "ada", "hi")).unwrap();
    assert_eq!(pending.id(), "m1");
    assert_eq!(pending.confirmed().await.unwrap(), "m1");
    assert!(provider.exists("m1").await.unwrap());
}

// ── Reads ────────────────────────────────────────────────────────

#[tokio::test]
async fn read_returns_stored_entity() {
    let provider = messages(&seeded());

    let message = provider.read("k2").await.unwrap().unwrap();
    assert_eq!(message.id, "k2");
    assert_eq!(message.name, "bob");
    assert_eq!(message.text, "second");
}

#[tokio::test]
async fn read_missing_is_none() {
    let provider = messages(&seeded());
    assert_eq!(provider.read("nope").await.unwrap(), None);
}

#[tokio::test]
async fn read_undecodable_is_none() {
    let tree = Arc::new(MemoryTree::with_root(json!({
        "messages": { "k1": "not a record" }
    })));
    let provider = messages(&tree);
    assert_eq!(provider.read("k1").await.unwrap(), None);
}

#[tokio::test]
async fn read_all_drops_only_malformed_children() {
    let tree = Arc::new(MemoryTree::with_root(json!({
        "messages": {
            "k1": { "name": "ada" },
            "k2": 42,
            "k3": { "name": "cy" },
        }
    })));
    let provider = messages(&tree);

    let all = provider.read_all().await.unwrap();
    let names: Vec<&str> = all.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["ada", "cy"]);
}

#[tokio::test]
async fn read_all_of_empty_collection() {
    let provider = messages(&Arc::new(MemoryTree::new()));
    assert!(provider.read_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn read_first_from_child_value_finds_a_match() {
    let provider = messages(&seeded());

    let found = provider
        .read_first_from_child_value("name", "ada")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, "k1");

    let none = provider.read_first_from_child_value("name", "zed").await.unwrap();
    assert_eq!(none, None);
}

#[tokio::test]
async fn read_first_uses_one_limited_query() {
    let store = Arc::new(ScriptedStore {
        children: json!({ "a": { "name": "ada" } }),
        ..Default::default()
    });
    let provider: TreeDataProvider<Message> = TreeDataProvider::new(store.clone(), "messages");

    provider.read_first_from_child_value("name", "ada").await.unwrap();

    let queries = store.queries.lock();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].order_by, OrderBy::Child("name".to_string()));
    assert_eq!(queries[0].equal_to, Some(json!("ada")));
    assert_eq!(queries[0].limit_to_first, Some(1));
}

#[tokio::test]
async fn read_all_with_child_value_matches_exactly() {
    let provider = messages(&seeded());

    let found = provider.read_all_with_child_value("name", "ada").await.unwrap();
    let ids: Vec<&str> = found.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["k1", "k3"]);
}

#[tokio::test]
async fn read_all_with_child_value_drops_false_positives() {
    let store = Arc::new(ScriptedStore {
        children: json!({
            "a": { "name": "ada" },
            "b": { "name": "Ada" },
            "c": { "text": "no name" },
        }),
        ..Default::default()
    });
    let provider: TreeDataProvider<Message> = TreeDataProvider::new(store, "messages");

    let found = provider.read_all_with_child_value("name", "ada").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "a");
}

#[tokio::test]
async fn numeric_child_value_is_queried_as_a_number() {
    let tree = Arc::new(MemoryTree::with_root(json!({
        "messages": {
            "k1": { "likes": 5 },
            "k2": { "likes": 7 },
        }
    })));
    let provider = messages(&tree);

    let found = provider.read_all_with_child_value("likes", "7").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "k2");
}

#[tokio::test]
async fn unknown_field_is_missing_field() {
    let provider = messages(&seeded());

    let err = provider.read_all_with_child_value("nope", "x").await.unwrap_err();
    assert!(matches!(err, ProviderError::MissingField { ref field, .. } if field == "nope"));

    let err = provider.read_first_from_child_value("Name", "ada").await.unwrap_err();
    assert!(matches!(err, ProviderError::MissingField { .. }));
}

#[tokio::test]
async fn exists_reports_presence() {
    let provider = messages(&seeded());
    assert!(provider.exists("k1").await.unwrap());
    assert!(!provider.exists("k9").await.unwrap());
}

// ── Paging ───────────────────────────────────────────────────────

async fn page(provider: &TreeDataProvider<Message>, size: usize, cursor: Option<&str>) -> Vec<String> {
    provider
        .read_page_from_newest(size, cursor)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect()
}

#[tokio::test]
async fn pages_walk_back_from_newest() {
    let tree = Arc::new(MemoryTree::new());
    let provider = messages(&tree);
    provider.create(&mut Message::new("k1", "ada", "old")).unwrap();
    provider.create(&mut Message::new("k2", "ada", "new")).unwrap();

    assert_eq!(page(&provider, 1, None).await, vec!["k2"]);
    assert_eq!(page(&provider, 1, Some("k2")).await, vec!["k1"]);
    assert!(page(&provider, 1, Some("k1")).await.is_empty());
}

#[tokio::test]
async fn page_is_sorted_descending_and_capped() {
    let provider = messages(&seeded());

    assert_eq!(page(&provider, 10, None).await, vec!["k3", "k2", "k1"]);
    assert_eq!(page(&provider, 2, None).await, vec!["k3", "k2"]);
    assert_eq!(page(&provider, 2, Some("k3")).await, vec!["k2", "k1"]);
}

#[tokio::test]
async fn empty_cursor_means_newest() {
    let provider = messages(&seeded());
    assert_eq!(page(&provider, 1, Some("")).await, vec!["k3"]);
}

#[tokio::test]
async fn cursor_between_keys_is_not_required_to_exist() {
    let provider = messages(&seeded());
    assert_eq!(page(&provider, 5, Some("k25")).await, vec!["k2", "k1"]);
}

#[tokio::test]
async fn zero_page_size_reads_nothing() {
    let store = Arc::new(ScriptedStore::default());
    let provider: TreeDataProvider<Message> = TreeDataProvider::new(store.clone(), "messages");

    assert!(provider.read_page_from_newest(0, None).await.unwrap().is_empty());
    assert!(store.queries.lock().is_empty());
}

#[tokio::test]
async fn page_excludes_cursor_even_when_store_returns_it() {
    let store = Arc::new(ScriptedStore {
        children: json!({
            "k1": { "name": "a" },
            "k2": { "name": "b" },
            "k3": { "name": "c" },
        }),
        ..Default::default()
    });
    let provider: TreeDataProvider<Message> = TreeDataProvider::new(store.clone(), "messages");

    let ids: Vec<String> = provider
        .read_page_from_newest(2, Some("k3"))
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec!["k2", "k1"]);

    let query = store.queries.lock()[0].clone();
    assert_eq!(query.order_by, OrderBy::Key);
    assert_eq!(query.end_at, Some(json!("k3")));
    assert_eq!(query.limit_to_last, Some(3));
}

proptest! {
    #[test]
    fn page_never_exceeds_size_or_includes_cursor(
        count in 0usize..12,
        size in 0usize..6,
        cursor_at in proptest::option::of(0usize..12),
    ) {
        let mut children = serde_json::Map::new();
        for i in 0..count {
            children.insert(format!("k{i:02}"), json!({ "text": "x" }));
        }
        let tree = Arc::new(MemoryTree::with_root(json!({ "messages": children })));
        let provider = messages(&tree);
        let cursor = cursor_at.map(|i| format!("k{i:02}"));

        let ids = tokio_test::block_on(page(&provider, size, cursor.as_deref()));

        prop_assert!(ids.len() <= size);
        prop_assert!(ids.windows(2).all(|w| w[0] > w[1]));
        if let Some(cursor) = &cursor {
            prop_assert!(ids.iter().all(|id| id < cursor));
        }
    }
}

// ── Delete ───────────────────────────────────────────────────────

#[tokio::test]
async fn delete_removes_entity() {
    let tree = seeded();
    let provider = messages(&tree);

    provider.delete("k1").wait().await.unwrap();
    assert!(!provider.exists("k1").await.unwrap());
    assert_eq!(provider.read_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn delete_absent_entity_succeeds() {
    let provider = messages(&seeded());
    provider.delete("k9").wait().await.unwrap();
}

#[tokio::test]
async fn delete_rejects_empty_id() {
    let provider = messages(&seeded());
    let err = provider.delete("").wait().await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidPath(_)));
}

// ── Observation ──────────────────────────────────────────────────

#[tokio::test]
async fn observe_replays_then_follows_changes() {
    let tree = seeded();
    let provider = messages(&tree);
    let (handler, events) = recorder();

    provider.observe(handler).unwrap();
    assert!(provider.has_observation());
    assert_eq!(
        ids(&events),
        vec![
            (ChildAdded, "k1".to_string()),
            (ChildAdded, "k2".to_string()),
            (ChildAdded, "k3".to_string()),
        ]
    );
    events.lock().clear();

    provider.create(&mut Message::new("k4", "dee", "fourth")).unwrap();
    tree.update("messages/k2", map(json!({ "text": "edited" })));
    provider.delete("k1");

    assert_eq!(
        ids(&events),
        vec![
            (ChildAdded, "k4".to_string()),
            (ChildChanged, "k2".to_string()),
            (ChildRemoved, "k1".to_string()),
        ]
    );
    assert_eq!(events.lock()[1].1.text, "edited");
}

#[tokio::test]
async fn removal_delivers_default_entity_with_id() {
    let tree = seeded();
    let provider = messages(&tree);
    let (handler, events) = recorder();

    provider.observe(handler).unwrap();
    events.lock().clear();
    provider.delete("k2");

    let events = events.lock();
    assert_eq!(events.len(), 1);
    let (kind, removed) = &events[0];
    assert_eq!(*kind, ChildRemoved);
    assert_eq!(removed, &Message {
        id: "k2".to_string(),
        ..Default::default()
    });
}

#[tokio::test]
async fn observing_again_replaces_the_subscription() {
    let tree = seeded();
    let provider = messages(&tree);
    let (first, first_events) = recorder();
    let (second, second_events) = recorder();

    provider.observe(first).unwrap();
    provider.observe(second).unwrap();
    assert_eq!(tree.listener_count(), 1);

    first_events.lock().clear();
    second_events.lock().clear();
    provider.create(&mut Message::new("k4", "dee", "hi")).unwrap();

    assert!(first_events.lock().is_empty());
    assert_eq!(ids(&second_events), vec![(ChildAdded, "k4".to_string())]);
}

#[tokio::test]
async fn cancel_stops_delivery_and_is_idempotent() {
    let tree = seeded();
    let provider = messages(&tree);
    let (handler, events) = recorder();

    provider.observe(handler).unwrap();
    provider.cancel_observation();
    provider.cancel_observation();

    assert!(!provider.has_observation());
    assert_eq!(tree.listener_count(), 0);

    events.lock().clear();
    provider.create(&mut Message::new("k4", "dee", "hi")).unwrap();
    assert!(events.lock().is_empty());
}

#[tokio::test]
async fn cancel_without_observation_is_a_no_op() {
    let provider = messages(&seeded());
    provider.cancel_observation();
    assert!(!provider.has_observation());
}

#[tokio::test]
async fn handler_may_cancel_its_own_observation() {
    let tree = seeded();
    let provider = Arc::new(messages(&tree));
    let (record, events) = recorder();

    let inner = provider.clone();
    provider
        .observe_after_id(
            "k3",
            Box::new(move |kind, message| {
                record(kind, message);
                inner.cancel_observation();
            }),
        )
        .unwrap();

    provider.create(&mut Message::new("k4", "dee", "hi")).unwrap();
    provider.create(&mut Message::new("k5", "eve", "hi")).unwrap();

    assert_eq!(ids(&events), vec![(ChildAdded, "k4".to_string())]);
    assert!(!provider.has_observation());
    assert_eq!(tree.listener_count(), 0);
}

#[tokio::test]
async fn cancel_during_replay_detaches_the_listener() {
    let tree = seeded();
    let provider = Arc::new(messages(&tree));
    let (record, events) = recorder();

    let inner = provider.clone();
    provider
        .observe(Box::new(move |kind, message| {
            record(kind, message);
            inner.cancel_observation();
        }))
        .unwrap();

    assert_eq!(ids(&events), vec![(ChildAdded, "k1".to_string())]);
    assert!(!provider.has_observation());
    assert_eq!(tree.listener_count(), 0);
}

#[tokio::test]
async fn observe_after_id_skips_the_boundary_added() {
    let tree = seeded();
    let provider = messages(&tree);
    let (handler, events) = recorder();

    provider.observe_after_id("k2", handler).unwrap();
    assert_eq!(ids(&events), vec![(ChildAdded, "k3".to_string())]);

    events.lock().clear();
    provider.create(&mut Message::new("k4", "dee", "hi")).unwrap();
    provider.create(&mut Message::new("k0", "old", "before")).unwrap();
    assert_eq!(ids(&events), vec![(ChildAdded, "k4".to_string())]);
}

#[tokio::test]
async fn observe_after_id_still_reports_boundary_changes() {
    let tree = seeded();
    let provider = messages(&tree);
    let (handler, events) = recorder();

    provider.observe_after_id("k2", handler).unwrap();
    events.lock().clear();
    tree.update("messages/k2", map(json!({ "text": "edited" })));

    assert_eq!(ids(&events), vec![(ChildChanged, "k2".to_string())]);
}

#[tokio::test]
async fn observe_after_empty_id_observes_everything() {
    let provider = messages(&seeded());
    let (handler, events) = recorder();

    provider.observe_after_id("", handler).unwrap();
    assert_eq!(events.lock().len(), 3);
}

#[tokio::test]
async fn undecodable_child_does_not_end_the_observation() {
    let tree = seeded();
    let provider = messages(&tree);
    let (handler, events) = recorder();

    provider.observe(handler).unwrap();
    events.lock().clear();

    tree.update("messages", map(json!({ "k8": "junk" })));
    tree.update("messages", map(json!({ "k9": { "text": "fine" } })));

    assert_eq!(ids(&events), vec![(ChildAdded, "k9".to_string())]);
    assert!(provider.has_observation());
}

#[tokio::test]
async fn listen_failure_leaves_no_observation() {
    let store = Arc::new(ScriptedStore {
        listen_error: Some("offline".to_string()),
        ..Default::default()
    });
    let provider: TreeDataProvider<Message> = TreeDataProvider::new(store, "messages");

    let err = provider.observe(Box::new(|_, _| {})).unwrap_err();
    assert!(matches!(err, ProviderError::Store(StoreError::ListenerClosed(_))));
    assert!(!provider.has_observation());
}

#[tokio::test]
async fn dropping_the_provider_detaches_its_listener() {
    let store = Arc::new(ScriptedStore::default());
    let provider: TreeDataProvider<Message> = TreeDataProvider::new(store.clone(), "messages");

    provider.observe(Box::new(|_, _| {})).unwrap();
    assert!(store.unlistened.lock().is_empty());
    drop(provider);

    assert_eq!(store.unlistened.lock().len(), 1);
}

#[tokio::test]
#[should_panic(expected = "reordered")]
async fn moved_child_is_a_contract_violation() {
    let store = Arc::new(ScriptedStore {
        replay: vec![ChildChange::Moved {
            key: "k1".to_string(),
            value: json!({ "name": "ada" }),
            prev_key: None,
        }],
        ..Default::default()
    });
    let provider: TreeDataProvider<Message> = TreeDataProvider::new(store, "messages");
    let _ = provider.observe(Box::new(|_, _| {}));
}

#[tokio::test]
async fn provider_works_through_a_trait_object() {
    let tree = seeded();
    let provider: Arc<dyn DataProvider<Message>> = Arc::new(messages(&tree));

    assert_eq!(provider.path(), "messages");
    assert_eq!(provider.read_all().await.unwrap().len(), 3);
    assert_eq!(tree.backend_name(), "memory");
}
