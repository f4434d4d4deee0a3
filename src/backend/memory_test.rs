use super::*;
use crate::test_utils::seeded_backend;

#[tokio::test]
async fn subscribe_replays_existing_nodes_then_signals_sync() {
    let backend = seeded_backend(&[
        ("/dubbo/config/service/configurators", "a"),
        ("/dubbo/config/service/routers", "b"),
    ]);

    let mut rx = backend.subscribe("/dubbo/config").await.unwrap();

    let first = rx.recv().await.unwrap();
    assert_eq!(first.kind, TreeEventKind::Added);
    assert_eq!(first.path, "/dubbo/config/service/configurators");

    let second = rx.recv().await.unwrap();
    assert_eq!(second.kind, TreeEventKind::Added);
    assert_eq!(second.path, "/dubbo/config/service/routers");

    let sync = rx.recv().await.unwrap();
    assert_eq!(sync.kind, TreeEventKind::InitialSyncComplete);
}

#[tokio::test]
async fn insert_emits_added_then_changed() {
    let backend = MemoryTreeBackend::new();
    let mut rx = backend.subscribe("/root").await.unwrap();
    assert_eq!(rx.recv().await.unwrap().kind, TreeEventKind::InitialSyncComplete);

    backend.insert("/root/a/b", b"1");
    let added = rx.recv().await.unwrap();
    assert_eq!(added.kind, TreeEventKind::Added);
    assert_eq!(added.payload.as_deref(), Some(b"1".as_ref()));

    backend.insert("/root/a/b", b"2");
    let changed = rx.recv().await.unwrap();
    assert_eq!(changed.kind, TreeEventKind::Changed);
    assert_eq!(changed.payload.as_deref(), Some(b"2".as_ref()));
}

#[tokio::test]
async fn remove_carries_the_last_known_payload() {
    let backend = MemoryTreeBackend::new();
    backend.insert("/root/a/b", b"v");

    let mut rx = backend.subscribe("/root").await.unwrap();
    // Drain the replay.
    rx.recv().await.unwrap();
    rx.recv().await.unwrap();

    backend.remove("/root/a/b");
    let removed = rx.recv().await.unwrap();
    assert_eq!(removed.kind, TreeEventKind::Removed);
    assert_eq!(removed.payload.as_deref(), Some(b"v".as_ref()));
}

#[tokio::test]
async fn node_events_only_reach_covering_subscriptions() {
    let backend = MemoryTreeBackend::new();
    let mut covered = backend.subscribe("/app").await.unwrap();
    let mut other = backend.subscribe("/elsewhere").await.unwrap();
    assert_eq!(covered.recv().await.unwrap().kind, TreeEventKind::InitialSyncComplete);
    assert_eq!(other.recv().await.unwrap().kind, TreeEventKind::InitialSyncComplete);

    backend.insert("/app/x/y", b"v");
    assert_eq!(covered.recv().await.unwrap().kind, TreeEventKind::Added);
    assert!(other.try_recv().is_err());

    // Session events fan out everywhere.
    backend.emit(TreeEvent {
        kind: TreeEventKind::SessionLost,
        path: String::new(),
        payload: None,
    });
    assert_eq!(covered.recv().await.unwrap().kind, TreeEventKind::SessionLost);
    assert_eq!(other.recv().await.unwrap().kind, TreeEventKind::SessionLost);
}

#[tokio::test]
async fn children_lists_direct_leaves_and_synthesized_interiors() {
    let backend = seeded_backend(&[
        ("/dubbo/config/service/configurators", "c"),
        ("/dubbo/config/service/routers", "r"),
        ("/dubbo/config/flat", "f"),
    ]);

    let top = backend.children("/dubbo/config").await;
    assert_eq!(top.len(), 2);
    assert_eq!(top["flat"].data, b"f".to_vec());
    // Interior node synthesized from the deeper leaves.
    assert_eq!(top["service"].path, "/dubbo/config/service");
    assert!(top["service"].data.is_empty());

    let nested = backend.children("/dubbo/config/service").await;
    assert_eq!(nested.len(), 2);
    assert_eq!(nested["configurators"].data, b"c".to_vec());
    assert_eq!(nested["routers"].data, b"r".to_vec());
}

#[tokio::test]
async fn children_of_unknown_path_is_empty() {
    let backend = MemoryTreeBackend::new();
    assert!(backend.children("/nope").await.is_empty());
}

#[tokio::test]
async fn close_drops_subscriptions_and_counts() {
    let backend = MemoryTreeBackend::new();
    let mut rx = backend.subscribe("/root").await.unwrap();
    rx.recv().await.unwrap();

    backend.close().await.unwrap();
    assert_eq!(backend.close_calls(), 1);
    assert!(rx.recv().await.is_none());

    backend.close().await.unwrap();
    assert_eq!(backend.close_calls(), 2);
}
