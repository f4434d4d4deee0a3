//! End-to-end lifecycle tests against the public API, driven by the
//! in-memory backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::timeout;

use conf_mirror::CategoryRules;
use conf_mirror::ChangeCategory;
use conf_mirror::ChangeKind;
use conf_mirror::ConfigChangeEvent;
use conf_mirror::ConfigChangeListener;
use conf_mirror::MapNamespace;
use conf_mirror::MemoryTreeBackend;
use conf_mirror::Namespace;
use conf_mirror::OverlayResolver;
use conf_mirror::Result;
use conf_mirror::SourceConfig;
use conf_mirror::SourceNamespace;
use conf_mirror::UpdateListener;
use conf_mirror::UpdateResult;
use conf_mirror::WatchState;
use conf_mirror::WatchedConfigSource;

struct CollectingListener {
    tx: mpsc::UnboundedSender<UpdateResult>,
}

impl UpdateListener for CollectingListener {
    fn on_update(&self, update: &UpdateResult) -> Result<()> {
        let _ = self.tx.send(update.clone());
        Ok(())
    }
}

fn config() -> SourceConfig {
    SourceConfig {
        address: "127.0.0.1:2181".to_string(),
        root_path: "/dubbo/config".to_string(),
        ..SourceConfig::default()
    }
}

#[tokio::test]
async fn full_lifecycle_snapshot_watch_and_teardown() {
    let backend = Arc::new(MemoryTreeBackend::new());
    backend.insert("/dubbo/config/shop/configurators", b"weight=3");

    let source = WatchedConfigSource::new(backend.clone(), config())
        .await
        .expect("construction should succeed");
    source.start().await.expect("start should succeed");

    // Gated snapshot covers the seeded state.
    let snapshot = source.get_current_data().await;
    assert_eq!(snapshot["shop.configurators"], "weight=3");
    assert_eq!(source.state(), WatchState::Ready);

    // Live mutations stream to the listener in order.
    let (tx, mut rx) = mpsc::unbounded_channel();
    source.add_update_listener(Arc::new(CollectingListener { tx }));

    backend.insert("/dubbo/config/shop/routers", b"rule-a");
    backend.insert("/dubbo/config/shop/routers", b"rule-b");

    let added = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert_eq!(added.added.unwrap()["shop.routers"], "rule-a");
    let changed = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert_eq!(changed.changed.unwrap()["shop.routers"], "rule-b");

    // Snapshot reads see the advanced tree as well.
    let snapshot = source.get_current_data().await;
    assert_eq!(snapshot.len(), 2);

    source.close().await;
    assert_eq!(backend.close_calls(), 1);
}

#[tokio::test]
async fn depth_restricted_notifications_with_unrestricted_snapshots() {
    let backend = Arc::new(MemoryTreeBackend::new());
    let source = WatchedConfigSource::new(backend.clone(), config())
        .await
        .unwrap();
    source.start().await.unwrap();
    source.get_current_data().await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    source.add_update_listener(Arc::new(CollectingListener { tx }));

    // One segment above the notification level.
    backend.insert("/dubbo/config/shallow", b"quiet");
    // At the notification level.
    backend.insert("/dubbo/config/shop/routers", b"loud");

    let update = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert_eq!(update.added.unwrap()["shop.routers"], "loud");
    assert!(rx.try_recv().is_err());

    // Snapshot reads are re-reads of backend state, independent of the
    // notification filter.
    let snapshot = source.get_current_data().await;
    assert_eq!(snapshot["shop.routers"], "loud");

    source.close().await;
}

struct TypedChanges {
    tx: mpsc::UnboundedSender<ConfigChangeEvent>,
    all: Mutex<Vec<ConfigChangeEvent>>,
}

impl ConfigChangeListener for TypedChanges {
    fn process(&self, event: ConfigChangeEvent) {
        self.all.lock().push(event.clone());
        let _ = self.tx.send(event);
    }
}

#[tokio::test]
async fn overlay_stacks_an_app_layer_over_the_watched_source() {
    let backend = Arc::new(MemoryTreeBackend::new());
    backend.insert("/dubbo/config/shop/timeout", b"5000");

    let source = WatchedConfigSource::new(backend.clone(), config())
        .await
        .unwrap();
    source.start().await.unwrap();

    let app = Arc::new(MapNamespace::new(
        "app",
        HashMap::from([("shop.timeout".to_string(), "1000".to_string())]),
    ));
    let dubbo = Arc::new(SourceNamespace::attach("dubbo", &source).await);
    let resolver = OverlayResolver::new(
        vec![app.clone() as Arc<dyn Namespace>, dubbo as Arc<dyn Namespace>],
        CategoryRules::default(),
    );

    assert_eq!(resolver.resolve("shop.timeout"), Some("1000".to_string()));
    app.delete("shop.timeout");
    assert_eq!(resolver.resolve("shop.timeout"), Some("5000".to_string()));

    // Typed change events from the watched layer.
    let (tx, mut rx) = mpsc::unbounded_channel();
    resolver.add_change_listener(Arc::new(TypedChanges {
        tx,
        all: Mutex::new(Vec::new()),
    }));

    backend.insert("/dubbo/config/shop/routers", b"rule");
    let event = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.category, ChangeCategory::Routers);
    assert_eq!(event.kind, ChangeKind::Modified);
    assert_eq!(event.key, "shop.routers");

    backend.remove("/dubbo/config/shop/routers");
    let event = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.kind, ChangeKind::Deleted);

    source.close().await;
}
