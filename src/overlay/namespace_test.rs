use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use super::*;
use crate::test_utils::enable_logger;
use crate::test_utils::seeded_backend;
use crate::test_utils::test_config;
use crate::WatchedConfigSource;

#[tokio::test]
async fn map_namespace_serves_and_streams_changes() {
    let namespace = MapNamespace::new("app", HashMap::new());
    let mut rx = namespace.subscribe();

    namespace.put("k", "v");
    assert_eq!(namespace.get("k"), Some("v".to_string()));

    let change = rx.recv().await.unwrap();
    assert_eq!(change.key, "k");
    assert_eq!(change.new_value.as_deref(), Some("v"));
    assert!(!change.deleted);

    namespace.delete("k");
    assert_eq!(namespace.get("k"), None);
    let change = rx.recv().await.unwrap();
    assert!(change.deleted);

    // Deleting an unknown key emits nothing.
    namespace.delete("k");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn source_namespace_mirrors_the_watched_subtree() {
    enable_logger();
    let backend = seeded_backend(&[("/dubbo/config/service/routers", "seeded")]);
    let source = WatchedConfigSource::new(backend.clone(), test_config())
        .await
        .unwrap();
    source.start().await.unwrap();

    let namespace = SourceNamespace::attach("dubbo", &source).await;
    assert_eq!(namespace.name(), "dubbo");
    assert_eq!(namespace.get("service.routers"), Some("seeded".to_string()));

    let mut rx = namespace.subscribe();

    backend.insert("/dubbo/config/service/configurators", b"live");
    let change = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert_eq!(change.key, "service.configurators");
    assert_eq!(change.new_value.as_deref(), Some("live"));
    assert_eq!(namespace.get("service.configurators"), Some("live".to_string()));

    backend.remove("/dubbo/config/service/configurators");
    let change = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert!(change.deleted);
    assert_eq!(namespace.get("service.configurators"), None);
}

#[tokio::test]
async fn source_namespace_layers_under_an_app_namespace() {
    enable_logger();
    let backend = seeded_backend(&[("/dubbo/config/service/timeout", "5000")]);
    let source = WatchedConfigSource::new(backend, test_config()).await.unwrap();
    source.start().await.unwrap();

    let app = Arc::new(MapNamespace::new(
        "app",
        HashMap::from([("service.timeout".to_string(), "1000".to_string())]),
    ));
    let dubbo = Arc::new(SourceNamespace::attach("dubbo", &source).await);

    let resolver = OverlayResolver::new(
        vec![app.clone() as Arc<dyn Namespace>, dubbo as Arc<dyn Namespace>],
        CategoryRules::default(),
    );

    // The app layer shadows the watched source.
    assert_eq!(resolver.resolve("service.timeout"), Some("1000".to_string()));

    app.delete("service.timeout");
    assert_eq!(resolver.resolve("service.timeout"), Some("5000".to_string()));
}
