//! Named configuration namespaces: the unit the overlay resolver stacks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::NamespaceChange;
use crate::Result;
use crate::UpdateListener;
use crate::UpdateResult;
use crate::WatchedConfigSource;

const CHANGE_BUFFER: usize = 256;

/// One named key/value namespace in an overlay stack.
pub trait Namespace: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Current value of `key` in this namespace, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Raw change stream of this namespace.
    fn subscribe(&self) -> broadcast::Receiver<NamespaceChange>;
}

/// Static in-memory namespace, useful as a fixed overlay layer and in
/// tests.
pub struct MapNamespace {
    name: String,
    entries: RwLock<HashMap<String, String>>,
    changes: broadcast::Sender<NamespaceChange>,
}

impl MapNamespace {
    pub fn new(name: impl Into<String>, entries: HashMap<String, String>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            name: name.into(),
            entries: RwLock::new(entries),
            changes,
        }
    }

    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        self.entries.write().insert(key.clone(), value.clone());
        let _ = self.changes.send(NamespaceChange {
            key,
            new_value: Some(value),
            deleted: false,
        });
    }

    pub fn delete(&self, key: &str) {
        if self.entries.write().remove(key).is_some() {
            let _ = self.changes.send(NamespaceChange {
                key: key.to_string(),
                new_value: None,
                deleted: true,
            });
        }
    }
}

impl Namespace for MapNamespace {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn subscribe(&self) -> broadcast::Receiver<NamespaceChange> {
        self.changes.subscribe()
    }
}

/// Adapter exposing a [`WatchedConfigSource`] as an overlay namespace.
///
/// Seeds a local key/value mirror from a snapshot read (waiting on the
/// source's initialization gate), then keeps it current through an update
/// listener, re-broadcasting every entry as a raw namespace change.
pub struct SourceNamespace {
    name: String,
    mirror: Arc<RwLock<HashMap<String, String>>>,
    changes: broadcast::Sender<NamespaceChange>,
    // Keeps the registered listener handle alive for the adapter lifetime.
    _listener: Arc<MirrorListener>,
}

impl SourceNamespace {
    pub async fn attach(name: impl Into<String>, source: &WatchedConfigSource) -> Self {
        let seed = source.get_current_data().await;
        let mirror = Arc::new(RwLock::new(seed));
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);

        let listener = Arc::new(MirrorListener {
            mirror: mirror.clone(),
            changes: changes.clone(),
        });
        source.add_update_listener(listener.clone());

        Self {
            name: name.into(),
            mirror,
            changes,
            _listener: listener,
        }
    }
}

impl Namespace for SourceNamespace {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<String> {
        self.mirror.read().get(key).cloned()
    }

    fn subscribe(&self) -> broadcast::Receiver<NamespaceChange> {
        self.changes.subscribe()
    }
}

struct MirrorListener {
    mirror: Arc<RwLock<HashMap<String, String>>>,
    changes: broadcast::Sender<NamespaceChange>,
}

impl UpdateListener for MirrorListener {
    fn on_update(&self, update: &UpdateResult) -> Result<()> {
        let mut mirror = self.mirror.write();

        for map in [&update.added, &update.changed].into_iter().flatten() {
            for (key, value) in map {
                mirror.insert(key.clone(), value.clone());
                let _ = self.changes.send(NamespaceChange {
                    key: key.clone(),
                    new_value: Some(value.clone()),
                    deleted: false,
                });
            }
        }

        if let Some(deleted) = &update.deleted {
            for key in deleted.keys() {
                mirror.remove(key);
                let _ = self.changes.send(NamespaceChange {
                    key: key.clone(),
                    new_value: None,
                    deleted: true,
                });
            }
        }

        Ok(())
    }
}
