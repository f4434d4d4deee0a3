//! In-memory [`TreeClient`] used for embedded setups and tests.
//!
//! Leaves are stored in a concurrent path-keyed table; interior nodes are
//! implied by leaf paths and synthesized on `children` reads. Every
//! mutation is fanned out to live subscriptions.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::constants::SUBSCRIPTION_BUFFER;
use crate::Result;
use crate::TreeClient;
use crate::TreeEvent;
use crate::TreeEventKind;
use crate::TreeNode;

struct Subscription {
    root: String,
    tx: mpsc::Sender<TreeEvent>,
}

pub struct MemoryTreeBackend {
    nodes: DashMap<String, TreeNode>,
    subscriptions: Mutex<Vec<Subscription>>,
    connected: AtomicBool,
    close_calls: AtomicUsize,
}

impl MemoryTreeBackend {
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
            subscriptions: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// Creates or updates the leaf at `path`, notifying subscribers with an
    /// added or changed event accordingly.
    pub fn insert(&self, path: &str, value: impl AsRef<[u8]>) {
        let data = value.as_ref().to_vec();
        let mut kind = TreeEventKind::Added;
        self.nodes
            .entry(path.to_string())
            .and_modify(|node| {
                node.data = data.clone();
                node.version += 1;
                kind = TreeEventKind::Changed;
            })
            .or_insert_with(|| TreeNode {
                path: path.to_string(),
                data: data.clone(),
                version: 0,
            });
        self.fan_out(TreeEvent {
            kind,
            path: path.to_string(),
            payload: Some(data),
        });
    }

    /// Deletes the leaf at `path`, notifying subscribers with a removed
    /// event carrying the last known payload. Unknown paths are a no-op.
    pub fn remove(&self, path: &str) {
        if let Some((_, node)) = self.nodes.remove(path) {
            self.fan_out(TreeEvent {
                kind: TreeEventKind::Removed,
                path: path.to_string(),
                payload: Some(node.data),
            });
        }
    }

    /// Injects a raw event into every matching subscription. Intended for
    /// session-lifecycle and unrecognized-kind scenarios.
    pub fn emit(&self, event: TreeEvent) {
        self.fan_out(event);
    }

    /// Controls the outcome of subsequent `connect` calls.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// How many times `close` has been called on this backend.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn fan_out(&self, event: TreeEvent) {
        let mut subscriptions = self.subscriptions.lock();
        subscriptions.retain(|sub| {
            if !event_matches(&sub.root, &event) {
                return true;
            }
            match sub.tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(root = %sub.root, "subscription buffer full; event dropped");
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            }
        });
    }
}

/// Session-lifecycle events reach every subscription; node events only the
/// subscriptions whose root covers the path.
fn event_matches(root: &str, event: &TreeEvent) -> bool {
    match event.kind {
        TreeEventKind::Added | TreeEventKind::Changed | TreeEventKind::Removed => {
            event.path == root || event.path.starts_with(&format!("{}/", root))
        }
        _ => true,
    }
}

impl Default for MemoryTreeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TreeClient for MemoryTreeBackend {
    async fn connect(&self) -> Result<bool> {
        Ok(self.connected.load(Ordering::SeqCst))
    }

    async fn subscribe(&self, path: &str) -> Result<mpsc::Receiver<TreeEvent>> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);

        // Replay the current state in path order, then signal sync.
        let mut existing: Vec<TreeNode> = self
            .nodes
            .iter()
            .filter(|entry| entry.key() == path || entry.key().starts_with(&format!("{}/", path)))
            .map(|entry| entry.value().clone())
            .collect();
        existing.sort_by(|a, b| a.path.cmp(&b.path));

        for node in existing {
            let event = TreeEvent {
                kind: TreeEventKind::Added,
                path: node.path.clone(),
                payload: Some(node.data),
            };
            if tx.try_send(event).is_err() {
                warn!(path = %path, "initial replay overflowed the subscription buffer");
                break;
            }
        }
        let _ = tx.try_send(TreeEvent {
            kind: TreeEventKind::InitialSyncComplete,
            path: path.to_string(),
            payload: None,
        });

        self.subscriptions.lock().push(Subscription {
            root: path.to_string(),
            tx,
        });
        Ok(rx)
    }

    async fn children(&self, path: &str) -> HashMap<String, TreeNode> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let mut out: HashMap<String, TreeNode> = HashMap::new();
        for entry in self.nodes.iter() {
            let rest = match entry.key().strip_prefix(&prefix) {
                Some(rest) if !rest.is_empty() => rest,
                _ => continue,
            };
            match rest.split_once('/') {
                // A stored leaf that is a direct child.
                None => {
                    out.insert(rest.to_string(), entry.value().clone());
                }
                // A deeper leaf implies an interior child node.
                Some((name, _)) => {
                    out.entry(name.to_string()).or_insert_with(|| TreeNode {
                        path: format!("{}{}", prefix, name),
                        data: Vec::new(),
                        version: 0,
                    });
                }
            }
        }
        out
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        self.subscriptions.lock().clear();
        Ok(())
    }
}
