//! Precedence-ordered lookup over a stack of namespaces, with classified
//! change fan-out.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::trace;
use tracing::warn;

use crate::CategoryRules;
use crate::ConfigChangeEvent;
use crate::Namespace;

/// Typed change subscriber. One registration is attached to every
/// namespace in the overlay.
pub trait ConfigChangeListener: Send + Sync + 'static {
    fn process(&self, event: ConfigChangeEvent);
}

/// Resolves logical keys across an ordered list of named namespaces:
/// the first namespace containing the key wins.
///
/// Change-listener registration fans out to every namespace's raw change
/// stream; each raw change is classified by key suffix and re-emitted as a
/// [`ConfigChangeEvent`], with unmatched keys dropped.
pub struct OverlayResolver {
    namespaces: Vec<Arc<dyn Namespace>>,
    rules: CategoryRules,
    forwarders: Mutex<Vec<JoinHandle<()>>>,
}

impl OverlayResolver {
    pub fn new(namespaces: Vec<Arc<dyn Namespace>>, rules: CategoryRules) -> Self {
        Self {
            namespaces,
            rules,
            forwarders: Mutex::new(Vec::new()),
        }
    }

    /// First-match-wins lookup in namespace order.
    pub fn resolve(&self, key: &str) -> Option<String> {
        for namespace in &self.namespaces {
            if let Some(value) = namespace.get(key) {
                trace!(namespace = namespace.name(), key, "resolved key");
                return Some(value);
            }
        }
        None
    }

    /// Attaches `listener` to the change stream of every namespace.
    ///
    /// Must be called within a tokio runtime: one forwarding task is
    /// spawned per namespace. A namespace stream that lags is logged and
    /// skipped over, never torn down.
    pub fn add_change_listener(&self, listener: Arc<dyn ConfigChangeListener>) {
        let mut forwarders = self.forwarders.lock();
        for namespace in &self.namespaces {
            let mut rx = namespace.subscribe();
            let rules = self.rules.clone();
            let listener = listener.clone();
            let name = namespace.name().to_string();

            forwarders.push(tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(change) => {
                            let category = match rules.classify(&change.key) {
                                Some(category) => category,
                                None => continue,
                            };
                            let kind = change.kind();
                            listener.process(ConfigChangeEvent {
                                key: change.key,
                                new_value: change.new_value,
                                category,
                                kind,
                            });
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(namespace = %name, skipped, "change stream lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }));
        }
    }

    /// Stops every forwarding task. Also runs on drop.
    pub fn shutdown(&self) {
        for handle in self.forwarders.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Drop for OverlayResolver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
