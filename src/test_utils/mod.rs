//! Shared helpers between the unit tests: log setup, canned listeners and
//! pre-seeded in-memory backends.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::ListenerError;
use crate::MemoryTreeBackend;
use crate::Result;
use crate::SourceConfig;
use crate::UpdateListener;
use crate::UpdateResult;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
}

/// Listener that records every received update and forwards it into an
/// unbounded channel so async tests can await deliveries.
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<UpdateResult>,
    received: Mutex<Vec<UpdateResult>>,
}

impl ChannelListener {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<UpdateResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                tx,
                received: Mutex::new(Vec::new()),
            }),
            rx,
        )
    }

    pub fn received(&self) -> Vec<UpdateResult> {
        self.received.lock().clone()
    }
}

impl UpdateListener for ChannelListener {
    fn on_update(&self, update: &UpdateResult) -> Result<()> {
        self.received.lock().push(update.clone());
        let _ = self.tx.send(update.clone());
        Ok(())
    }
}

/// Listener that fails on every delivery.
pub struct FailingListener;

impl UpdateListener for FailingListener {
    fn on_update(&self, _update: &UpdateResult) -> Result<()> {
        Err(ListenerError("injected failure".to_string()).into())
    }
}

/// Listener that panics on every delivery.
pub struct PanickingListener;

impl UpdateListener for PanickingListener {
    fn on_update(&self, _update: &UpdateResult) -> Result<()> {
        panic!("injected panic");
    }
}

/// An in-memory backend pre-populated with the given `(path, value)` leaves.
pub fn seeded_backend(entries: &[(&str, &str)]) -> Arc<MemoryTreeBackend> {
    let backend = Arc::new(MemoryTreeBackend::new());
    for (path, value) in entries {
        backend.insert(path, value.as_bytes());
    }
    backend
}

/// Config pointing at a throwaway address with the standard test root.
pub fn test_config() -> SourceConfig {
    SourceConfig {
        address: "127.0.0.1:2181".to_string(),
        root_path: "/dubbo/config".to_string(),
        ..SourceConfig::default()
    }
}
