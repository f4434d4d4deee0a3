//! Public surface of the watched configuration source.
//!
//! Construction performs the connect handshake against the injected
//! [`TreeClient`]; `start()` subscribes the watch and spawns the single
//! event worker; `get_current_data()` serves gated snapshot reads;
//! `close()` tears everything down exactly once.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::warn;

use super::read_snapshot;
use super::TreeWatcher;
use crate::ConnectError;
use crate::GateWait;
use crate::InitGate;
use crate::ListenerRegistry;
use crate::Result;
use crate::Snapshot;
use crate::SourceConfig;
use crate::TreeClient;
use crate::UpdateListener;
use crate::WatchError;
use crate::WatchState;

/// A watched configuration source over a remote hierarchical store.
///
/// Mirrors the subtree at the configured watch root, streams incremental
/// [`crate::UpdateResult`]s to registered listeners and serves full
/// flattened snapshots on demand. All listener notification happens on one
/// worker task, in backend order.
pub struct WatchedConfigSource {
    client: Arc<dyn TreeClient>,
    config: SourceConfig,
    watch_root: String,
    gate: Arc<InitGate>,
    listeners: Arc<ListenerRegistry>,
    watcher: Arc<TreeWatcher>,
    state_rx: watch::Receiver<WatchState>,
    cancel: CancellationToken,
    started: AtomicBool,
    closed: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WatchedConfigSource {
    /// Validates `config`, then runs the connect handshake against
    /// `client`.
    ///
    /// A backend that cannot be reached within the client's connect timeout
    /// is fatal under [`SourceConfig::strict_connect`]; otherwise it is
    /// logged and the source proceeds disconnected, relying on the client's
    /// own reconnection.
    ///
    /// # Errors
    /// - [`crate::Error::Config`] on invalid configuration
    /// - [`crate::Error::Connect`] on strict-mode connect failure, or when
    ///   the connection attempt aborts before an outcome is known
    pub async fn new(client: Arc<dyn TreeClient>, config: SourceConfig) -> Result<Self> {
        let source = Self::assemble(client, config)?;

        source.watcher.transition(WatchState::Connecting);
        match source.client.connect().await {
            Ok(true) => {}
            Ok(false) => {
                if source.config.strict_connect {
                    return Err(ConnectError::Unreachable {
                        address: source.config.address.clone(),
                        timeout_ms: source.config.connect_timeout_ms,
                    }
                    .into());
                }
                warn!(
                    address = %source.config.address,
                    timeout_ms = source.config.connect_timeout_ms,
                    "cannot connect to config backend; proceeding disconnected"
                );
                source.watcher.transition(WatchState::Disconnected);
            }
            Err(e) => return Err(e),
        }

        Ok(source)
    }

    /// Builds a source over a client whose session is already established,
    /// skipping the connect handshake.
    pub fn with_client(client: Arc<dyn TreeClient>, config: SourceConfig) -> Result<Self> {
        Self::assemble(client, config)
    }

    fn assemble(client: Arc<dyn TreeClient>, config: SourceConfig) -> Result<Self> {
        config.validate()?;
        let watch_root = config.watch_root();
        let gate = Arc::new(InitGate::new());
        let listeners = Arc::new(ListenerRegistry::new());
        let (watcher, state_rx) =
            TreeWatcher::new(watch_root.clone(), gate.clone(), listeners.clone());

        Ok(Self {
            client,
            config,
            watch_root,
            gate,
            listeners,
            watcher,
            state_rx,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            worker: Mutex::new(None),
        })
    }

    /// Subscribes the backend watch and spawns the event worker. The
    /// backend replays its current tree first, so the initialization gate
    /// opens once that replay finishes.
    ///
    /// # Errors
    /// [`crate::WatchError::AlreadyStarted`] on a second call.
    pub async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(WatchError::AlreadyStarted.into());
        }

        let rx = self.client.subscribe(&self.watch_root).await?;
        self.watcher.transition(WatchState::Syncing);
        let handle = self.watcher.spawn_worker(rx, self.cancel.clone());
        *self.worker.lock() = Some(handle);
        debug!(root = %self.watch_root, "backend watch started");
        Ok(())
    }

    /// Full flattened view of the watched subtree.
    ///
    /// Blocks the caller (never the event worker) until the initial sync
    /// has completed. If the gate is torn down first (the source was
    /// closed mid-wait), the call logs and degrades to a best-effort read
    /// of whatever state the client still holds, rather than failing.
    pub async fn get_current_data(&self) -> Snapshot {
        debug!("retrieving current configuration data");

        if self.gate.wait().await == GateWait::Abandoned {
            error!(
                "interrupted while waiting for the initial backend sync; \
                 the config data may not be ready yet"
            );
        }

        let snapshot = read_snapshot(self.client.as_ref(), &self.watch_root).await;
        debug!(elements = snapshot.len(), "assembled configuration snapshot");
        snapshot
    }

    /// Parks the caller until the initial sync completes (or the source is
    /// torn down first).
    pub async fn wait_until_initialized(&self) -> GateWait {
        self.gate.wait().await
    }

    pub fn add_update_listener(&self, listener: Arc<dyn UpdateListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_update_listener(&self, listener: &Arc<dyn UpdateListener>) {
        self.listeners.remove(listener);
    }

    /// Current session state of the watch.
    pub fn state(&self) -> WatchState {
        *self.state_rx.borrow()
    }

    /// Stops the event worker and releases the backend watch resource.
    ///
    /// Idempotent; only the first call releases the client. Release errors
    /// are swallowed and logged. Pending snapshot readers are unparked with
    /// a best-effort result. After close, `get_current_data` is not
    /// guaranteed to succeed.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.cancel.cancel();
        self.gate.abandon();

        if let Err(e) = self.client.close().await {
            error!(error = %e, "error releasing the backend watch; ignored");
        }

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "watch worker did not shut down cleanly");
            }
        }

        self.watcher.transition(WatchState::Disconnected);
        debug!(root = %self.watch_root, "watched config source closed");
    }
}
