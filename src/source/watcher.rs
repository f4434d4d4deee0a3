//! Tree watcher: consumes the raw backend event stream on a single worker,
//! drives the session state machine, opens the initialization gate and
//! turns qualifying node events into listener notifications.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use crate::constants::NOTIFY_PATH_DEPTH;
use crate::InitGate;
use crate::ListenerRegistry;
use crate::TreeEvent;
use crate::TreeEventKind;
use crate::UpdateEvent;
use crate::UpdateResult;
use crate::WatchError;
use crate::path_to_key;

/// Session lifecycle of the watch. `Ready` is the steady operating state,
/// not a terminal one: live updates keep flowing while in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Disconnected,
    Connecting,
    Syncing,
    Ready,
}

pub(crate) struct TreeWatcher {
    watch_root: String,
    gate: Arc<InitGate>,
    listeners: Arc<ListenerRegistry>,
    state_tx: watch::Sender<WatchState>,
}

impl TreeWatcher {
    pub(crate) fn new(
        watch_root: String,
        gate: Arc<InitGate>,
        listeners: Arc<ListenerRegistry>,
    ) -> (Arc<Self>, watch::Receiver<WatchState>) {
        let (state_tx, state_rx) = watch::channel(WatchState::Disconnected);
        (
            Arc::new(Self {
                watch_root,
                gate,
                listeners,
                state_tx,
            }),
            state_rx,
        )
    }

    pub(crate) fn state(&self) -> WatchState {
        *self.state_tx.borrow()
    }

    pub(crate) fn transition(&self, next: WatchState) {
        let prev = *self.state_tx.borrow();
        if prev != next {
            debug!(from = ?prev, to = ?next, "watch state transition");
            self.state_tx.send_replace(next);
        }
    }

    /// Spawns the single event worker over `rx`. All classification and
    /// listener dispatch happens on this one task, so listeners observe
    /// events in exactly the order the backend emitted them.
    pub(crate) fn spawn_worker(
        self: &Arc<Self>,
        rx: mpsc::Receiver<TreeEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let watcher = Arc::clone(self);
        tokio::spawn(async move { watcher.run(rx, cancel).await })
    }

    async fn run(&self, mut rx: mpsc::Receiver<TreeEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(root = %self.watch_root, "watch worker cancelled");
                    return;
                }
                maybe_event = rx.recv() => {
                    match maybe_event {
                        Some(event) => self.process(event),
                        None => {
                            warn!(root = %self.watch_root, "backend event stream closed");
                            self.transition(WatchState::Disconnected);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Handles one raw backend event: session-lifecycle kinds drive the
    /// state machine, node kinds go through classification and dispatch.
    pub(crate) fn process(&self, event: TreeEvent) {
        match event.kind {
            TreeEventKind::InitialSyncComplete => {
                self.transition(WatchState::Ready);
                self.gate.open();
            }
            TreeEventKind::SessionLost => {
                self.transition(WatchState::Connecting);
            }
            TreeEventKind::SessionRestored => {
                if self.gate.is_open() {
                    self.transition(WatchState::Ready);
                } else {
                    self.transition(WatchState::Syncing);
                }
            }
            TreeEventKind::Other => {
                trace!(path = %event.path, "ignoring unrecognized backend event");
            }
            TreeEventKind::Added | TreeEventKind::Changed | TreeEventKind::Removed => {
                if let Some(result) = self.classify(event) {
                    self.listeners.dispatch(&result);
                }
            }
        }
    }

    /// Depth-filters, decodes and key-maps a node event. Notifications are
    /// limited to one specific path level; changes above or below it stay
    /// visible through snapshot reads but never reach the listener stream.
    fn classify(&self, event: TreeEvent) -> Option<UpdateResult> {
        if path_depth(&event.path) != NOTIFY_PATH_DEPTH {
            trace!(
                path = %event.path,
                kind = event.kind.as_str(),
                "event outside the notification level; dropped"
            );
            return None;
        }

        let payload = event.payload.unwrap_or_default();
        let value = match String::from_utf8(payload) {
            Ok(value) => value,
            Err(source) => {
                let e = WatchError::InvalidPayload {
                    path: event.path.clone(),
                    kind: event.kind.as_str(),
                    source,
                };
                error!(error = %e, "dropping undecodable event");
                return None;
            }
        };

        let key = path_to_key(&event.path, &self.watch_root);
        let update = match event.kind {
            TreeEventKind::Added => UpdateEvent::Added { key, value },
            TreeEventKind::Changed => UpdateEvent::Changed { key, value },
            TreeEventKind::Removed => UpdateEvent::Removed { key, value },
            _ => return None,
        };
        Some(update.into_result())
    }
}

/// Number of `/`-delimited segments, counted over the whole path (the
/// leading empty segment of an absolute path included).
fn path_depth(path: &str) -> usize {
    path.split('/').count()
}
