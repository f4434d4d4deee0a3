//! Core seam to the remote hierarchical store.
//!
//! Everything connection-shaped lives behind [`TreeClient`]: session
//! management, reconnection, backoff and the locally cached tree all belong
//! to the implementation. The watcher only consumes the signals the client
//! hands it.

use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;

use crate::Result;

/// A point in the remote hierarchical namespace, mirrored read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub path: String,
    pub data: Vec<u8>,
    pub version: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeEventKind {
    Added,
    Changed,
    Removed,

    /// The backend finished replaying the initial full-tree state.
    InitialSyncComplete,

    /// The backend session dropped; the client is reconnecting on its own.
    SessionLost,

    /// The backend session came back after a loss.
    SessionRestored,

    /// Anything else the backend may emit; ignored by the watcher.
    Other,
}

impl TreeEventKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            TreeEventKind::Added => "added",
            TreeEventKind::Changed => "changed",
            TreeEventKind::Removed => "removed",
            TreeEventKind::InitialSyncComplete => "initial_sync_complete",
            TreeEventKind::SessionLost => "session_lost",
            TreeEventKind::SessionRestored => "session_restored",
            TreeEventKind::Other => "other",
        }
    }
}

/// Raw change notification as delivered by the backend watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEvent {
    pub kind: TreeEventKind,
    pub path: String,
    pub payload: Option<Vec<u8>>,
}

/// Watch-capable tree client.
///
/// Implementations own the connection lifecycle end to end; no caller of
/// this trait retries or backs off on its behalf.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TreeClient: Send + Sync + 'static {
    /// Blocks until a backend session is established or the client's
    /// connect timeout elapses; returns whether a session exists.
    ///
    /// # Errors
    /// [`crate::ConnectError::Aborted`] when the attempt is torn down
    /// before an outcome is known.
    async fn connect(&self) -> Result<bool>;

    /// Subscribes to the subtree rooted at `path`. The returned stream
    /// replays the currently known nodes, then emits
    /// [`TreeEventKind::InitialSyncComplete`], then live mutations.
    async fn subscribe(&self, path: &str) -> Result<mpsc::Receiver<TreeEvent>>;

    /// Immediate children of `path` from the client's cached tree state,
    /// keyed by child name. Unknown paths yield an empty map.
    async fn children(&self, path: &str) -> HashMap<String, TreeNode>;

    /// Releases the watch and the session.
    async fn close(&self) -> Result<()>;
}
