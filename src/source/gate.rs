//! One-shot readiness barrier opened when the backend reports that its
//! initial full-tree sync has completed.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Pending,
    Opened,
    Abandoned,
}

/// Outcome observed by a [`InitGate::wait`] caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateWait {
    /// The initial sync completed; the tree is safe to read.
    Opened,

    /// The gate was torn down before the initial sync completed. Readers
    /// should degrade to best-effort rather than block forever.
    Abandoned,
}

/// One-shot initialization gate.
///
/// `open()` is idempotent and wins over a later `abandon()`; once opened the
/// gate never re-closes. Any number of callers may `wait()` concurrently;
/// all of them unpark on the first `open()` (or `abandon()`), and every
/// later `wait()` returns immediately.
#[derive(Debug)]
pub struct InitGate {
    tx: watch::Sender<GateState>,
}

impl InitGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(GateState::Pending);
        Self { tx }
    }

    /// Marks the initial sync as complete. Only the first call has an
    /// effect; an abandoned gate stays abandoned.
    pub fn open(&self) {
        self.tx.send_if_modified(|state| {
            if *state == GateState::Pending {
                *state = GateState::Opened;
                true
            } else {
                false
            }
        });
    }

    /// Tears the gate down without opening it, unparking every waiter with
    /// [`GateWait::Abandoned`]. No effect on an already opened gate.
    pub fn abandon(&self) {
        self.tx.send_if_modified(|state| {
            if *state == GateState::Pending {
                *state = GateState::Abandoned;
                true
            } else {
                false
            }
        });
    }

    pub fn is_open(&self) -> bool {
        *self.tx.borrow() == GateState::Opened
    }

    /// Parks the caller until the gate leaves its pending state.
    pub async fn wait(&self) -> GateWait {
        let mut rx = self.tx.subscribe();
        let result = rx
            .wait_for(|state| *state != GateState::Pending)
            .await
            .map(|state| *state);
        match result {
            Ok(GateState::Opened) => GateWait::Opened,
            Ok(_) => GateWait::Abandoned,
            // Sender dropped while still pending.
            Err(_) => GateWait::Abandoned,
        }
    }
}

impl Default for InitGate {
    fn default() -> Self {
        Self::new()
    }
}
