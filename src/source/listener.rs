//! Update listener registration and dispatch.
//!
//! The registry is copy-on-write: add/remove swap in a fresh listener
//! vector, while an in-flight dispatch keeps iterating over the snapshot it
//! loaded at dispatch start. Listener identity is `Arc` pointer identity,
//! so add is a no-op for an already registered handle and remove of an
//! unknown handle does nothing.

use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::error;

use crate::Result;
use crate::UpdateResult;

/// Capability interface for update subscribers.
///
/// Invoked synchronously on the event worker, so a slow listener delays
/// delivery of subsequent events to every listener. Errors are logged and
/// isolated; they never abort dispatch to the remaining listeners.
pub trait UpdateListener: Send + Sync {
    fn on_update(&self, update: &UpdateResult) -> Result<()>;
}

pub struct ListenerRegistry {
    listeners: ArcSwap<Vec<Arc<dyn UpdateListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            listeners: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Registers a listener handle. Already registered handles are left in
    /// place, keeping their original dispatch position.
    pub fn add(&self, listener: Arc<dyn UpdateListener>) {
        self.listeners.rcu(|current| {
            if current.iter().any(|existing| Arc::ptr_eq(existing, &listener)) {
                return current.as_ref().clone();
            }
            let mut next = current.as_ref().clone();
            next.push(listener.clone());
            next
        });
    }

    /// Removes a listener handle; unknown handles are a no-op.
    pub fn remove(&self, listener: &Arc<dyn UpdateListener>) {
        self.listeners.rcu(|current| {
            current
                .iter()
                .filter(|existing| !Arc::ptr_eq(existing, listener))
                .cloned()
                .collect::<Vec<_>>()
        });
    }

    pub fn len(&self) -> usize {
        self.listeners.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.load().is_empty()
    }

    /// Invokes every registered listener with `update`, in insertion order.
    ///
    /// Each invocation is isolated: an error return or a panic is logged
    /// and the remaining listeners still run.
    pub fn dispatch(&self, update: &UpdateResult) {
        let snapshot = self.listeners.load();
        for listener in snapshot.iter() {
            match catch_unwind(AssertUnwindSafe(|| listener.on_update(update))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "Error in invoking update listener");
                }
                Err(_) => {
                    error!("Update listener panicked while handling an update");
                }
            }
        }
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
