//! The watched-source core: path/key mapping, the one-shot initialization
//! gate, update payloads, listener dispatch, the tree watcher worker and
//! the public [`WatchedConfigSource`] surface.

mod gate;
mod listener;
mod mapper;
mod snapshot;
mod update;
mod watcher;

mod source;

pub use gate::*;
pub use listener::*;
pub use mapper::*;
pub use source::*;
pub use update::*;
pub use watcher::WatchState;

pub(crate) use snapshot::read_snapshot;
pub(crate) use watcher::TreeWatcher;
