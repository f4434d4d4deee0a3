//! Notification payloads delivered to update listeners.

use std::collections::HashMap;

/// Full flattened view of the watched subtree, keyed by logical key.
/// Rebuilt fresh on every read; never cached across calls.
pub type Snapshot = HashMap<String, String>;

/// A single qualifying backend change, already mapped to its logical key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    Added { key: String, value: String },
    Changed { key: String, value: String },
    Removed { key: String, value: String },
}

impl UpdateEvent {
    /// Wraps this event into the single-entry batch handed to listeners.
    pub fn into_result(self) -> UpdateResult {
        fn entry(key: String, value: String) -> HashMap<String, String> {
            let mut map = HashMap::with_capacity(1);
            map.insert(key, value);
            map
        }

        match self {
            UpdateEvent::Added { key, value } => UpdateResult::incremental(Some(entry(key, value)), None, None),
            UpdateEvent::Changed { key, value } => UpdateResult::incremental(None, Some(entry(key, value)), None),
            UpdateEvent::Removed { key, value } => UpdateResult::incremental(None, None, Some(entry(key, value))),
        }
    }
}

/// Batch of key/value mutations delivered atomically as one notification.
///
/// Each map is keyed by logical key. The watcher emits single-entry batches
/// (exactly one of the three maps populated), but listeners must accept any
/// combination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub added: Option<HashMap<String, String>>,
    pub changed: Option<HashMap<String, String>>,
    pub deleted: Option<HashMap<String, String>>,
}

impl UpdateResult {
    pub fn incremental(
        added: Option<HashMap<String, String>>,
        changed: Option<HashMap<String, String>>,
        deleted: Option<HashMap<String, String>>,
    ) -> Self {
        Self { added, changed, deleted }
    }

    /// Number of keys across all three maps.
    pub fn len(&self) -> usize {
        [&self.added, &self.changed, &self.deleted]
            .into_iter()
            .flatten()
            .map(|map| map.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
