//! Typed configuration-change events and their suffix classification.

use crate::constants::CONFIGURATORS_SUFFIX;
use crate::constants::ROUTERS_SUFFIX;

/// Two-way collapse of the backend's delete/non-delete distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Modified,
    Deleted,
}

/// Category a change belongs to, derived from its key suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCategory {
    /// Routing rules.
    Routers,
    /// Traffic-governance overrides.
    Configurators,
}

/// Change notification delivered to [`crate::ConfigChangeListener`]s after
/// classification. Raw namespace events whose key matches neither category
/// suffix are dropped before this type is ever built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChangeEvent {
    pub key: String,
    pub new_value: Option<String>,
    pub category: ChangeCategory,
    pub kind: ChangeKind,
}

/// Raw change emitted by a [`crate::Namespace`] before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceChange {
    pub key: String,
    pub new_value: Option<String>,
    pub deleted: bool,
}

impl NamespaceChange {
    pub fn kind(&self) -> ChangeKind {
        if self.deleted {
            ChangeKind::Deleted
        } else {
            ChangeKind::Modified
        }
    }
}

/// The key suffixes that map a raw change onto a [`ChangeCategory`].
#[derive(Debug, Clone)]
pub struct CategoryRules {
    pub routers_suffix: String,
    pub configurators_suffix: String,
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self {
            routers_suffix: ROUTERS_SUFFIX.to_string(),
            configurators_suffix: CONFIGURATORS_SUFFIX.to_string(),
        }
    }
}

impl CategoryRules {
    /// Category of `key`, or `None` when it matches neither suffix (such
    /// changes are dropped from the typed stream).
    pub fn classify(&self, key: &str) -> Option<ChangeCategory> {
        if key.ends_with(&self.configurators_suffix) {
            Some(ChangeCategory::Configurators)
        } else if key.ends_with(&self.routers_suffix) {
            Some(ChangeCategory::Routers)
        } else {
            None
        }
    }
}
