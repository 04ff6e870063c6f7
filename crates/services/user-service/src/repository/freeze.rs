//! Account freeze lookup.

use std::collections::HashSet;

/// Source of the external account-state flag consulted after a username lookup.
pub trait FreezePolicy: Send + Sync {
    fn is_frozen(&self, id: i64) -> bool;
}

/// No account is ever frozen.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverFrozen;

impl FreezePolicy for NeverFrozen {
    fn is_frozen(&self, _id: i64) -> bool {
        false
    }
}

/// Fixed set of frozen account ids, usually loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct FrozenUserIds {
    ids: HashSet<i64>,
}

impl FrozenUserIds {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

impl FreezePolicy for FrozenUserIds {
    fn is_frozen(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }
}
