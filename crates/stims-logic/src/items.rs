//! Subjects and item stacks.

use serde::{Deserialize, Serialize};

/// Identifies the player or entity that consumed a stim.
///
/// Opaque to the scheduler; hosts pick whatever stable `u64` they have
/// (the reference world uses `hecs::Entity::to_bits`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub u64);

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "subject#{}", self.0)
    }
}

/// A stack of identical items in an inventory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Registry name of the item (e.g. `propital_injector`).
    pub item: String,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item: impl Into<String>, count: u32) -> Self {
        Self {
            item: item.into(),
            count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Remove up to `amount` items; never goes below zero.
    pub fn shrink(&mut self, amount: u32) {
        self.count = self.count.saturating_sub(amount);
    }

    /// Add up to `amount` items without exceeding `max`. Returns the overflow.
    pub fn grow(&mut self, amount: u32, max: u32) -> u32 {
        let room = max.saturating_sub(self.count);
        let added = amount.min(room);
        self.count += added;
        amount - added
    }
}
